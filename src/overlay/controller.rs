use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, warn};

use super::detect::{find_anchor, find_candidates};
use super::highlight::{self, StyleSnapshot, TooltipNodes, WordMatch};
use super::panel::{self, PanelNodes};
use super::store::ElementMap;
use super::{Concern, OverlayEvent, Phase, Reply};
use crate::config::OverlayConfig;
use crate::dom::{Document, NodeId};
use crate::model::{ImprovableWordEntry, RefinementResult};
use crate::service::{ServiceHandle, ServiceReply, ServiceRequest};

struct PendingTimer {
    token: u64,
    handle: JoinHandle<()>,
}

struct HighlightOverlay {
    wrapper: NodeId,
    backdrop: NodeId,
    snapshot: StyleSnapshot,
    spans: Vec<(NodeId, WordMatch)>,
}

struct OpenTooltip {
    nodes: TooltipNodes,
    start: usize,
    end: usize,
}

/// Everything the controller owns for one bound element.
struct ElementState {
    phase: Phase,
    /// Generation of the latest Loading cycle
    cycle: u64,
    timers: HashMap<Concern, PendingTimer>,
    panel: Option<PanelNodes>,
    loader: Option<NodeId>,
    tooltip: Option<OpenTooltip>,
    overlay: Option<HighlightOverlay>,
}

impl ElementState {
    fn new() -> Self {
        Self {
            phase: Phase::Idle,
            cycle: 0,
            timers: HashMap::new(),
            panel: None,
            loader: None,
            tooltip: None,
            overlay: None,
        }
    }
}

/// What a click (or hover) on a controller-owned node does.
#[derive(Debug, Clone)]
enum UiAction {
    ApplySuggestion {
        element: NodeId,
        text: String,
    },
    AppendOption {
        element: NodeId,
        text: String,
    },
    OpenWord {
        element: NodeId,
        start: usize,
        end: usize,
        entry: usize,
    },
    PickAlternative {
        element: NodeId,
        start: usize,
        end: usize,
        entry: usize,
        text: String,
    },
}

/// Drives the suggestion UI for every prompt field in a document.
///
/// The controller is the only writer of the document. Host activity arrives
/// as `OverlayEvent`s, either through `handle` directly or through the
/// channel returned by `sender`.
pub struct OverlayController {
    doc: Document,
    config: OverlayConfig,
    words: Vec<ImprovableWordEntry>,
    service: ServiceHandle,
    tx: mpsc::UnboundedSender<OverlayEvent>,
    rx: mpsc::UnboundedReceiver<OverlayEvent>,
    bindings: ElementMap<ElementState>,
    actions: HashMap<NodeId, UiAction>,
    next_token: u64,
    next_cycle: u64,
}

impl OverlayController {
    pub fn new(
        doc: Document,
        config: OverlayConfig,
        words: Vec<ImprovableWordEntry>,
        service: ServiceHandle,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            doc,
            config,
            words,
            service,
            tx,
            rx,
            bindings: ElementMap::new(),
            actions: HashMap::new(),
            next_token: 0,
            next_cycle: 0,
        }
    }

    /// Channel for host-side events.
    pub fn sender(&self) -> mpsc::UnboundedSender<OverlayEvent> {
        self.tx.clone()
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Host-side access to the page. Structural changes made here are picked
    /// up on the next `OverlayEvent::Mutated`.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Bind existing fields and schedule the one delayed re-scan.
    pub fn init(&mut self) {
        self.scan();
        let tx = self.tx.clone();
        let delay = self.config.rescan_delay();
        tokio::spawn(async move {
            sleep(delay).await;
            let _ = tx.send(OverlayEvent::Rescan);
        });
    }

    /// Process events forever.
    pub async fn run(&mut self) {
        while let Some(event) = self.rx.recv().await {
            self.handle(event);
        }
    }

    /// Process events for `duration`, then return. Events already queued are
    /// handled before the deadline is checked.
    pub async fn run_for(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        loop {
            tokio::select! {
                biased;
                Some(event) = self.rx.recv() => self.handle(event),
                _ = sleep_until(deadline) => break,
            }
        }
    }

    pub fn handle(&mut self, event: OverlayEvent) {
        match event {
            OverlayEvent::Input { target } => self.on_input(target),
            OverlayEvent::Mutated | OverlayEvent::Rescan => self.scan(),
            OverlayEvent::Click { target } => self.on_click(target),
            OverlayEvent::Hover { target } => self.on_hover(target),
            OverlayEvent::Scroll { target, top, left } => self.on_scroll(target, top, left),
            OverlayEvent::Select { target, start, end } => self.on_select(target, start, end),
            OverlayEvent::TimerFired {
                element,
                concern,
                token,
            } => self.on_timer(element, concern, token),
            OverlayEvent::Settled {
                element,
                cycle,
                suggestion,
                options,
            } => self.on_settled(element, cycle, suggestion, options),
            OverlayEvent::FadeDone { element, node } => self.on_fade_done(element, node),
        }
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn is_bound(&self, element: NodeId) -> bool {
        self.bindings.contains(element)
    }

    pub fn bound_elements(&self) -> Vec<NodeId> {
        let mut elements: Vec<NodeId> = self.bindings.elements().collect();
        elements.sort();
        elements
    }

    pub fn phase(&self, element: NodeId) -> Option<Phase> {
        self.bindings.get(element).map(|s| s.phase)
    }

    pub fn panel(&self, element: NodeId) -> Option<&PanelNodes> {
        self.bindings.get(element).and_then(|s| s.panel.as_ref())
    }

    pub fn loading_indicator(&self, element: NodeId) -> Option<NodeId> {
        self.bindings.get(element).and_then(|s| s.loader)
    }

    pub fn tooltip(&self, element: NodeId) -> Option<&TooltipNodes> {
        self.bindings
            .get(element)
            .and_then(|s| s.tooltip.as_ref())
            .map(|t| &t.nodes)
    }

    /// Rendered highlight spans with their ranges.
    pub fn highlight_spans(&self, element: NodeId) -> Vec<(NodeId, WordMatch)> {
        self.bindings
            .get(element)
            .and_then(|s| s.overlay.as_ref())
            .map(|o| o.spans.clone())
            .unwrap_or_default()
    }

    pub fn backdrop(&self, element: NodeId) -> Option<NodeId> {
        self.bindings
            .get(element)
            .and_then(|s| s.overlay.as_ref())
            .map(|o| o.backdrop)
    }

    // ------------------------------------------------------------------
    // Detection
    // ------------------------------------------------------------------

    fn scan(&mut self) {
        for (element, state) in self.bindings.sweep(&self.doc) {
            debug!("Element {:?} left the document, tearing down", element);
            self.teardown(element, state);
        }

        for element in find_candidates(&self.doc, &self.config.target) {
            if self.bindings.contains(element) {
                continue;
            }
            info!("Bound prompt field {:?}", element);
            self.bindings.set(element, ElementState::new());
            if !self.doc.value(element).trim().is_empty() {
                self.start_timer(element, Concern::Highlight);
            }
        }
    }

    // ------------------------------------------------------------------
    // Debounce
    // ------------------------------------------------------------------

    fn on_input(&mut self, element: NodeId) {
        if !self.bindings.contains(element) {
            return;
        }

        if self.doc.value(element).trim().is_empty() {
            self.clear(element);
            return;
        }

        self.start_timer(element, Concern::Suggestion);
        self.start_timer(element, Concern::Highlight);
        if let Some(mut state) = self.bindings.delete(element) {
            // Its range refers to the text before this edit
            self.close_tooltip(&mut state);
            if state.phase != Phase::Loading {
                state.phase = Phase::Debouncing;
            }
            self.bindings.set(element, state);
        }
    }

    fn start_timer(&mut self, element: NodeId, concern: Concern) {
        let Some(state) = self.bindings.get_mut(element) else {
            return;
        };

        self.next_token += 1;
        let token = self.next_token;
        let delay = match concern {
            Concern::Suggestion => self.config.debounce(),
            Concern::Highlight => self.config.highlight_debounce(),
        };

        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            let _ = tx.send(OverlayEvent::TimerFired {
                element,
                concern,
                token,
            });
        });

        if let Some(old) = state.timers.insert(concern, PendingTimer { token, handle }) {
            old.handle.abort();
        }
    }

    fn on_timer(&mut self, element: NodeId, concern: Concern, token: u64) {
        let Some(state) = self.bindings.get_mut(element) else {
            return;
        };
        match state.timers.get(&concern) {
            Some(timer) if timer.token == token => {
                state.timers.remove(&concern);
            }
            _ => {
                debug!("Ignoring superseded {:?} timer for {:?}", concern, element);
                return;
            }
        }

        match concern {
            Concern::Suggestion => self.start_loading(element),
            Concern::Highlight => self.refresh_highlights(element),
        }
    }

    /// Drop all UI and pending work for an element and return it to Idle.
    fn clear(&mut self, element: NodeId) {
        let Some(mut state) = self.bindings.delete(element) else {
            return;
        };
        for (_, timer) in state.timers.drain() {
            timer.handle.abort();
        }
        self.remove_panel(&mut state);
        self.remove_loader(&mut state);
        self.close_tooltip(&mut state);
        self.remove_overlay(element, &mut state);
        state.phase = Phase::Idle;
        // Results of an in-flight cycle must not resurface
        self.next_cycle += 1;
        state.cycle = self.next_cycle;
        self.bindings.set(element, state);
    }

    fn teardown(&mut self, element: NodeId, mut state: ElementState) {
        for (_, timer) in state.timers.drain() {
            timer.handle.abort();
        }
        self.remove_panel(&mut state);
        self.remove_loader(&mut state);
        self.close_tooltip(&mut state);
        self.remove_overlay(element, &mut state);
    }

    // ------------------------------------------------------------------
    // Loading and rendering
    // ------------------------------------------------------------------

    fn start_loading(&mut self, element: NodeId) {
        let prompt = self.doc.value(element).trim().to_string();
        if prompt.is_empty() {
            self.clear(element);
            return;
        }

        let Some(mut state) = self.bindings.delete(element) else {
            return;
        };
        self.next_cycle += 1;
        let cycle = self.next_cycle;
        state.cycle = cycle;
        state.phase = Phase::Loading;

        self.remove_panel(&mut state);
        self.remove_loader(&mut state);
        let loader = panel::build_loading(&mut self.doc);
        self.place(element, &state, loader);
        state.loader = Some(loader);
        self.bindings.set(element, state);

        debug!("Requesting suggestions for {:?} (cycle {})", element, cycle);
        let service = self.service.clone();
        let tx = self.tx.clone();
        let request_options = self.config.request_options;
        tokio::spawn(async move {
            let refine = service.request(ServiceRequest::RefinePrompt {
                prompt: prompt.clone(),
            });
            let (suggestion, options) = if request_options {
                let options = service.request(ServiceRequest::RefineOptions { prompt });
                let (suggestion, options) = tokio::join!(refine, options);
                (suggestion, Some(options))
            } else {
                (refine.await, None)
            };
            let _ = tx.send(OverlayEvent::Settled {
                element,
                cycle,
                suggestion,
                options,
            });
        });
    }

    fn on_settled(&mut self, element: NodeId, cycle: u64, suggestion: Reply, options: Option<Reply>) {
        let Some(mut state) = self.bindings.delete(element) else {
            debug!("Discarding result for unbound element {:?}", element);
            return;
        };
        if state.cycle != cycle || state.phase != Phase::Loading {
            debug!(
                "Discarding stale result for {:?} (cycle {}, current {})",
                element, cycle, state.cycle
            );
            self.bindings.set(element, state);
            return;
        }

        self.remove_loader(&mut state);
        let result = self.merge_replies(suggestion, options);

        self.remove_panel(&mut state);
        let nodes = panel::build_panel(&mut self.doc, &result);
        self.place(element, &state, nodes.root);
        self.actions.insert(
            nodes.suggestion,
            UiAction::ApplySuggestion {
                element,
                text: result.suggestion.clone(),
            },
        );
        for (button, option) in &nodes.options {
            self.actions.insert(
                *button,
                UiAction::AppendOption {
                    element,
                    text: option.clone(),
                },
            );
        }
        state.panel = Some(nodes);
        state.phase = Phase::Displaying;
        self.bindings.set(element, state);
    }

    /// Turn the two replies into what the panel shows. A failed prompt
    /// request shows the fixed fallback; a failed options request adds nothing.
    fn merge_replies(&self, suggestion: Reply, options: Option<Reply>) -> RefinementResult {
        let mut result = match suggestion {
            Ok(ServiceReply::Suggestions(result)) => result,
            Ok(ServiceReply::Error(err)) => {
                warn!("Suggestion request failed ({:?}): {}", err.kind, err.message);
                return RefinementResult::new(self.config.fallback_suggestion.clone());
            }
            Ok(other) => {
                warn!("Unexpected reply to REFINE_PROMPT: {:?}", other);
                return RefinementResult::new(self.config.fallback_suggestion.clone());
            }
            Err(err) => {
                warn!("Suggestion request failed: {}", err);
                return RefinementResult::new(self.config.fallback_suggestion.clone());
            }
        };

        match options {
            Some(Ok(ServiceReply::Options(extra))) => {
                for option in extra.options {
                    if !result.options.contains(&option) {
                        result.options.push(option);
                    }
                }
            }
            Some(Ok(ServiceReply::Error(err))) => {
                debug!("Options request failed ({:?}): {}", err.kind, err.message);
            }
            Some(Ok(other)) => debug!("Unexpected reply to REFINE_OPTIONS: {:?}", other),
            Some(Err(err)) => debug!("Options request failed: {}", err),
            None => {}
        }
        result
    }

    /// Put controller UI after the anchor, else after the field (or its
    /// highlight wrapper), else at the end of the body.
    fn place(&mut self, element: NodeId, state: &ElementState, node: NodeId) {
        if let Some(anchor) = find_anchor(
            &self.doc,
            element,
            &self.config.anchor_class,
            self.config.anchor_max_depth,
        ) {
            if self.doc.insert_after(anchor, node) {
                return;
            }
        }
        let after = state.overlay.as_ref().map(|o| o.wrapper).unwrap_or(element);
        if !self.doc.insert_after(after, node) {
            let body = self.doc.body();
            self.doc.append_child(body, node);
        }
    }

    fn remove_panel(&mut self, state: &mut ElementState) {
        if let Some(nodes) = state.panel.take() {
            self.forget(nodes.root);
            self.doc.release(nodes.root);
        }
    }

    fn remove_loader(&mut self, state: &mut ElementState) {
        if let Some(loader) = state.loader.take() {
            self.doc.release(loader);
        }
    }

    /// Drop actions registered anywhere under `root`.
    fn forget(&mut self, root: NodeId) {
        for id in self.doc.descendants(root) {
            self.actions.remove(&id);
        }
    }

    // ------------------------------------------------------------------
    // Interaction
    // ------------------------------------------------------------------

    fn action_for(&self, target: NodeId) -> Option<UiAction> {
        let mut current = Some(target);
        while let Some(id) = current {
            if let Some(action) = self.actions.get(&id) {
                return Some(action.clone());
            }
            current = self.doc.parent(id);
        }
        None
    }

    fn on_click(&mut self, target: NodeId) {
        // Clicking anywhere outside an open tooltip closes it
        let elements: Vec<NodeId> = self.bindings.elements().collect();
        for element in elements {
            let Some(mut state) = self.bindings.delete(element) else {
                continue;
            };
            let inside = state
                .tooltip
                .as_ref()
                .is_some_and(|t| self.doc.contains(t.nodes.root, target));
            if !inside {
                self.close_tooltip(&mut state);
            }
            self.bindings.set(element, state);
        }

        let Some(action) = self.action_for(target) else {
            return;
        };
        match action {
            UiAction::ApplySuggestion { element, text } => self.apply_suggestion(element, &text),
            UiAction::AppendOption { element, text } => self.append_option(element, target, &text),
            UiAction::OpenWord {
                element,
                start,
                end,
                entry,
            } => self.open_tooltip(element, start, end, entry),
            UiAction::PickAlternative {
                element,
                start,
                end,
                entry,
                text,
            } => self.pick_alternative(element, start, end, entry, &text),
        }
    }

    fn on_hover(&mut self, target: NodeId) {
        if let Some(UiAction::OpenWord {
            element,
            start,
            end,
            entry,
        }) = self.action_for(target)
        {
            self.open_tooltip(element, start, end, entry);
        }
    }

    fn on_scroll(&mut self, target: NodeId, top: i32, left: i32) {
        self.doc.set_scroll(target, top, left);
        if let Some(backdrop) = self.backdrop(target) {
            self.doc.set_scroll(backdrop, top, left);
        }
    }

    fn on_select(&mut self, element: NodeId, start: usize, end: usize) {
        if !self.bindings.contains(element) {
            return;
        }
        let entry = self
            .doc
            .value(element)
            .get(start..end)
            .and_then(|selected| highlight::entry_for_selection(&self.words, selected))
            .map(|(entry, _)| entry);
        if let Some(entry) = entry {
            self.open_tooltip(element, start, end, entry);
        }
    }

    /// Write a new value the way a user edit would look to the host page.
    fn write_value(&mut self, element: NodeId, value: &str) {
        self.doc.set_value(element, value);
        self.doc.dispatch_event(element, "input");
        self.doc.dispatch_event(element, "change");
    }

    fn apply_suggestion(&mut self, element: NodeId, text: &str) {
        info!("Applying suggestion to {:?}", element);
        self.write_value(element, text);
        if let Some(mut state) = self.bindings.delete(element) {
            self.remove_panel(&mut state);
            state.phase = Phase::Idle;
            self.bindings.set(element, state);
        }
        self.refresh_highlights(element);
    }

    fn append_option(&mut self, element: NodeId, button: NodeId, option: &str) {
        let Some(button) = self.owning_option(element, button) else {
            return;
        };
        info!("Appending option to {:?}", element);
        let value = panel::append_bullet(self.doc.value(element), option);
        self.write_value(element, &value);

        self.forget(button);
        self.doc.add_class(button, panel::FADE_OUT_CLASS);
        let tx = self.tx.clone();
        let fade = self.config.option_fade();
        tokio::spawn(async move {
            sleep(fade).await;
            let _ = tx.send(OverlayEvent::FadeDone {
                element,
                node: button,
            });
        });
        self.refresh_highlights(element);
    }

    /// The option button of `element`'s panel that contains `target`.
    fn owning_option(&self, element: NodeId, target: NodeId) -> Option<NodeId> {
        self.panel(element)?
            .options
            .iter()
            .map(|(button, _)| *button)
            .find(|button| self.doc.contains(*button, target))
    }

    fn on_fade_done(&mut self, element: NodeId, node: NodeId) {
        self.forget(node);
        self.doc.release(node);
        if let Some(panel) = self
            .bindings
            .get_mut(element)
            .and_then(|s| s.panel.as_mut())
        {
            panel.options.retain(|(button, _)| *button != node);
        }
    }

    // ------------------------------------------------------------------
    // Word highlighting
    // ------------------------------------------------------------------

    /// Re-scan the field and rebuild its overlay, or remove the overlay when
    /// nothing matches.
    fn refresh_highlights(&mut self, element: NodeId) {
        let Some(mut state) = self.bindings.delete(element) else {
            return;
        };
        self.close_tooltip(&mut state);

        let text = self.doc.value(element).to_string();
        let matches = highlight::scan_matches(&text, &self.words);
        if matches.is_empty() {
            self.remove_overlay(element, &mut state);
            self.bindings.set(element, state);
            return;
        }

        if state.overlay.is_none() {
            state.overlay = self.install_overlay(element);
        }
        if let Some(overlay) = state.overlay.as_mut() {
            for (span, _) in overlay.spans.drain(..) {
                self.actions.remove(&span);
            }
            overlay.spans = highlight::fill_backdrop(&mut self.doc, overlay.backdrop, &text, &matches);
            for (span, m) in &overlay.spans {
                self.actions.insert(
                    *span,
                    UiAction::OpenWord {
                        element,
                        start: m.start,
                        end: m.end,
                        entry: m.entry,
                    },
                );
            }
            let (top, left) = self.doc.scroll(element);
            self.doc.set_scroll(overlay.backdrop, top, left);
            debug!("{} highlight(s) on {:?}", overlay.spans.len(), element);
        }
        self.bindings.set(element, state);
    }

    /// Wrap the field: wrapper takes the field's place, backdrop goes first.
    fn install_overlay(&mut self, element: NodeId) -> Option<HighlightOverlay> {
        let parent = self.doc.parent(element)?;

        let wrapper = self.doc.create_element("div");
        self.doc.add_class(wrapper, highlight::WRAPPER_CLASS);
        self.doc.set_style(wrapper, "position", "relative");
        self.doc.insert_before(parent, wrapper, Some(element));

        let backdrop = highlight::build_backdrop(&mut self.doc, element);
        self.doc.append_child(wrapper, backdrop);
        self.doc.append_child(wrapper, element);

        let snapshot = StyleSnapshot::capture(&self.doc, element);
        highlight::hide_input_text(&mut self.doc, element);

        Some(HighlightOverlay {
            wrapper,
            backdrop,
            snapshot,
            spans: Vec::new(),
        })
    }

    /// Put the field back where the wrapper stands and restore its style.
    fn remove_overlay(&mut self, element: NodeId, state: &mut ElementState) {
        let Some(overlay) = state.overlay.take() else {
            return;
        };
        for (span, _) in &overlay.spans {
            self.actions.remove(span);
        }
        match self.doc.parent(overlay.wrapper) {
            Some(parent) => self.doc.insert_before(parent, element, Some(overlay.wrapper)),
            None => self.doc.remove(element),
        }
        // The field is out of the wrapper; the rest of it is ours
        self.doc.release(overlay.wrapper);
        overlay.snapshot.restore(&mut self.doc, element);
    }

    fn open_tooltip(&mut self, element: NodeId, start: usize, end: usize, entry: usize) {
        let Some(word) = self.words.get(entry).cloned() else {
            return;
        };
        let Some(mut state) = self.bindings.delete(element) else {
            return;
        };
        if state
            .tooltip
            .as_ref()
            .is_some_and(|t| t.start == start && t.end == end)
        {
            self.bindings.set(element, state);
            return;
        }

        self.close_tooltip(&mut state);
        let nodes = highlight::build_tooltip(&mut self.doc, &word, start, end);
        match state.overlay.as_ref() {
            Some(overlay) => self.doc.append_child(overlay.wrapper, nodes.root),
            None => {
                if !self.doc.insert_after(element, nodes.root) {
                    let body = self.doc.body();
                    self.doc.append_child(body, nodes.root);
                }
            }
        }
        for (button, text) in &nodes.alternatives {
            self.actions.insert(
                *button,
                UiAction::PickAlternative {
                    element,
                    start,
                    end,
                    entry,
                    text: text.clone(),
                },
            );
        }
        debug!("Tooltip for '{}' on {:?}", word.match_text, element);
        state.tooltip = Some(OpenTooltip { nodes, start, end });
        self.bindings.set(element, state);
    }

    fn close_tooltip(&mut self, state: &mut ElementState) {
        if let Some(tooltip) = state.tooltip.take() {
            self.forget(tooltip.nodes.root);
            self.doc.release(tooltip.nodes.root);
        }
    }

    /// Replace `[start, end)` only while it still holds the phrase the
    /// tooltip was opened for.
    fn pick_alternative(
        &mut self,
        element: NodeId,
        start: usize,
        end: usize,
        entry: usize,
        text: &str,
    ) {
        let current = self.doc.value(element).to_string();
        let phrase = self.words.get(entry).map(|w| w.match_text.as_str());
        let updated = match current.get(start..end) {
            Some(selected) if Some(selected) == phrase => {
                highlight::replace_range(&current, start, end, text)
            }
            _ => None,
        };
        match updated {
            Some(updated) => {
                info!("Replacing [{}, {}) on {:?}", start, end, element);
                self.write_value(element, &updated);
            }
            None => warn!(
                "Range [{}, {}) no longer holds the phrase on {:?}",
                start, end, element
            ),
        }
        if let Some(mut state) = self.bindings.delete(element) {
            self.close_tooltip(&mut state);
            self.bindings.set(element, state);
        }
        self.refresh_highlights(element);
    }
}
