//! In-memory model of the host page.
//!
//! The overlay controller never touches a browser directly; it reads and
//! writes this tree. Nodes live in a generational arena and are addressed by
//! `NodeId`. `remove` only detaches, so a moved element keeps its identity;
//! `release` frees a detached fragment for reuse. A released id stays
//! distinct from every later id and reads as an empty, detached node.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

pub const TEXT_TAG: &str = "#text";

#[derive(Debug, Clone, Default)]
struct Node {
    tag: String,
    attributes: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
    computed: BTreeMap<String, String>,
    text: String,
    value: String,
    scroll: (i32, i32),
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// What a released id reads as.
static VACANT: Node = Node {
    tag: String::new(),
    attributes: BTreeMap::new(),
    style: BTreeMap::new(),
    computed: BTreeMap::new(),
    text: String::new(),
    value: String::new(),
    scroll: (0, 0),
    parent: None,
    children: Vec::new(),
};

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// A synthetic event dispatched on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedEvent {
    pub target: NodeId,
    pub kind: String,
    pub bubbles: bool,
}

#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    body: NodeId,
    events: Vec<DispatchedEvent>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let body = Node {
            tag: "body".to_string(),
            ..Node::default()
        };
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(body),
            }],
            free: Vec::new(),
            body: NodeId {
                index: 0,
                generation: 0,
            },
            events: Vec::new(),
        }
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    fn slot(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node(&self, id: NodeId) -> &Node {
        self.slot(id).unwrap_or(&VACANT)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// False once the id has been released.
    pub fn is_live(&self, id: NodeId) -> bool {
        self.slot(id).is_some()
    }

    /// Number of nodes currently allocated, attached or not.
    pub fn node_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index: (self.slots.len() - 1) as u32,
            generation: 0,
        }
    }

    // ------------------------------------------------------------------
    // Tree
    // ------------------------------------------------------------------

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(Node {
            tag: tag.to_ascii_lowercase(),
            ..Node::default()
        })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(Node {
            tag: TEXT_TAG.to_string(),
            text: text.to_string(),
            ..Node::default()
        })
    }

    pub fn tag(&self, id: NodeId) -> &str {
        &self.node(id).tag
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|c| *c == id)?;
        siblings.get(index + 1).copied()
    }

    /// Detach a node (and its subtree) from its parent. No-op when detached.
    pub fn remove(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|c| *c != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
    }

    /// Detach `id` and free it with its whole subtree. The body is never freed.
    pub fn release(&mut self, id: NodeId) {
        if id == self.body || !self.is_live(id) {
            return;
        }
        self.remove(id);
        for node in self.descendants(id) {
            let index = node.index;
            let slot = &mut self.slots[index as usize];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(index);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Insert `child` under `parent` before `reference`, or last when
    /// `reference` is `None` or not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if !self.is_live(parent) || !self.is_live(child) {
            return;
        }
        if child == parent || self.contains(child, parent) {
            return;
        }
        self.remove(child);
        if let Some(node) = self.node_mut(parent) {
            let index = reference
                .and_then(|r| node.children.iter().position(|c| *c == r))
                .unwrap_or(node.children.len());
            node.children.insert(index, child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
    }

    /// Insert `new_node` right after `node`. Returns false when `node` is detached.
    pub fn insert_after(&mut self, node: NodeId, new_node: NodeId) -> bool {
        let Some(parent) = self.parent(node) else {
            return false;
        };
        let reference = self.next_sibling(node);
        self.insert_before(parent, new_node, reference);
        true
    }

    /// True when `node` is `ancestor` or lies in its subtree.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        self.is_live(id) && self.contains(self.body, id)
    }

    /// `root` and its subtree in document order.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    pub fn query_all(&self, mut predicate: impl FnMut(&Document, NodeId) -> bool) -> Vec<NodeId> {
        self.descendants(self.body)
            .into_iter()
            .filter(|id| predicate(self, *id))
            .collect()
    }

    pub fn find_by_class(&self, class: &str) -> Vec<NodeId> {
        self.query_all(|doc, id| doc.has_class(id, class))
    }

    // ------------------------------------------------------------------
    // Attributes and style
    // ------------------------------------------------------------------

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id).attributes.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.node(id).attributes.contains_key(name)
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(node) = self.node_mut(id) {
            node.attributes.insert(name.to_string(), value.to_string());
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            return;
        }
        let classes = match self.attr(id, "class") {
            Some(existing) if !existing.is_empty() => format!("{} {}", existing, class),
            _ => class.to_string(),
        };
        self.set_attr(id, "class", &classes);
    }

    /// Inline style property.
    pub fn style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.node(id).style.get(property).map(String::as_str)
    }

    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) {
        if let Some(node) = self.node_mut(id) {
            node.style.insert(property.to_string(), value.to_string());
        }
    }

    pub fn remove_style(&mut self, id: NodeId, property: &str) {
        if let Some(node) = self.node_mut(id) {
            node.style.remove(property);
        }
    }

    /// Computed style: inline value first, then what the host stylesheet gives.
    pub fn computed_style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.style(id, property)
            .or_else(|| self.node(id).computed.get(property).map(String::as_str))
    }

    /// Host-side stylesheet value for a property.
    pub fn set_computed_style(&mut self, id: NodeId, property: &str, value: &str) {
        if let Some(node) = self.node_mut(id) {
            node.computed
                .insert(property.to_string(), value.to_string());
        }
    }

    // ------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------

    /// Form value of an input-like element.
    pub fn value(&self, id: NodeId) -> &str {
        &self.node(id).value
    }

    /// Programmatic value change. Dispatches nothing on its own.
    pub fn set_value(&mut self, id: NodeId, value: &str) {
        if let Some(node) = self.node_mut(id) {
            node.value = value.to_string();
        }
    }

    /// Concatenated text of the subtree.
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter(|n| self.tag(*n) == TEXT_TAG)
            .map(|n| self.node(n).text.as_str())
            .collect()
    }

    pub fn scroll(&self, id: NodeId) -> (i32, i32) {
        self.node(id).scroll
    }

    pub fn set_scroll(&mut self, id: NodeId, top: i32, left: i32) {
        if let Some(node) = self.node_mut(id) {
            node.scroll = (top, left);
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn dispatch_event(&mut self, target: NodeId, kind: &str) {
        self.events.push(DispatchedEvent {
            target,
            kind: kind.to_string(),
            bubbles: true,
        });
    }

    pub fn events(&self) -> &[DispatchedEvent] {
        &self.events
    }

    /// Hand the recorded events to the host and clear the log.
    pub fn take_events(&mut self) -> Vec<DispatchedEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events_for(&self, target: NodeId) -> Vec<&str> {
        self.events
            .iter()
            .filter(|e| e.target == target)
            .map(|e| e.kind.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_after_and_sibling_order() {
        let mut doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        let c = doc.create_element("div");
        doc.append_child(doc.body(), a);
        doc.append_child(doc.body(), c);
        assert!(doc.insert_after(a, b));
        assert_eq!(doc.children(doc.body()), &[a, b, c]);
        assert_eq!(doc.next_sibling(b), Some(c));
        assert_eq!(doc.next_sibling(c), None);
    }

    #[test]
    fn test_insert_after_detached_fails() {
        let mut doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        assert!(!doc.insert_after(a, b));
    }

    #[test]
    fn test_remove_disconnects_subtree() {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("textarea");
        doc.append_child(doc.body(), outer);
        doc.append_child(outer, inner);
        assert!(doc.is_connected(inner));
        doc.remove(outer);
        assert!(!doc.is_connected(inner));
        assert_eq!(doc.parent(inner), Some(outer));
    }

    #[test]
    fn test_moving_keeps_identity() {
        let mut doc = Document::new();
        let wrapper = doc.create_element("div");
        let input = doc.create_element("textarea");
        doc.append_child(doc.body(), input);
        doc.append_child(doc.body(), wrapper);
        doc.append_child(wrapper, input);
        assert_eq!(doc.children(doc.body()), &[wrapper]);
        assert_eq!(doc.parent(input), Some(wrapper));
    }

    #[test]
    fn test_cannot_insert_ancestor_into_descendant() {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        doc.append_child(doc.body(), outer);
        doc.append_child(outer, inner);
        doc.append_child(inner, outer);
        assert_eq!(doc.parent(outer), Some(doc.body()));
    }

    #[test]
    fn test_classes() {
        let mut doc = Document::new();
        let el = doc.create_element("div");
        doc.add_class(el, "a");
        doc.add_class(el, "b");
        doc.add_class(el, "a");
        assert_eq!(doc.attr(el, "class"), Some("a b"));
        assert!(doc.has_class(el, "b"));
        assert!(!doc.has_class(el, "c"));
    }

    #[test]
    fn test_computed_style_prefers_inline() {
        let mut doc = Document::new();
        let el = doc.create_element("textarea");
        doc.set_computed_style(el, "color", "rgb(0, 0, 0)");
        assert_eq!(doc.computed_style(el, "color"), Some("rgb(0, 0, 0)"));
        doc.set_style(el, "color", "transparent");
        assert_eq!(doc.computed_style(el, "color"), Some("transparent"));
        doc.remove_style(el, "color");
        assert_eq!(doc.computed_style(el, "color"), Some("rgb(0, 0, 0)"));
    }

    #[test]
    fn test_text_content_in_order() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        let t1 = doc.create_text("Hello ");
        let span = doc.create_element("span");
        let t2 = doc.create_text("world");
        doc.append_child(div, t1);
        doc.append_child(div, span);
        doc.append_child(span, t2);
        assert_eq!(doc.text_content(div), "Hello world");
    }

    #[test]
    fn test_release_frees_subtree_and_reuses_slots() {
        let mut doc = Document::new();
        let panel = doc.create_element("div");
        let text = doc.create_text("hello");
        doc.append_child(panel, text);
        doc.append_child(doc.body(), panel);
        let before = doc.node_count();

        doc.release(panel);
        assert_eq!(doc.node_count(), before - 2);
        assert!(!doc.is_live(panel));
        assert!(!doc.is_live(text));
        assert!(doc.children(doc.body()).is_empty());

        let fresh = doc.create_element("span");
        assert_eq!(doc.node_count(), before - 1);
        assert_ne!(fresh, panel);
        assert_ne!(fresh, text);
    }

    #[test]
    fn test_released_id_reads_as_empty() {
        let mut doc = Document::new();
        let el = doc.create_element("div");
        doc.add_class(el, "gone");
        doc.release(el);
        let reused = doc.create_element("div");
        doc.add_class(reused, "gone");
        doc.append_child(doc.body(), reused);

        assert!(!doc.has_class(el, "gone"));
        assert!(!doc.is_connected(el));
        assert_eq!(doc.tag(el), "");
        // Writes through a stale id do not reach the new occupant
        doc.set_value(el, "x");
        doc.append_child(el, doc.body());
        assert_eq!(doc.value(reused), "");
        assert!(doc.is_connected(reused));
    }

    #[test]
    fn test_body_is_never_released() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.release(body);
        assert!(doc.is_live(body));
    }

    #[test]
    fn test_take_events_drains_log() {
        let mut doc = Document::new();
        let el = doc.create_element("textarea");
        doc.dispatch_event(el, "input");
        assert_eq!(doc.take_events().len(), 1);
        assert!(doc.events().is_empty());
    }

    #[test]
    fn test_dispatch_records_events() {
        let mut doc = Document::new();
        let el = doc.create_element("textarea");
        doc.dispatch_event(el, "input");
        doc.dispatch_event(el, "change");
        assert_eq!(doc.events_for(el), vec!["input", "change"]);
        assert!(doc.events().iter().all(|e| e.bubbles));
    }
}
