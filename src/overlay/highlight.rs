//! Word-level highlighting with a transparent-text backdrop.
//!
//! The real input keeps focus and caret while its text is made transparent; a
//! backdrop behind it renders the same text with improvable phrases wrapped in
//! interactive spans. Offsets are byte offsets into the input value.

use crate::dom::{Document, NodeId};
use crate::model::ImprovableWordEntry;

pub const WRAPPER_CLASS: &str = "fromptly-highlight-wrapper";
pub const BACKDROP_CLASS: &str = "fromptly-highlight-backdrop";
pub const MATCH_CLASS: &str = "fromptly-highlight";
pub const TOOLTIP_CLASS: &str = "fromptly-tooltip";
pub const ALTERNATIVE_CLASS: &str = "fromptly-alternative";

/// Properties copied from the input so backdrop glyphs land on the input's glyphs.
pub const MIRRORED_PROPERTIES: &[&str] = &[
    "font-family",
    "font-size",
    "font-weight",
    "font-style",
    "line-height",
    "letter-spacing",
    "word-spacing",
    "text-transform",
    "text-indent",
    "text-align",
    "padding-top",
    "padding-right",
    "padding-bottom",
    "padding-left",
    "border-top-width",
    "border-right-width",
    "border-bottom-width",
    "border-left-width",
    "box-sizing",
    "width",
    "height",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordMatch {
    pub start: usize,
    pub end: usize,
    /// Index into the configured entries
    pub entry: usize,
}

/// All non-overlapping, case-sensitive occurrences of the configured phrases.
/// Leftmost wins; on equal start the longer phrase wins.
pub fn scan_matches(text: &str, entries: &[ImprovableWordEntry]) -> Vec<WordMatch> {
    let mut found: Vec<WordMatch> = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| !e.match_text.is_empty())
        .flat_map(|(entry, e)| {
            text.match_indices(e.match_text.as_str())
                .map(move |(start, m)| WordMatch {
                    start,
                    end: start + m.len(),
                    entry,
                })
        })
        .collect();

    found.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut matches = Vec::with_capacity(found.len());
    let mut last_end = 0;
    for m in found {
        if m.start >= last_end {
            last_end = m.end;
            matches.push(m);
        }
    }
    matches
}

/// `text[..start] + replacement + text[end..]`, or `None` for an invalid range.
pub fn replace_range(text: &str, start: usize, end: usize, replacement: &str) -> Option<String> {
    if start > end || end > text.len() || !text.is_char_boundary(start) || !text.is_char_boundary(end)
    {
        return None;
    }
    let mut out = String::with_capacity(text.len() - (end - start) + replacement.len());
    out.push_str(&text[..start]);
    out.push_str(replacement);
    out.push_str(&text[end..]);
    Some(out)
}

/// Entry whose phrase equals the selected text exactly.
pub fn entry_for_selection<'a>(
    entries: &'a [ImprovableWordEntry],
    selected: &str,
) -> Option<(usize, &'a ImprovableWordEntry)> {
    if selected.is_empty() {
        return None;
    }
    entries
        .iter()
        .enumerate()
        .find(|(_, e)| e.match_text == selected)
}

/// Inline style of the input before the overlay touched it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleSnapshot {
    pub color: Option<String>,
    pub caret_color: Option<String>,
    pub background: Option<String>,
}

impl StyleSnapshot {
    pub fn capture(doc: &Document, input: NodeId) -> Self {
        Self {
            color: doc.style(input, "color").map(str::to_string),
            caret_color: doc.style(input, "caret-color").map(str::to_string),
            background: doc.style(input, "background").map(str::to_string),
        }
    }

    pub fn restore(&self, doc: &mut Document, input: NodeId) {
        for (property, value) in [
            ("color", &self.color),
            ("caret-color", &self.caret_color),
            ("background", &self.background),
        ] {
            match value {
                Some(v) => doc.set_style(input, property, v),
                None => doc.remove_style(input, property),
            }
        }
    }
}

/// Make the input's text invisible while keeping a visible caret.
pub fn hide_input_text(doc: &mut Document, input: NodeId) {
    let caret = doc
        .computed_style(input, "color")
        .unwrap_or("black")
        .to_string();
    doc.set_style(input, "caret-color", &caret);
    doc.set_style(input, "color", "transparent");
    doc.set_style(input, "background", "transparent");
}

/// Build an empty backdrop styled like `input`.
pub fn build_backdrop(doc: &mut Document, input: NodeId) -> NodeId {
    let backdrop = doc.create_element("div");
    doc.add_class(backdrop, BACKDROP_CLASS);
    doc.set_attr(backdrop, "aria-hidden", "true");

    for property in MIRRORED_PROPERTIES {
        if let Some(value) = doc.computed_style(input, property).map(str::to_string) {
            doc.set_style(backdrop, property, &value);
        }
    }
    if let Some(color) = doc.computed_style(input, "color").map(str::to_string) {
        doc.set_style(backdrop, "color", &color);
    }
    if let Some(bg) = doc
        .computed_style(input, "background-color")
        .map(str::to_string)
    {
        doc.set_style(backdrop, "background-color", &bg);
    }
    doc.set_style(backdrop, "position", "absolute");
    doc.set_style(backdrop, "top", "0");
    doc.set_style(backdrop, "left", "0");
    doc.set_style(backdrop, "white-space", "pre-wrap");
    doc.set_style(backdrop, "overflow-wrap", "break-word");
    doc.set_style(backdrop, "overflow", "hidden");
    doc.set_style(backdrop, "pointer-events", "none");
    backdrop
}

/// Replace the backdrop's children with `text`, wrapping each match in a span.
pub fn fill_backdrop(
    doc: &mut Document,
    backdrop: NodeId,
    text: &str,
    matches: &[WordMatch],
) -> Vec<(NodeId, WordMatch)> {
    for child in doc.children(backdrop).to_vec() {
        doc.release(child);
    }

    let mut spans = Vec::with_capacity(matches.len());
    let mut cursor = 0;
    for m in matches {
        if m.start > cursor {
            let plain = doc.create_text(&text[cursor..m.start]);
            doc.append_child(backdrop, plain);
        }
        let span = doc.create_element("span");
        doc.add_class(span, MATCH_CLASS);
        doc.set_attr(span, "data-start", &m.start.to_string());
        doc.set_attr(span, "data-end", &m.end.to_string());
        doc.set_style(span, "pointer-events", "auto");
        doc.set_style(span, "text-decoration", "underline wavy");
        let inner = doc.create_text(&text[m.start..m.end]);
        doc.append_child(span, inner);
        doc.append_child(backdrop, span);
        spans.push((span, *m));
        cursor = m.end;
    }
    if cursor < text.len() {
        let rest = doc.create_text(&text[cursor..]);
        doc.append_child(backdrop, rest);
    }
    spans
}

/// Node handles of an open alternatives tooltip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TooltipNodes {
    pub root: NodeId,
    pub alternatives: Vec<(NodeId, String)>,
}

pub fn build_tooltip(
    doc: &mut Document,
    entry: &ImprovableWordEntry,
    start: usize,
    end: usize,
) -> TooltipNodes {
    let root = doc.create_element("div");
    doc.add_class(root, TOOLTIP_CLASS);
    doc.set_attr(root, "role", "listbox");
    doc.set_attr(root, "data-start", &start.to_string());
    doc.set_attr(root, "data-end", &end.to_string());

    let title = doc.create_element("div");
    let title_text = doc.create_text(&entry.match_text);
    doc.append_child(title, title_text);
    doc.append_child(root, title);

    let alternatives = entry
        .alternatives
        .iter()
        .map(|alt| {
            let button = doc.create_element("button");
            doc.add_class(button, ALTERNATIVE_CLASS);
            doc.set_attr(button, "role", "option");
            if let Some(url) = &alt.preview_asset_url {
                let img = doc.create_element("img");
                doc.set_attr(img, "src", url);
                doc.set_attr(img, "alt", "");
                doc.append_child(button, img);
            }
            let label = doc.create_text(&alt.text);
            doc.append_child(button, label);
            doc.append_child(root, button);
            (button, alt.text.clone())
        })
        .collect();

    TooltipNodes { root, alternatives }
}
