//! Locating prompt fields and the host element the panel sits next to.

use crate::config::TargetConfig;
use crate::dom::{Document, NodeId};

pub fn is_candidate(doc: &Document, id: NodeId, target: &TargetConfig) -> bool {
    if doc.tag(id) != target.tag || !doc.has_attr(id, &target.attribute) {
        return false;
    }
    match doc.attr(id, "placeholder") {
        Some(placeholder) => target
            .placeholder_markers
            .iter()
            .any(|marker| placeholder.contains(marker.as_str())),
        None => false,
    }
}

/// Connected candidates in document order.
pub fn find_candidates(doc: &Document, target: &TargetConfig) -> Vec<NodeId> {
    doc.query_all(|doc, id| is_candidate(doc, id, target))
}

/// Walk at most `max_depth` ancestors up from `from` looking for `class`.
pub fn find_anchor(doc: &Document, from: NodeId, class: &str, max_depth: usize) -> Option<NodeId> {
    let mut current = doc.parent(from);
    for _ in 0..max_depth {
        let id = current?;
        if doc.has_class(id, class) {
            return Some(id);
        }
        if id == doc.body() {
            return None;
        }
        current = doc.parent(id);
    }
    None
}
