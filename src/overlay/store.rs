use std::collections::HashMap;

use crate::dom::{Document, NodeId};

/// Per-element association store.
///
/// Entries are keyed by element identity and only live as long as the element
/// stays in the document: `sweep` hands back every entry whose element has
/// been disconnected so the caller can tear it down.
#[derive(Debug)]
pub struct ElementMap<V> {
    entries: HashMap<NodeId, V>,
}

impl<V> Default for ElementMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ElementMap<V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, element: NodeId) -> Option<&V> {
        self.entries.get(&element)
    }

    pub fn get_mut(&mut self, element: NodeId) -> Option<&mut V> {
        self.entries.get_mut(&element)
    }

    /// Store a value, returning the one it replaces.
    pub fn set(&mut self, element: NodeId, value: V) -> Option<V> {
        self.entries.insert(element, value)
    }

    pub fn delete(&mut self, element: NodeId) -> Option<V> {
        self.entries.remove(&element)
    }

    pub fn contains(&self, element: NodeId) -> bool {
        self.entries.contains_key(&element)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.keys().copied()
    }

    /// Remove and return entries whose element left the document.
    pub fn sweep(&mut self, doc: &Document) -> Vec<(NodeId, V)> {
        let gone: Vec<NodeId> = self
            .entries
            .keys()
            .copied()
            .filter(|id| !doc.is_connected(*id))
            .collect();
        gone.into_iter()
            .filter_map(|id| self.entries.remove(&id).map(|v| (id, v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_returns_previous() {
        let mut doc = Document::new();
        let el = doc.create_element("textarea");
        let mut map = ElementMap::new();
        assert_eq!(map.set(el, 1), None);
        assert_eq!(map.set(el, 2), Some(1));
        assert_eq!(map.get(el), Some(&2));
        assert_eq!(map.delete(el), Some(2));
        assert!(map.is_empty());
    }

    #[test]
    fn test_sweep_drops_disconnected() {
        let mut doc = Document::new();
        let kept = doc.create_element("textarea");
        let gone = doc.create_element("textarea");
        doc.append_child(doc.body(), kept);
        doc.append_child(doc.body(), gone);

        let mut map = ElementMap::new();
        map.set(kept, "kept");
        map.set(gone, "gone");

        doc.remove(gone);
        let swept = map.sweep(&doc);
        assert_eq!(swept, vec![(gone, "gone")]);
        assert!(map.contains(kept));
        assert!(!map.contains(gone));
    }
}
