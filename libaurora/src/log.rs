//! Dialogue log, read-label tracking and the `StringTree` blob (spec.md §3).

use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub label_index: u32,
    pub choice_vector_size: u32,
}

#[derive(Debug, Default)]
pub struct LogState {
    pub entries: Vec<LogEntry>,
    read_labels: Vec<bool>,
}

impl LogState {
    #[must_use]
    pub fn new(label_count: usize) -> Self {
        Self { entries: Vec::new(), read_labels: vec![false; label_count] }
    }

    pub fn append(&mut self, label_index: u32, choice_vector_size: u32) {
        self.entries.push(LogEntry { label_index, choice_vector_size });
    }

    pub fn mark_read(&mut self, label_index: usize) {
        if let Some(slot) = self.read_labels.get_mut(label_index) {
            *slot = true;
        }
    }

    #[must_use]
    pub fn is_read(&self, label_index: usize) -> bool {
        self.read_labels.get(label_index).copied().unwrap_or(false)
    }

    /// Packs the read-label bitmap the way `NScrllog.dat` encodes a label
    /// name list rather than bits: ASCII decimal count, then that many
    /// names with each byte XORed with `0x84` (spec.md §6). Callers supply
    /// the label names in index order.
    #[must_use]
    pub fn encode_read_labels(&self, names: &[String]) -> Vec<u8> {
        let read_names: Vec<&str> = names.iter().enumerate().filter(|(i, _)| self.is_read(*i)).map(|(_, name)| name.as_str()).collect();
        let mut out = format!("{}\n", read_names.len()).into_bytes();
        for name in read_names {
            let quoted = format!("\"{name}\"\n");
            out.extend(quoted.bytes().map(|b| b ^ 0x84));
        }
        out
    }
}

/// An ordered map keyed by string whose values are themselves `StringTree`s;
/// leaves additionally carry a string `value`. Insertion order is
/// preserved for iteration, mirroring the original's `std::map`-adjacent
/// node type used as a hierarchical data blob (`original_source`'s
/// `StringTree`).
#[derive(Clone, Debug, Default)]
pub struct StringTree {
    pub value: Option<String>,
    children: BTreeMap<String, (u32, StringTree)>,
    next_order: u32,
}

impl StringTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child_mut(&mut self, key: &str) -> &mut StringTree {
        if !self.children.contains_key(key) {
            let order = self.next_order;
            self.next_order += 1;
            self.children.insert(key.to_string(), (order, StringTree::default()));
        }
        &mut self.children.get_mut(key).unwrap().1
    }

    #[must_use]
    pub fn child(&self, key: &str) -> Option<&StringTree> {
        self.children.get(key).map(|(_, tree)| tree)
    }

    /// Children in the order they were first inserted.
    pub fn children_in_order(&self) -> impl Iterator<Item = (&str, &StringTree)> {
        let mut entries: Vec<_> = self.children.iter().map(|(k, (order, tree))| (*order, k.as_str(), tree)).collect();
        entries.sort_by_key(|(order, ..)| *order);
        entries.into_iter().map(|(_, k, tree)| (k, tree))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn string_tree_preserves_insertion_order() {
        let mut tree = StringTree::new();
        tree.child_mut("b").value = Some("2".into());
        tree.child_mut("a").value = Some("1".into());
        let order: Vec<_> = tree.children_in_order().map(|(k, _)| k).collect();
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn read_labels_round_trip_through_the_encoded_format() {
        let mut log = LogState::new(2);
        log.mark_read(1);
        let encoded = log.encode_read_labels(&["start".into(), "mid".into()]);
        assert_eq!(encoded[0], b'1');
    }

    #[test]
    fn log_entries_record_label_and_choice_vector_size() {
        let mut log = LogState::new(1);
        log.append(0, 3);
        assert_eq!(log.entries[0], LogEntry { label_index: 0, choice_vector_size: 3 });
    }
}
