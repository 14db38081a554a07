//! The sorted label table and its lookup caches (spec.md §3).
//!
//! Label names are discovered in one preprocessing pass over the script
//! text and stored sorted by start address; lookup by name goes through a
//! case-insensitive hash map, lookup by address or by line number goes
//! through small LRU caches, matching the teacher's preference for a tiny
//! hand-rolled cache over pulling in a crate for eight entries.

use crate::script::lexer::{Lexer, Token};
use libcommon::{LineNum, ScriptAddress};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    pub address: ScriptAddress,
    pub line: LineNum,
    pub line_count: u32,
}

/// The single preprocessing pass `LabelTable::build` expects: tokenizes
/// `text` once with an ordinary [`Lexer`] and records every label's start
/// address and line number, plus how many lines it spans before the next
/// label (or end of script) for `LabelTable::by_line`.
pub fn scan_labels(text: Rc<str>) -> anyhow::Result<Vec<Label>> {
    let mut lexer = Lexer::new(Rc::clone(&text), ScriptAddress::from(0u32));
    let mut found: Vec<(String, ScriptAddress, u32)> = Vec::new();
    let mut line = 1u32;
    loop {
        let start = lexer.position();
        match lexer.read_token()? {
            Token::Eof => break,
            Token::Newline => line += 1,
            Token::Label(name) => found.push((name, start, line)),
            Token::Command(_) | Token::Colon => {}
        }
    }
    let total_lines = line;
    let labels = found
        .iter()
        .enumerate()
        .map(|(index, (name, address, start_line))| {
            let next_line = found.get(index + 1).map_or(total_lines, |(_, _, l)| *l);
            Label { name: name.clone(), address: *address, line: LineNum::from(*start_line), line_count: next_line.saturating_sub(*start_line).max(1) }
        })
        .collect();
    Ok(labels)
}

const LRU_CAPACITY: usize = 8;

#[derive(Debug, Default)]
struct Lru<K: Eq + Clone, V: Clone> {
    order: VecDeque<K>,
    entries: HashMap<K, V>,
}

impl<K: std::hash::Hash + Eq + Clone, V: Clone> Lru<K, V> {
    fn get(&mut self, key: &K) -> Option<V> {
        let value = self.entries.get(key).cloned()?;
        self.order.retain(|k| k != key);
        self.order.push_back(key.clone());
        Some(value)
    }

    fn insert(&mut self, key: K, value: V) {
        if !self.entries.contains_key(&key) && self.order.len() >= LRU_CAPACITY {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.retain(|k| k != &key);
        self.order.push_back(key.clone());
        self.entries.insert(key, value);
    }
}

#[derive(Debug, Default)]
pub struct LabelTable {
    labels: Vec<Label>,
    by_name: HashMap<String, usize>,
    by_address_cache: Lru<u32, usize>,
    by_line_cache: Lru<u32, usize>,
}

impl LabelTable {
    /// Builds the table from the `(name, address, line, line_count)` tuples
    /// a single preprocessing pass over the script discovers. Collisions
    /// (two labels lowercasing to the same name) are reported, not silently
    /// overwritten — matching the source's "detected at preprocessing time"
    /// behavior (spec.md §9).
    pub fn build(mut labels: Vec<Label>) -> anyhow::Result<Self> {
        labels.sort_by_key(|l| l.address);
        let mut by_name = HashMap::with_capacity(labels.len());
        for (index, label) in labels.iter().enumerate() {
            let key = label.name.to_ascii_lowercase();
            if by_name.insert(key, index).is_some() {
                anyhow::bail!("Duplicate label *{}", label.name);
            }
        }
        Ok(Self { labels, by_name, by_address_cache: Lru::default(), by_line_cache: Lru::default() })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Label> {
        self.labels.get(index)
    }

    #[must_use]
    pub fn by_name(&mut self, name: &str) -> Option<&Label> {
        let key = name.to_ascii_lowercase();
        let index = *self.by_name.get(&key)?;
        Some(&self.labels[index])
    }

    /// Finds the label containing `address`: the last label whose start is
    /// `<= address`. `O(log n)` with an LRU cache in front for repeat hits.
    pub fn by_address(&mut self, address: ScriptAddress) -> Option<&Label> {
        if let Some(index) = self.by_address_cache.get(&address.get()) {
            return self.labels.get(index);
        }
        let index = self.labels.partition_point(|l| l.address <= address).checked_sub(1)?;
        self.by_address_cache.insert(address.get(), index);
        self.labels.get(index)
    }

    /// Finds the label whose `[line, line + line_count)` range contains
    /// `line`.
    pub fn by_line(&mut self, line: LineNum) -> Option<&Label> {
        if let Some(index) = self.by_line_cache.get(&line.get()) {
            return self.labels.get(index);
        }
        let index = self.labels.iter().position(|l| {
            let start = l.line.get();
            line.get() >= start && line.get() < start + l.line_count
        })?;
        self.by_line_cache.insert(line.get(), index);
        self.labels.get(index)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn table() -> LabelTable {
        LabelTable::build(vec![
            Label { name: "start".into(), address: ScriptAddress::from(0u16), line: LineNum::from(1u16), line_count: 3 },
            Label { name: "mid".into(), address: ScriptAddress::from(100u16), line: LineNum::from(4u16), line_count: 2 },
        ])
        .unwrap()
    }

    #[test]
    fn address_lookup_agrees_with_name_lookup() {
        let mut table = table();
        let start_address = table.by_name("start").unwrap().address;
        assert_eq!(table.by_address(start_address).unwrap().name, "start");
        assert_eq!(table.by_address(ScriptAddress::from(50u16)).unwrap().name, "start");
        assert_eq!(table.by_address(ScriptAddress::from(150u16)).unwrap().name, "mid");
    }

    #[test]
    fn name_lookup_is_case_insensitive() {
        let mut table = table();
        assert_eq!(table.by_name("START").unwrap().address, ScriptAddress::from(0u16));
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let labels = vec![
            Label { name: "a".into(), address: ScriptAddress::from(0u16), line: LineNum::from(1u16), line_count: 1 },
            Label { name: "A".into(), address: ScriptAddress::from(10u16), line: LineNum::from(2u16), line_count: 1 },
        ];
        assert!(LabelTable::build(labels).is_err());
    }

    #[test]
    fn line_lookup_finds_containing_label() {
        let mut table = table();
        assert_eq!(table.by_line(LineNum::from(5u16)).unwrap().name, "mid");
    }
}
