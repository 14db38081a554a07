//! The immutable script text plus its "kidoku" (seen) bitmap (spec.md §3).

use libcommon::ScriptAddress;
use std::rc::Rc;

/// A bit-per-byte record of which script bytes the evaluator has already
/// read. Used to grey out previously-seen text and to gate `kidokuskip`.
#[derive(Clone, Debug)]
pub struct KidokuBitmap {
    bits: Vec<u8>,
    len: usize,
}

impl KidokuBitmap {
    #[must_use]
    pub fn new(byte_len: usize) -> Self {
        Self { bits: vec![0; byte_len.div_ceil(8)], len: byte_len }
    }

    pub fn mark(&mut self, address: ScriptAddress) {
        let index = address.get() as usize;
        if index < self.len {
            self.bits[index / 8] |= 1 << (index % 8);
        }
    }

    #[must_use]
    pub fn is_marked(&self, address: ScriptAddress) -> bool {
        let index = address.get() as usize;
        index < self.len && self.bits[index / 8] & (1 << (index % 8)) != 0
    }

    /// Marks every byte in `[start, end)`, e.g. the span a just-read command
    /// occupied.
    pub fn mark_range(&mut self, start: ScriptAddress, end: ScriptAddress) {
        for addr in start.get()..end.get() {
            self.mark(ScriptAddress::from(addr));
        }
    }

    /// Raw bit array for `kidoku.dat`, one bit per script byte.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    pub fn load_bytes(&mut self, bytes: &[u8]) {
        let n = bytes.len().min(self.bits.len());
        self.bits[..n].copy_from_slice(&bytes[..n]);
    }
}

/// The scenario source text. Cheaply cloneable (`Rc<str>`) so a [`crate::script::lexer::Lexer`]
/// can hold its own handle without borrowing the owning [`crate::engine::Engine`].
#[derive(Clone, Debug)]
pub struct ScriptBuffer {
    text: Rc<str>,
    pub kidoku: KidokuBitmap,
}

impl ScriptBuffer {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let text: String = text.into();
        let kidoku = KidokuBitmap::new(text.len());
        Self { text: Rc::from(text), kidoku }
    }

    #[must_use]
    pub fn text(&self) -> Rc<str> {
        Rc::clone(&self.text)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    #[must_use]
    pub fn byte(&self, address: ScriptAddress) -> Option<u8> {
        self.text.as_bytes().get(address.get() as usize).copied()
    }

    #[must_use]
    pub fn slice(&self, start: ScriptAddress, end: ScriptAddress) -> &str {
        &self.text[start.get() as usize..end.get() as usize]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kidoku_marks_are_independent_bits() {
        let mut bitmap = KidokuBitmap::new(10);
        bitmap.mark(ScriptAddress::from(3u16));
        assert!(bitmap.is_marked(ScriptAddress::from(3u16)));
        assert!(!bitmap.is_marked(ScriptAddress::from(4u16)));
    }

    #[test]
    fn kidoku_round_trips_through_raw_bytes() {
        let mut bitmap = KidokuBitmap::new(20);
        bitmap.mark(ScriptAddress::from(1u16));
        bitmap.mark(ScriptAddress::from(17u16));
        let mut reloaded = KidokuBitmap::new(20);
        reloaded.load_bytes(bitmap.as_bytes());
        assert!(reloaded.is_marked(ScriptAddress::from(1u16)));
        assert!(reloaded.is_marked(ScriptAddress::from(17u16)));
        assert!(!reloaded.is_marked(ScriptAddress::from(2u16)));
    }
}
