//! Ordinary skip and super-skip (spec.md §4.7): the choice vector and the
//! two skip regimes that consume it.

use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SkipMode: u8 {
        const NORMAL     = 0b0001;
        const TO_WAIT    = 0b0010;
        const TO_EOL     = 0b0100;
        const SUPERSKIP  = 0b1000;
    }
}

/// Shrinks a `wait N` duration under ordinary skip (spec.md §4.7).
#[must_use]
pub fn shrink_wait_ms(ms: u32) -> u32 {
    if ms > 100 {
        ms / 10
    } else {
        10
    }
}

#[derive(Debug, Default)]
pub struct SkipState {
    pub mode: SkipMode,
    choice_vector: Vec<i32>,
    accept_choice_next_index: usize,
    accept_choice_vector_size: usize,
    sskip_destination: Option<String>,
}

impl SkipState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_skipping(&self) -> bool {
        self.mode.intersects(SkipMode::NORMAL | SkipMode::TO_WAIT | SkipMode::TO_EOL)
    }

    #[must_use]
    pub fn is_superskip(&self) -> bool {
        self.mode.contains(SkipMode::SUPERSKIP)
    }

    /// `makeChoice n`: appends to the choice vector.
    pub fn make_choice(&mut self, choice: i32) {
        self.choice_vector.push(choice);
    }

    /// `accept_choice_vector_size n`: declares how many entries of the
    /// vector the upcoming super-skip run is expected to consume.
    pub fn declare_accept_vector_size(&mut self, size: usize) {
        self.accept_choice_vector_size = size;
    }

    /// `sskip src dst [flags]`: requires an empty call stack (checked by
    /// the caller) and begins super-skip execution towards `dst`.
    pub fn begin_superskip(&mut self, destination: impl Into<String>) {
        self.mode = SkipMode::NORMAL | SkipMode::SUPERSKIP;
        self.accept_choice_next_index = 0;
        self.sskip_destination = Some(destination.into());
    }

    #[must_use]
    pub fn superskip_destination(&self) -> Option<&str> {
        self.sskip_destination.as_deref()
    }

    /// `acceptChoice $v`: during super-skip, returns the next recorded
    /// choice and advances the cursor. Outside super-skip this is a no-op
    /// returning `None` — scripts only call it inside an `sskip` run.
    pub fn accept_choice(&mut self) -> Option<i32> {
        if !self.is_superskip() {
            return None;
        }
        let value = self.choice_vector.get(self.accept_choice_next_index).copied();
        if value.is_some() {
            self.accept_choice_next_index += 1;
        }
        value
    }

    #[must_use]
    pub fn accept_choice_next_index(&self) -> usize {
        self.accept_choice_next_index
    }

    #[must_use]
    pub fn choice_vector_len(&self) -> usize {
        self.choice_vector.len()
    }

    #[must_use]
    pub fn choice_vector(&self) -> &[i32] {
        &self.choice_vector
    }

    /// Restores the choice vector and its read cursor from a loaded save.
    /// Leaves `accept_choice_vector_size`/super-skip mode untouched — those
    /// come from the script re-declaring them, not from save data.
    pub fn restore_choice_state(&mut self, choice_vector: Vec<i32>, accept_choice_next_index: usize) {
        self.choice_vector = choice_vector;
        self.accept_choice_next_index = accept_choice_next_index;
    }

    /// Whether super-skip has consumed its declared vector size and should
    /// end even if the destination label hasn't been reached yet.
    #[must_use]
    pub fn superskip_choices_exhausted(&self) -> bool {
        self.is_superskip() && self.accept_choice_next_index >= self.accept_choice_vector_size
    }

    /// Ends super-skip (destination reached, choices exhausted, or the
    /// callstack unwound through the sentinel).
    pub fn end_superskip(&mut self) {
        self.mode = SkipMode::empty();
        self.sskip_destination = None;
    }

    pub fn end_ordinary_skip(&mut self) {
        self.mode.remove(SkipMode::NORMAL | SkipMode::TO_WAIT | SkipMode::TO_EOL);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn make_choice_then_accept_choice_round_trips_under_superskip() {
        let mut skip = SkipState::new();
        skip.make_choice(1);
        skip.make_choice(0);
        skip.declare_accept_vector_size(2);
        skip.begin_superskip("*dest");
        assert_eq!(skip.accept_choice(), Some(1));
        assert_eq!(skip.accept_choice(), Some(0));
        assert!(skip.superskip_choices_exhausted());
        assert!(skip.accept_choice_next_index() <= skip.choice_vector_len());
    }

    #[test]
    fn wait_shrinks_per_the_skip_formula() {
        assert_eq!(shrink_wait_ms(5000), 500);
        assert_eq!(shrink_wait_ms(50), 10);
        assert_eq!(shrink_wait_ms(0), 10);
    }

    #[test]
    fn accept_choice_outside_superskip_is_a_no_op() {
        let mut skip = SkipState::new();
        skip.make_choice(7);
        assert_eq!(skip.accept_choice(), None);
    }
}
