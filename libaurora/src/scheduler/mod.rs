//! The constant-refresh per-frame scheduler (spec.md §4.4).

pub mod action;

use action::{Action, ActionKind, EventMode};

/// An action that just expired, handed back to the caller so it can run
/// whatever `onExpired()` side effect belongs to that kind (spec.md §4.4
/// step 4) — resolving a `ButtonWait`'s result variable, for instance.
#[derive(Debug)]
pub struct Expired {
    pub kind: ActionKind,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    actions: Vec<Action>,
    ticks_now: u32,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: ActionKind, event_mode: EventMode) -> usize {
        self.actions.push(Action::new(kind, event_mode));
        self.actions.len() - 1
    }

    #[must_use]
    pub fn ticks_now(&self) -> u32 {
        self.ticks_now
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn terminate_all(&mut self) {
        for action in &mut self.actions {
            action.terminate();
        }
        self.actions.clear();
    }

    #[must_use]
    pub fn find(&self, index: usize) -> Option<&Action> {
        self.actions.get(index)
    }

    #[must_use]
    pub fn find_mut(&mut self, index: usize) -> Option<&mut Action> {
        self.actions.get_mut(index)
    }

    /// Advances the wall clock and every live action by `elapsed_ms`,
    /// removing and returning (in insertion order) those that expired
    /// naturally this frame. All actions observe the same snapshot of
    /// `ticks_now` (spec.md §4.4 "Ordering guarantees").
    pub fn tick(&mut self, elapsed_ms: u32, channel_finished: impl Fn(u8) -> bool + Copy) -> Vec<Expired> {
        self.ticks_now = self.ticks_now.wrapping_add(elapsed_ms);
        let mut expired = Vec::new();
        let mut index = 0;
        while index < self.actions.len() {
            if self.actions[index].tick(elapsed_ms, channel_finished) {
                let action = self.actions.remove(index);
                expired.push(Expired { kind: action.kind });
            } else {
                index += 1;
            }
        }
        expired
    }

    /// Whether the main script may read another command this frame: no
    /// live action may report `suspendsMainScript()`.
    #[must_use]
    pub fn main_script_permitted(&self) -> bool {
        !self.actions.iter().any(Action::suspends_main_script)
    }

    pub fn actions_mut(&mut self) -> impl Iterator<Item = &mut Action> {
        self.actions.iter_mut()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn main_script_is_blocked_while_a_blocking_action_is_live() {
        let mut scheduler = Scheduler::new();
        assert!(scheduler.main_script_permitted());
        scheduler.register(ActionKind::Wait { remaining_ms: 10, internal_slowdown_counter: 0 }, EventMode::empty());
        assert!(!scheduler.main_script_permitted());
    }

    #[test]
    fn lips_animation_does_not_block_the_main_script() {
        let mut scheduler = Scheduler::new();
        scheduler.register(ActionKind::LipsAnimation { channel: 0 }, EventMode::empty());
        assert!(scheduler.main_script_permitted());
    }

    #[test]
    fn expired_actions_are_removed_in_insertion_order() {
        let mut scheduler = Scheduler::new();
        scheduler.register(ActionKind::WaitTimer { remaining_ms: 10 }, EventMode::empty());
        scheduler.register(ActionKind::WaitTimer { remaining_ms: 10 }, EventMode::empty());
        let expired = scheduler.tick(10, |_| false);
        assert_eq!(expired.len(), 2);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn wait_zero_completes_on_the_very_next_tick() {
        let mut scheduler = Scheduler::new();
        scheduler.register(ActionKind::Wait { remaining_ms: 0, internal_slowdown_counter: 0 }, EventMode::empty());
        let expired = scheduler.tick(0, |_| false);
        assert_eq!(expired.len(), 1);
    }
}
