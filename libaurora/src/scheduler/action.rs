//! Scheduler actions as a tagged sum rather than a class hierarchy
//! (spec.md §4.4, §9): shared header fields plus a per-kind payload,
//! dispatched with a single `match` each frame.

use bitflags::bitflags;

bitflags! {
    /// Which input kinds may terminate an action early.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct EventMode: u8 {
        const CLICK = 0b0001;
        const KEY   = 0b0010;
        const QUIT  = 0b0100;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionKind {
    Wait { remaining_ms: u32, internal_slowdown_counter: u32 },
    WaitTimer { remaining_ms: u32 },
    Delay { remaining_ms: u32 },
    WaitVoice { channel: u8, extra_ms: u32, finished_at: Option<u32> },
    ButtonWait { timeout_ms: Option<u32>, elapsed_ms: u32, result: Option<i32> },
    ButtonMonitor,
    LipsAnimation { channel: u8 },
    WaitOnDialogue { index: u32 },
    /// A dynamic property tween in flight; the actual interpolation lives
    /// in [`crate::property`], this just carries the handle so the
    /// scheduler can park a `waitOnSpriteProperty`-style wait on it.
    PropertyTween { tween_id: u32 },
}

#[derive(Clone, Debug)]
pub struct Action {
    pub kind: ActionKind,
    pub event_mode: EventMode,
    pub terminated: bool,
}

impl Action {
    #[must_use]
    pub fn new(kind: ActionKind, event_mode: EventMode) -> Self {
        Self { kind, event_mode, terminated: false }
    }

    /// Whether this action, while live, prevents the main script from
    /// reading further commands (spec.md §4.4).
    #[must_use]
    pub fn suspends_main_script(&self) -> bool {
        !matches!(self.kind, ActionKind::ButtonMonitor | ActionKind::LipsAnimation { .. } | ActionKind::PropertyTween { .. })
    }

    /// Advances the action by `elapsed_ms` of the frame's snapshot clock.
    /// Returns `true` once the action has naturally expired (distinct from
    /// [`Action::terminate`], which kills it without an expiry callback).
    pub fn tick(&mut self, elapsed_ms: u32, channel_finished: impl Fn(u8) -> bool) -> bool {
        if self.terminated {
            return true;
        }
        let expired = match &mut self.kind {
            ActionKind::Wait { remaining_ms, internal_slowdown_counter } => {
                let catch_up = elapsed_ms.saturating_sub(*internal_slowdown_counter);
                *internal_slowdown_counter = elapsed_ms.saturating_sub(catch_up);
                *remaining_ms = remaining_ms.saturating_sub(elapsed_ms);
                *remaining_ms == 0
            }
            ActionKind::WaitTimer { remaining_ms } | ActionKind::Delay { remaining_ms } => {
                *remaining_ms = remaining_ms.saturating_sub(elapsed_ms);
                *remaining_ms == 0
            }
            ActionKind::WaitVoice { channel, extra_ms, finished_at } => {
                if channel_finished(*channel) {
                    let at = finished_at.get_or_insert(0);
                    *at += elapsed_ms;
                    *at >= *extra_ms
                } else {
                    false
                }
            }
            ActionKind::ButtonWait { timeout_ms, elapsed_ms: elapsed, result } => {
                *elapsed += elapsed_ms;
                match timeout_ms {
                    Some(t) if *elapsed >= *t => {
                        result.get_or_insert(-1);
                        true
                    }
                    _ => result.is_some(),
                }
            }
            ActionKind::ButtonMonitor | ActionKind::LipsAnimation { .. } => false,
            ActionKind::WaitOnDialogue { .. } => false,
            ActionKind::PropertyTween { .. } => false,
        };
        if expired {
            self.terminated = true;
        }
        expired
    }

    /// Kills the action without running its expiry side effects (used by
    /// super-skip and `btnasync 0`, spec.md §4.4 "Cancellation").
    pub fn terminate(&mut self) {
        self.terminated = true;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wait_action_expires_after_its_duration() {
        let mut action = Action::new(ActionKind::Wait { remaining_ms: 100, internal_slowdown_counter: 0 }, EventMode::empty());
        assert!(!action.tick(60, |_| false));
        assert!(action.tick(60, |_| false));
    }

    #[test]
    fn wait_voice_expires_extra_ms_after_channel_finishes() {
        let mut action = Action::new(ActionKind::WaitVoice { channel: 0, extra_ms: 50, finished_at: None }, EventMode::empty());
        assert!(!action.tick(20, |_| false));
        assert!(!action.tick(20, |_| true));
        assert!(action.tick(40, |_| true));
    }

    #[test]
    fn lips_animation_never_suspends_the_main_script() {
        let action = Action::new(ActionKind::LipsAnimation { channel: 0 }, EventMode::empty());
        assert!(!action.suspends_main_script());
    }

    #[test]
    fn terminate_marks_dead_without_requiring_a_tick() {
        let mut action = Action::new(ActionKind::ButtonMonitor, EventMode::empty());
        action.terminate();
        assert!(action.terminated);
    }
}
