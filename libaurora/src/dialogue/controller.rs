//! The per-codepoint timed dialogue state machine (spec.md §4.3).
//!
//! Implemented as an explicit state machine stepped once per frame rather
//! than a coroutine, per the spec's determinism recommendation for
//! super-skip (spec.md §9).

use crate::dialogue::segment::{parse_segments, Segment};
use std::collections::{HashMap, VecDeque};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DialogueEvent {
    /// A `{cmd:args}` inline command the script engine must run; the
    /// controller stops stepping until [`DialogueController::resume`] is
    /// called (mirrors a `return` from a `dialogueEventOnReturn` frame).
    InlineCommand { name: String, args: Vec<String> },
    InlineCommandEnd,
    PipeReached(u32),
    LineFinished,
}

const DEFAULT_SPEED_MS_PER_CHAR: u32 = 20;

#[derive(Debug, Default)]
pub struct DialogueController {
    segments: Vec<Segment>,
    segment_index: usize,
    char_index: usize,
    pub cursor: (i32, i32),
    click_part_char_count: u32,
    /// How many times each pipe index has been crossed but not yet
    /// consumed by a `waitOnDialogue` call.
    pending_pipes: HashMap<u32, u32>,
    events: VecDeque<DialogueEvent>,
    active: bool,
    waiting_for_click: bool,
    clears_page_on_click: bool,
    waiting_for_script: bool,
    speed_ms_per_char: u32,
    extra_delay_ms: u32,
    ticks_accumulated: u32,
    /// Under any skip mode, all per-character delays collapse to zero but
    /// events still fire (spec.md §4.3 "Skip behavior").
    pub skip_delays: bool,
}

impl DialogueController {
    #[must_use]
    pub fn new() -> Self {
        Self { speed_ms_per_char: DEFAULT_SPEED_MS_PER_CHAR, ..Self::default() }
    }

    pub fn start(&mut self, source: &str) {
        self.segments = parse_segments(source);
        self.segment_index = 0;
        self.char_index = 0;
        self.cursor = (0, 0);
        self.click_part_char_count = 0;
        self.pending_pipes.clear();
        self.events.clear();
        self.active = true;
        self.waiting_for_click = false;
        self.waiting_for_script = false;
        self.extra_delay_ms = 0;
        self.ticks_accumulated = 0;
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn is_waiting_for_click(&self) -> bool {
        self.waiting_for_click
    }

    pub fn click(&mut self) {
        if self.waiting_for_click {
            self.waiting_for_click = false;
            if self.clears_page_on_click {
                self.cursor = (0, 0);
                self.clears_page_on_click = false;
            }
            self.advance_segment();
        }
    }

    /// Consumes one pending crossing of barrier `index`, if any has
    /// happened. Used by the scheduler's `waitOnDialogue` action.
    pub fn consume_pipe(&mut self, index: u32) -> bool {
        match self.pending_pipes.get_mut(&index) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn pop_event(&mut self) -> Option<DialogueEvent> {
        self.events.pop_front()
    }

    /// Resumes stepping after the script handled an `InlineCommand` event
    /// (its `return` frame fired `dialogueEventOnReturn`).
    pub fn resume(&mut self) {
        if self.waiting_for_script {
            self.waiting_for_script = false;
            self.events.push_back(DialogueEvent::InlineCommandEnd);
            self.advance_segment();
        }
    }

    fn current_delay_ms(&self) -> u32 {
        if self.skip_delays {
            0
        } else {
            self.speed_ms_per_char + self.extra_delay_ms
        }
    }

    /// Advances the machine by `elapsed_ms` of wall time, emitting
    /// printable characters at the controller's current per-character
    /// speed and processing control segments as it reaches them.
    pub fn tick(&mut self, elapsed_ms: u32) {
        if !self.active || self.waiting_for_click || self.waiting_for_script {
            return;
        }
        self.ticks_accumulated += elapsed_ms;
        loop {
            if !self.active || self.waiting_for_click || self.waiting_for_script {
                break;
            }
            let Some(segment) = self.segments.get(self.segment_index) else {
                self.active = false;
                self.events.push_back(DialogueEvent::LineFinished);
                break;
            };
            match segment {
                Segment::Text(chars) => {
                    let Some(&c) = chars.get(self.char_index) else {
                        self.advance_segment();
                        continue;
                    };
                    let delay = self.current_delay_ms();
                    if self.ticks_accumulated < delay {
                        break;
                    }
                    self.ticks_accumulated -= delay;
                    self.extra_delay_ms = 0;
                    self.click_part_char_count += 1;
                    self.cursor.0 += i32::from(c.len_utf8() as u16);
                    self.char_index += 1;
                }
                Segment::ClickStop => {
                    self.waiting_for_click = true;
                    self.clears_page_on_click = false;
                }
                Segment::ClickClear => {
                    self.waiting_for_click = true;
                    self.clears_page_on_click = true;
                }
                Segment::Pipe(index) => {
                    *self.pending_pipes.entry(*index).or_insert(0) += 1;
                    self.events.push_back(DialogueEvent::PipeReached(*index));
                    self.advance_segment();
                }
                Segment::WaitMillis(ms) => {
                    let ms = if self.skip_delays { 0 } else { *ms };
                    if self.ticks_accumulated < ms {
                        break;
                    }
                    self.ticks_accumulated -= ms;
                    self.advance_segment();
                }
                Segment::SetSpeed(ms) => {
                    self.speed_ms_per_char = *ms;
                    self.advance_segment();
                }
                Segment::DotPause(ms) => {
                    self.extra_delay_ms = if self.skip_delays { 0 } else { *ms };
                    self.advance_segment();
                }
                Segment::Inline { name, args } => {
                    self.waiting_for_script = true;
                    self.events.push_back(DialogueEvent::InlineCommand { name: name.clone(), args: args.clone() });
                }
            }
        }
    }

    fn advance_segment(&mut self) {
        self.segment_index += 1;
        self.char_index = 0;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn emits_characters_one_at_a_time() {
        let mut dlg = DialogueController::new();
        dlg.start("Hi");
        dlg.tick(DEFAULT_SPEED_MS_PER_CHAR);
        assert_eq!(dlg.cursor.0, 1);
        dlg.tick(DEFAULT_SPEED_MS_PER_CHAR);
        assert_eq!(dlg.cursor.0, 2);
    }

    #[test]
    fn pipe_barrier_becomes_available_for_consumption() {
        let mut dlg = DialogueController::new();
        dlg.start("Hello|World");
        assert!(!dlg.consume_pipe(0));
        dlg.skip_delays = true;
        dlg.tick(0);
        assert!(dlg.consume_pipe(0));
        assert!(!dlg.consume_pipe(0));
    }

    #[test]
    fn clickstop_pauses_until_click() {
        let mut dlg = DialogueController::new();
        dlg.start("a@b");
        dlg.skip_delays = true;
        dlg.tick(0);
        assert!(dlg.is_waiting_for_click());
        dlg.click();
        assert!(!dlg.is_waiting_for_click());
        dlg.tick(0);
        assert_eq!(dlg.cursor.0, 2);
    }

    #[test]
    fn inline_command_suspends_until_resumed() {
        let mut dlg = DialogueController::new();
        dlg.start("a{cmd:1}b");
        dlg.skip_delays = true;
        dlg.tick(0);
        assert_eq!(dlg.pop_event(), Some(DialogueEvent::InlineCommand { name: "cmd".into(), args: vec!["1".into()] }));
        dlg.tick(0);
        assert_eq!(dlg.cursor.0, 1, "no further emission until resume()");
        dlg.resume();
        dlg.tick(0);
        assert_eq!(dlg.cursor.0, 2);
    }

    #[test]
    fn finishing_the_line_emits_an_event() {
        let mut dlg = DialogueController::new();
        dlg.start("hi");
        dlg.skip_delays = true;
        dlg.tick(0);
        assert!(dlg.pop_event().is_some());
        assert!(!dlg.is_active());
    }
}
