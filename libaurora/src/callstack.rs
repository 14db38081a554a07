//! The call stack as a tagged sum of `Label`/`For` frames (spec.md §3, §9).

use libcommon::ScriptAddress;
use std::collections::HashSet;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelFrame {
    pub return_address: ScriptAddress,
    pub return_label: String,
    pub return_line: u32,
    pub pushed_string_buffer_offset: Option<usize>,
    pub dialogue_event_on_return: bool,
    pub uninterruptible: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForFrame {
    pub next_script_address: ScriptAddress,
    pub induction_var_no: u32,
    pub to: i32,
    pub step: i32,
    pub break_flag: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Label(LabelFrame),
    For(ForFrame),
}

/// Ordered nest frames plus the set of label addresses that make any frame
/// entered through them "uninterruptible" (input is gated while any such
/// frame is live).
#[derive(Debug, Default)]
pub struct CallStack {
    frames: Vec<Frame>,
    uninterruptible_labels: HashSet<ScriptAddress>,
}

impl CallStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_uninterruptible(&mut self, label_address: ScriptAddress) {
        self.uninterruptible_labels.insert(label_address);
    }

    #[must_use]
    pub fn is_uninterruptible_label(&self, label_address: ScriptAddress) -> bool {
        self.uninterruptible_labels.contains(&label_address)
    }

    #[must_use]
    pub fn has_uninterruptible(&self) -> bool {
        self.frames.iter().any(|frame| matches!(frame, Frame::Label(label) if label.uninterruptible))
    }

    pub fn push_label(&mut self, mut frame: LabelFrame, entered_label_address: ScriptAddress) {
        frame.uninterruptible = self.uninterruptible_labels.contains(&entered_label_address);
        self.frames.push(Frame::Label(frame));
    }

    pub fn push_for(&mut self, frame: ForFrame) {
        self.frames.push(Frame::For(frame));
    }

    #[must_use]
    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    #[must_use]
    pub fn top_for_mut(&mut self) -> Option<&mut ForFrame> {
        self.frames.iter_mut().rev().find_map(|frame| match frame {
            Frame::For(for_frame) => Some(for_frame),
            Frame::Label(_) => None,
        })
    }

    /// `return` pops the top frame, which must be a `Label` frame. Fatal
    /// (spec.md §4.2) if the top frame is a `For` frame or the stack is
    /// empty.
    pub fn pop_label(&mut self) -> anyhow::Result<LabelFrame> {
        match self.frames.pop() {
            Some(Frame::Label(frame)) => Ok(frame),
            Some(other @ Frame::For(_)) => {
                self.frames.push(other);
                anyhow::bail!("return with no matching label frame (a for-loop is on top of the call stack)")
            }
            None => anyhow::bail!("return with an empty call stack"),
        }
    }

    /// `break` outside a `for`: logs a warning (caller's job) and reports
    /// that no frame was popped.
    pub fn pop_for(&mut self) -> Option<ForFrame> {
        match self.frames.last() {
            Some(Frame::For(_)) => match self.frames.pop() {
                Some(Frame::For(frame)) => Some(frame),
                _ => unreachable!(),
            },
            _ => None,
        }
    }

    /// Pops frames until (and including) the nearest enclosing `for` frame,
    /// for `break *L` which must unwind through any label frames entered
    /// inside the loop body before jumping.
    pub fn unwind_to_nearest_for(&mut self) -> Option<ForFrame> {
        while let Some(frame) = self.frames.pop() {
            if let Frame::For(for_frame) = frame {
                return Some(for_frame);
            }
        }
        None
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// The frame stack bottom-to-top, for a save snapshot.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Replaces the entire frame stack from a loaded save. Does not touch
    /// `uninterruptible_labels`, which is derived from the label table, not
    /// saved state.
    pub fn restore_frames(&mut self, frames: Vec<Frame>) {
        self.frames = frames;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn label_frame(addr: u32) -> LabelFrame {
        LabelFrame {
            return_address: ScriptAddress::from(addr as u16),
            return_label: "start".into(),
            return_line: 1,
            pushed_string_buffer_offset: None,
            dialogue_event_on_return: false,
            uninterruptible: false,
        }
    }

    #[test]
    fn return_requires_a_label_frame_on_top() {
        let mut stack = CallStack::new();
        stack.push_for(ForFrame { next_script_address: ScriptAddress::from(0u16), induction_var_no: 0, to: 4, step: 1, break_flag: false });
        assert!(stack.pop_label().is_err());
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn entering_an_uninterruptible_label_sets_the_flag() {
        let mut stack = CallStack::new();
        stack.mark_uninterruptible(ScriptAddress::from(50u16));
        stack.push_label(label_frame(0), ScriptAddress::from(50u16));
        assert!(stack.has_uninterruptible());
    }

    #[test]
    fn break_outside_a_for_pops_nothing() {
        let mut stack = CallStack::new();
        stack.push_label(label_frame(0), ScriptAddress::from(0u16));
        assert!(stack.pop_for().is_none());
        assert_eq!(stack.depth(), 1);
    }
}
