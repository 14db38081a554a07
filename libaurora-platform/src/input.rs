#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Key {
    Enter,
    Space,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Other(u8),
}

/// One input event drained from the platform's event queue at the start of
/// a frame (§4.4 step 1). The scheduler classifies each of these against the
/// live action list before running anything.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    Click { x: i32, y: i32 },
    KeyDown(Key),
    Scroll { dx: i32, dy: i32 },
    /// A platform-level request to quit (window close, SIGINT, …).
    Quit,
}

/// The input collaborator. `libaurora`'s event loop glue drains this once
/// per frame; a real backend pumps SDL/whatever, a test double replays a
/// fixed script.
pub trait InputSource {
    fn poll(&mut self) -> Vec<InputEvent>;
}

#[derive(Debug, Default)]
pub struct ScriptedInputSource {
    queue: std::collections::VecDeque<InputEvent>,
}

impl ScriptedInputSource {
    #[must_use]
    pub fn new(events: impl IntoIterator<Item = InputEvent>) -> Self {
        Self { queue: events.into_iter().collect() }
    }

    pub fn push(&mut self, event: InputEvent) {
        self.queue.push_back(event);
    }
}

impl InputSource for ScriptedInputSource {
    fn poll(&mut self) -> Vec<InputEvent> {
        self.queue.drain(..).collect()
    }
}
