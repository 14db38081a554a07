/// An axis-aligned region of the canvas queued for redraw, already clipped
/// to the canvas bounds by `libaurora`'s dirty-rect tracker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PresentRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PresentRect {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// The GPU/window abstraction spec.md §1 keeps out of scope. `libaurora`
/// hands it the frame's dirty rects once per tick (§4.4 step 7) and asks it
/// to flip the backbuffer when a frame was actually drawn.
pub trait Compositor {
    /// Presents the given dirty regions (scene, then HUD). Called at most
    /// once per frame.
    fn present(&mut self, scene: PresentRect, hud: PresentRect);

    /// Requests an immediate full-canvas redraw, used after super-skip ends
    /// and after a save/load.
    fn invalidate_all(&mut self);
}

/// A compositor double that only records what it was asked to draw; used by
/// `libaurora`'s own tests and by `aurora-tools`, neither of which opens a
/// window.
#[derive(Debug, Default)]
pub struct NullCompositor {
    pub presented: Vec<(PresentRect, PresentRect)>,
    pub invalidations: u32,
}

impl Compositor for NullCompositor {
    fn present(&mut self, scene: PresentRect, hud: PresentRect) {
        self.presented.push((scene, hud));
    }

    fn invalidate_all(&mut self) {
        self.invalidations += 1;
    }
}
