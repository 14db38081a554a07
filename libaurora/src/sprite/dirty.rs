//! Dirty-rect tracking for the scene and HUD canvases (spec.md §3).

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    #[must_use]
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    #[must_use]
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    #[must_use]
    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    fn union(self, other: Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect { x, y, width: (right - x) as u32, height: (bottom - y) as u32 }
    }

    fn clip_to_canvas(self, canvas_width: u32, canvas_height: u32) -> Rect {
        let x = self.x.clamp(0, canvas_width as i32);
        let y = self.y.clamp(0, canvas_height as i32);
        let right = self.right().clamp(0, canvas_width as i32);
        let bottom = self.bottom().clamp(0, canvas_height as i32);
        Rect { x, y, width: (right - x).max(0) as u32, height: (bottom - y).max(0) as u32 }
    }
}

/// One canvas's accumulated damage this frame, tracked in both canvas
/// coordinates and script coordinates (the latter offset by the camera's
/// center, per spec.md §3).
#[derive(Clone, Copy, Debug, Default)]
pub struct DirtyRect {
    canvas: Option<Rect>,
    script: Option<Rect>,
    canvas_width: u32,
    canvas_height: u32,
}

impl DirtyRect {
    #[must_use]
    pub fn new(canvas_width: u32, canvas_height: u32) -> Self {
        Self { canvas: None, script: None, canvas_width, canvas_height }
    }

    pub fn add(&mut self, rect: Rect, camera_x: i32, camera_y: i32) {
        let clipped = rect.clip_to_canvas(self.canvas_width, self.canvas_height);
        if clipped.width == 0 || clipped.height == 0 {
            return;
        }
        self.canvas = Some(self.canvas.map_or(clipped, |existing| existing.union(clipped)));
        let script_rect = Rect::new(clipped.x + camera_x, clipped.y + camera_y, clipped.width, clipped.height);
        self.script = Some(self.script.map_or(script_rect, |existing| existing.union(script_rect)));
    }

    pub fn fill(&mut self) {
        self.canvas = Some(Rect::new(0, 0, self.canvas_width, self.canvas_height));
        self.script = self.canvas;
    }

    pub fn clear(&mut self) {
        self.canvas = None;
        self.script = None;
    }

    #[must_use]
    pub fn canvas_rect(&self) -> Option<Rect> {
        self.canvas
    }

    #[must_use]
    pub fn script_rect(&self) -> Option<Rect> {
        self.script
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.canvas.is_none()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn add_widens_the_union_and_clips_to_canvas() {
        let mut dirty = DirtyRect::new(100, 100);
        dirty.add(Rect::new(-10, -10, 20, 20), 0, 0);
        assert_eq!(dirty.canvas_rect(), Some(Rect::new(0, 0, 10, 10)));
        dirty.add(Rect::new(90, 90, 30, 30), 0, 0);
        assert_eq!(dirty.canvas_rect(), Some(Rect::new(0, 0, 100, 100)));
    }

    #[test]
    fn fill_covers_the_whole_canvas_and_clear_empties_it() {
        let mut dirty = DirtyRect::new(640, 480);
        dirty.fill();
        assert_eq!(dirty.canvas_rect(), Some(Rect::new(0, 0, 640, 480)));
        dirty.clear();
        assert!(dirty.is_empty());
    }

    #[test]
    fn script_rect_is_offset_by_the_camera() {
        let mut dirty = DirtyRect::new(100, 100);
        dirty.add(Rect::new(10, 10, 5, 5), 3, -2);
        assert_eq!(dirty.script_rect(), Some(Rect::new(13, 8, 5, 5)));
    }
}
