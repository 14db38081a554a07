//! The cross-fade/mask-fade/DLL-named transition engine (spec.md §4.8).
//!
//! Pixel blending itself is the compositor's job (an external, narrow
//! collaborator per spec.md §1); this module owns the timing state
//! machine and hands the compositor a blend factor each frame.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EffectKind {
    Instant,
    CrossFade,
    MaskFade { mask_image: String },
    CrossFadeWithMask { mask_image: String },
    Dll { name: String },
}

impl EffectKind {
    /// Maps the script-visible numeric effect id (spec.md §4.8) to a kind.
    #[must_use]
    pub fn from_id(id: u32, mask_image: Option<String>, dll_name: Option<String>) -> Self {
        match id {
            0 | 1 => EffectKind::Instant,
            10 => EffectKind::CrossFade,
            15 => EffectKind::MaskFade { mask_image: mask_image.unwrap_or_default() },
            18 => EffectKind::CrossFadeWithMask { mask_image: mask_image.unwrap_or_default() },
            _ => EffectKind::Dll { name: dll_name.unwrap_or_default() },
        }
    }

    #[must_use]
    pub fn is_instant(&self) -> bool {
        matches!(self, EffectKind::Instant)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EffectState {
    pub kind: EffectKind,
    duration_ms: u32,
    elapsed_ms: u32,
    terminated: bool,
}

impl EffectState {
    #[must_use]
    pub fn new(kind: EffectKind, duration_ms: u32) -> Self {
        let terminated = kind.is_instant() || duration_ms == 0;
        Self { kind, duration_ms, elapsed_ms: 0, terminated }
    }

    /// Advances the effect, returning `true` the frame it finishes.
    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        if self.terminated {
            return false;
        }
        self.elapsed_ms = (self.elapsed_ms + elapsed_ms).min(self.duration_ms);
        if self.elapsed_ms >= self.duration_ms {
            self.terminated = true;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.terminated
    }

    /// The `src -> dst` blend factor in `[0, 1]` for this frame.
    #[must_use]
    pub fn blend_factor(&self) -> f64 {
        if self.duration_ms == 0 {
            1.0
        } else {
            f64::from(self.elapsed_ms) / f64::from(self.duration_ms)
        }
    }

    /// `effectcut`: jump straight to the finished state, as if the
    /// duration had already elapsed (used under skip/super-skip and
    /// user-requested instant completion).
    pub fn cut(&mut self) {
        self.elapsed_ms = self.duration_ms;
        self.terminated = true;
    }

    /// `effectspeed`: rescales the remaining duration by `factor` (e.g.
    /// `0.1` under ordinary skip), without changing how far along the
    /// effect already is.
    pub fn shorten(&mut self, factor: f64) {
        self.duration_ms = ((f64::from(self.duration_ms)) * factor).round() as u32;
        if self.elapsed_ms >= self.duration_ms {
            self.terminated = true;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn instant_effects_finish_immediately() {
        let effect = EffectState::new(EffectKind::Instant, 500);
        assert!(effect.is_finished());
    }

    #[test]
    fn cross_fade_reaches_full_blend_at_its_duration() {
        let mut effect = EffectState::new(EffectKind::CrossFade, 200);
        assert!(!effect.tick(100));
        assert_eq!(effect.blend_factor(), 0.5);
        assert!(effect.tick(100));
        assert_eq!(effect.blend_factor(), 1.0);
    }

    #[test]
    fn cut_completes_the_effect_instantly() {
        let mut effect = EffectState::new(EffectKind::CrossFade, 1000);
        effect.cut();
        assert!(effect.is_finished());
        assert_eq!(effect.blend_factor(), 1.0);
    }

    #[test]
    fn shorten_can_make_an_in_progress_effect_finish() {
        let mut effect = EffectState::new(EffectKind::CrossFade, 1000);
        effect.tick(900);
        effect.shorten(0.1);
        assert!(effect.is_finished());
    }
}
