//! Dynamic property tweens (spec.md §4.5): timed interpolations of named
//! properties on sprites, spritesets, layers and global knobs.

use crate::sprite::SpriteClass;
use num_derive::FromPrimitive;
use std::collections::{HashMap, VecDeque};
use std::f64::consts::PI;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetRef {
    Sprite { id: u32, class: SpriteClass },
    SpriteSet(u32),
    Global,
    Layer(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyId {
    X,
    Y,
    ScaleX,
    ScaleY,
    Rotation,
    Alpha,
    ZOrder,
    Blur,
    BreakupFactor,
    WarpSpeed,
    WarpWavelength,
    WarpAmplitude,
    Sepia,
    Negative,
    Greyscale,
    QuakeXAmplitude,
    QuakeYAmplitude,
    BgmChannelVolume,
    MixChannelVolume(u8),
    OnionAlpha,
    TextFadeDuration,
    Custom(u32),
}

/// The small subset of [`PropertyId`] a script can name directly in a
/// `spt`/`aspt` command, by integer code (spec.md §4.5's "closed
/// enumeration" of sprite properties, minus the transform knobs no command
/// reaches yet).
#[derive(Clone, Copy, Debug, FromPrimitive)]
pub enum SpritePropertyCode {
    X = 0,
    Y = 1,
    ScaleX = 2,
    ScaleY = 3,
    Rotation = 4,
    Alpha = 5,
}

impl SpritePropertyCode {
    #[must_use]
    pub fn to_property_id(self) -> PropertyId {
        match self {
            SpritePropertyCode::X => PropertyId::X,
            SpritePropertyCode::Y => PropertyId::Y,
            SpritePropertyCode::ScaleX => PropertyId::ScaleX,
            SpritePropertyCode::ScaleY => PropertyId::ScaleY,
            SpritePropertyCode::Rotation => PropertyId::Rotation,
            SpritePropertyCode::Alpha => PropertyId::Alpha,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
pub enum Equation {
    Linear = 0,
    EaseInQuad = 1,
    EaseOutQuad = 2,
    EaseInOutQuad = 3,
    Sine = 4,
    Elastic = 5,
}

impl Equation {
    /// Evaluates the easing curve at `t` in `[0, 1]`, returning a value
    /// also nominally in `[0, 1]` (elastic overshoots outside that range
    /// by design).
    #[must_use]
    pub fn eval(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Equation::Linear => t,
            Equation::EaseInQuad => t * t,
            Equation::EaseOutQuad => t * (2.0 - t),
            Equation::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Equation::Sine => 1.0 - ((t * PI) / 2.0).cos(),
            Equation::Elastic => {
                if t == 0.0 || t == 1.0 {
                    t
                } else {
                    let p = 0.3;
                    let s = p / 4.0;
                    -(2f64.powf(10.0 * (t - 1.0)) * (((t - 1.0 - s) * (2.0 * PI) / p).sin()))
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Relativity {
    Absolute,
    Relative,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tween {
    pub start_value: f64,
    pub end_value: f64,
    pub duration_ms: u32,
    pub equation: Equation,
    pub relativity: Relativity,
    pub start_ticks: u32,
}

impl Tween {
    /// The interpolated value at `now_ticks` (wrapping the spec's
    /// "absolute or relative" target resolution: relative tweens are
    /// resolved against the property's value at the moment the tween was
    /// scheduled, which the caller bakes into `start_value`/`end_value`
    /// before pushing here).
    #[must_use]
    pub fn value_at(&self, now_ticks: u32) -> f64 {
        let elapsed = now_ticks.saturating_sub(self.start_ticks);
        if self.duration_ms == 0 {
            return self.end_value;
        }
        let t = f64::from(elapsed) / f64::from(self.duration_ms);
        let factor = self.equation.eval(t);
        self.start_value + (self.end_value - self.start_value) * factor
    }

    #[must_use]
    pub fn is_finished(&self, now_ticks: u32) -> bool {
        now_ticks.saturating_sub(self.start_ticks) >= self.duration_ms
    }
}

type Key = (TargetRef, PropertyId);

/// Pending tweens per `(target, property)`. A new tween either preempts
/// the current one (`override=true`) or queues behind it (spec.md §4.5
/// invariant).
#[derive(Debug, Default)]
pub struct TweenTable {
    queues: HashMap<Key, VecDeque<Tween>>,
}

impl TweenTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, target: TargetRef, property: PropertyId, tween: Tween, replace: bool) {
        let queue = self.queues.entry((target, property)).or_default();
        if replace {
            queue.clear();
        }
        queue.push_back(tween);
    }

    /// Advances `(target, property)`'s active tween (if any); pops it once
    /// finished, promoting the next queued tween to active by rebasing its
    /// `start_ticks` to `now_ticks`.
    pub fn tick(&mut self, target: TargetRef, property: PropertyId, now_ticks: u32) -> Option<f64> {
        let queue = self.queues.get_mut(&(target, property))?;
        let front = queue.front()?;
        let value = front.value_at(now_ticks);
        if front.is_finished(now_ticks) {
            queue.pop_front();
            if let Some(next) = queue.front_mut() {
                next.start_ticks = now_ticks;
            }
        }
        Some(value)
    }

    #[must_use]
    pub fn is_tweening(&self, target: TargetRef, property: PropertyId) -> bool {
        self.queues.get(&(target, property)).is_some_and(|q| !q.is_empty())
    }

    /// Every `(target, property)` with a non-empty queue, snapshotted so the
    /// caller can drive [`TweenTable::tick`] per key without holding a
    /// borrow of `self` across the loop.
    #[must_use]
    pub fn active_keys(&self) -> Vec<Key> {
        self.queues.iter().filter(|(_, queue)| !queue.is_empty()).map(|(key, _)| *key).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn linear_tween_reaches_its_endpoint() {
        let tween = Tween { start_value: 0.0, end_value: 100.0, duration_ms: 1000, equation: Equation::Linear, relativity: Relativity::Absolute, start_ticks: 0 };
        assert_eq!(tween.value_at(0), 0.0);
        assert_eq!(tween.value_at(1000), 100.0);
        assert_eq!(tween.value_at(500), 50.0);
    }

    #[test]
    fn override_replaces_the_queue_but_default_queues_behind() {
        let mut table = TweenTable::new();
        let target = TargetRef::Sprite { id: 0, class: SpriteClass::Lsp };
        let first = Tween { start_value: 0.0, end_value: 10.0, duration_ms: 100, equation: Equation::Linear, relativity: Relativity::Absolute, start_ticks: 0 };
        let second = Tween { start_value: 10.0, end_value: 20.0, duration_ms: 100, equation: Equation::Linear, relativity: Relativity::Absolute, start_ticks: 0 };
        table.schedule(target, PropertyId::X, first, false);
        table.schedule(target, PropertyId::X, second, false);
        assert_eq!(table.tick(target, PropertyId::X, 100), Some(10.0));
        assert_eq!(table.tick(target, PropertyId::X, 150), Some(15.0));
    }

    #[test]
    fn override_preempts_the_running_tween() {
        let mut table = TweenTable::new();
        let target = TargetRef::Global;
        let first = Tween { start_value: 0.0, end_value: 10.0, duration_ms: 1000, equation: Equation::Linear, relativity: Relativity::Absolute, start_ticks: 0 };
        let second = Tween { start_value: 5.0, end_value: 50.0, duration_ms: 100, equation: Equation::Linear, relativity: Relativity::Absolute, start_ticks: 0 };
        table.schedule(target, PropertyId::Alpha, first, false);
        table.schedule(target, PropertyId::Alpha, second, true);
        assert_eq!(table.tick(target, PropertyId::Alpha, 0), Some(5.0));
    }
}
