//! Indexed sprite tables and per-sprite animation state (spec.md §3).

pub mod dirty;

pub use dirty::Rect;

use std::collections::BTreeSet;

pub const SPRITE_COUNT: usize = 1000;
pub const CURSOR_COUNT: usize = 2;
pub const BAR_COUNT: usize = 100;
pub const PRNUM_COUNT: usize = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlendMode {
    #[default]
    Normal,
    Add,
    Sub,
    Mul,
    Alpha,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Percent, 100 = identity.
    pub scale_x: i32,
    pub scale_y: i32,
    pub rotation_degrees: f64,
    pub affine: Option<[f64; 4]>,
    pub hotspot_x: i32,
    pub hotspot_y: i32,
}

impl Default for Transform {
    fn default() -> Self {
        Self { scale_x: 100, scale_y: 100, rotation_degrees: 0.0, affine: None, hotspot_x: 0, hotspot_y: 0 }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ColorTransform {
    pub sepia: bool,
    pub negative: bool,
    pub greyscale: bool,
    pub hue_darken: u8,
}

/// Identifies a sprite in either of the two script-visible classes, used
/// wherever a cross-sprite reference (parent/child, button target) would
/// otherwise need a pointer (spec.md §9 "arena + id").
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpriteClass {
    #[default]
    Lsp,
    Lsp2,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpriteRef {
    pub id: u32,
    pub class: SpriteClass,
}

/// The full state of one sprite (spec.md §3 "Sprites", glossary "Animation
/// info"). `current` is what gets rendered; `before_scene` is a snapshot
/// taken at the last frame boundary so effects can blend old → new without
/// the source's `old_ai` pointer aliasing (spec.md §9).
#[derive(Clone, Debug, Default)]
pub struct AnimationInfo {
    pub image_name: Option<String>,
    pub script_rect: Rect,
    pub transformed_rect: Rect,
    pub transform: Transform,
    pub alpha: u8,
    pub cell_index: u32,
    pub cell_count: u32,
    pub cell_durations_ms: Vec<u32>,
    pub blend_mode: BlendMode,
    pub color_transform: ColorTransform,
    pub z_order_override: Option<i32>,
    pub parent: Option<SpriteRef>,
    pub children: BTreeSet<SpriteRef>,
    pub lips_channel_name: Option<String>,
    pub visible: bool,
}

impl AnimationInfo {
    #[must_use]
    pub fn new() -> Self {
        Self { alpha: 255, ..Self::default() }
    }

    /// Reads the field a property tween (spec.md §4.5) interpolates,
    /// as `f64` regardless of the field's own storage type. Properties with
    /// no sprite-side counterpart (the global/channel-volume knobs) read as
    /// `0.0` — callers only reach this for [`crate::property::TargetRef::Sprite`] keys.
    #[must_use]
    pub fn property_value(&self, property: crate::property::PropertyId) -> f64 {
        use crate::property::PropertyId;
        match property {
            PropertyId::X => f64::from(self.script_rect.x),
            PropertyId::Y => f64::from(self.script_rect.y),
            PropertyId::ScaleX => f64::from(self.transform.scale_x),
            PropertyId::ScaleY => f64::from(self.transform.scale_y),
            PropertyId::Rotation => self.transform.rotation_degrees,
            PropertyId::Alpha => f64::from(self.alpha),
            _ => 0.0,
        }
    }

    /// Writes a tween's interpolated value back into the matching field.
    pub fn set_property_value(&mut self, property: crate::property::PropertyId, value: f64) {
        use crate::property::PropertyId;
        match property {
            PropertyId::X => self.script_rect.x = value.round() as i32,
            PropertyId::Y => self.script_rect.y = value.round() as i32,
            PropertyId::ScaleX => self.transform.scale_x = value.round() as i32,
            PropertyId::ScaleY => self.transform.scale_y = value.round() as i32,
            PropertyId::Rotation => self.transform.rotation_degrees = value,
            PropertyId::Alpha => self.alpha = value.round().clamp(0.0, 255.0) as u8,
            _ => {}
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ZOrder {
    pub text: i32,
    pub window: i32,
    pub hud: i32,
    pub tachi_e: i32,
}

/// Both sprite classes (fixed arrays indexed by script-visible id),
/// cursors, tachi-e, the text-window backing, bars and numeric counters,
/// each with a `before_scene` twin.
pub struct SpriteTables {
    pub lsp: Box<[AnimationInfo; SPRITE_COUNT]>,
    pub lsp2: Box<[AnimationInfo; SPRITE_COUNT]>,
    pub lsp_before: Box<[AnimationInfo; SPRITE_COUNT]>,
    pub lsp2_before: Box<[AnimationInfo; SPRITE_COUNT]>,
    pub tachi_e: [AnimationInfo; 3],
    pub cursors: [AnimationInfo; CURSOR_COUNT],
    pub text_window_backing: AnimationInfo,
    pub bars: [AnimationInfo; BAR_COUNT],
    pub prnum: [AnimationInfo; PRNUM_COUNT],
    pub z_order: ZOrder,
    pub no_transition: BTreeSet<SpriteRef>,
}

fn sprite_array() -> Box<[AnimationInfo; SPRITE_COUNT]> {
    let vec: Vec<AnimationInfo> = (0..SPRITE_COUNT).map(|_| AnimationInfo::new()).collect();
    vec.into_boxed_slice().try_into().unwrap_or_else(|_| unreachable!())
}

impl Default for SpriteTables {
    fn default() -> Self {
        Self {
            lsp: sprite_array(),
            lsp2: sprite_array(),
            lsp_before: sprite_array(),
            lsp2_before: sprite_array(),
            tachi_e: Default::default(),
            cursors: Default::default(),
            text_window_backing: AnimationInfo::new(),
            bars: std::array::from_fn(|_| AnimationInfo::new()),
            prnum: std::array::from_fn(|_| AnimationInfo::new()),
            z_order: ZOrder::default(),
            no_transition: BTreeSet::new(),
        }
    }
}

impl SpriteTables {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, sprite_ref: SpriteRef) -> &AnimationInfo {
        match sprite_ref.class {
            SpriteClass::Lsp => &self.lsp[sprite_ref.id as usize],
            SpriteClass::Lsp2 => &self.lsp2[sprite_ref.id as usize],
        }
    }

    pub fn get_mut(&mut self, sprite_ref: SpriteRef) -> &mut AnimationInfo {
        match sprite_ref.class {
            SpriteClass::Lsp => &mut self.lsp[sprite_ref.id as usize],
            SpriteClass::Lsp2 => &mut self.lsp2[sprite_ref.id as usize],
        }
    }

    /// Links `child` under `parent`, removing any previous parent link.
    pub fn set_parent(&mut self, child: SpriteRef, parent: Option<SpriteRef>) {
        if let Some(old_parent) = self.get(child).parent {
            self.get_mut(old_parent).children.remove(&child);
        }
        self.get_mut(child).parent = parent;
        if let Some(parent) = parent {
            self.get_mut(parent).children.insert(child);
        }
    }

    /// Sets a sprite's z-order override, rejecting a value that would cross
    /// the HUD boundary (spec.md §3 "Z ordering" invariant).
    pub fn set_z_order_override(&mut self, sprite_ref: SpriteRef, z: i32) -> anyhow::Result<()> {
        if z >= self.z_order.hud {
            anyhow::bail!("Sprite z-order override {} would cross the HUD boundary ({})", z, self.z_order.hud);
        }
        self.get_mut(sprite_ref).z_order_override = Some(z);
        Ok(())
    }

    /// Copies every sprite's `current` state into its `before_scene` twin,
    /// run once per frame boundary (spec.md §9 "Pending visual state").
    pub fn commit_frame_boundary(&mut self) {
        self.lsp_before = self.lsp.clone();
        self.lsp2_before = self.lsp2.clone();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parent_child_links_are_kept_symmetric() {
        let mut sprites = SpriteTables::new();
        let parent = SpriteRef { id: 0, class: SpriteClass::Lsp };
        let child = SpriteRef { id: 1, class: SpriteClass::Lsp };
        sprites.set_parent(child, Some(parent));
        assert_eq!(sprites.get(child).parent, Some(parent));
        assert!(sprites.get(parent).children.contains(&child));
        sprites.set_parent(child, None);
        assert!(!sprites.get(parent).children.contains(&child));
    }

    #[test]
    fn z_order_override_cannot_cross_the_hud_boundary() {
        let mut sprites = SpriteTables::new();
        sprites.z_order.hud = 100;
        let sprite = SpriteRef { id: 0, class: SpriteClass::Lsp };
        assert!(sprites.set_z_order_override(sprite, 50).is_ok());
        assert!(sprites.set_z_order_override(sprite, 150).is_err());
    }

    #[test]
    fn commit_frame_boundary_snapshots_current_into_before() {
        let mut sprites = SpriteTables::new();
        let sprite = SpriteRef { id: 5, class: SpriteClass::Lsp };
        sprites.get_mut(sprite).alpha = 10;
        sprites.commit_frame_boundary();
        assert_eq!(sprites.lsp_before[5].alpha, 10);
        sprites.get_mut(sprite).alpha = 20;
        assert_eq!(sprites.lsp_before[5].alpha, 10);
    }
}
