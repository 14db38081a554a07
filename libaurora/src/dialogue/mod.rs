//! Timed dialogue rendering: segment parsing and the per-frame controller
//! state machine (spec.md §4.3).

pub mod controller;
pub mod segment;
