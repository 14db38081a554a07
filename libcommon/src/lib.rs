#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
)]
#![warn(rust_2018_idioms)]

#[macro_use]
mod newtype;
pub mod convert;
mod error;
pub mod io;
pub mod vfs;

pub use error::{flatten_errors, ReasonsExt};
pub use io::*;

newtype_num! {
    /// A byte offset into a script buffer.
    #[derive(Debug)]
    pub struct ScriptAddress(pub u32);
}

newtype_num! {
    /// A 1-based in-label line number.
    #[derive(Debug)]
    pub struct LineNum(pub u32);
}

newtype_num! {
    /// Milliseconds of wall-clock time, as used by every scheduler action's
    /// countdown clock.
    #[derive(Debug)]
    pub struct Millis(pub u32);
}
