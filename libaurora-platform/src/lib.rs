//! Trait boundaries for everything spec.md §1 calls out as an external
//! collaborator: GPU/compositor abstraction, audio mixer, video decoder,
//! archive/filesystem access and input. `libaurora` only ever sees these
//! traits; concrete backends (SDL, a real audio mixer, an NSA reader) are
//! someone else's crate to write.

#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
)]
#![warn(rust_2018_idioms)]

pub mod audio;
pub mod cli;
pub mod compositor;
pub mod config;
pub mod error;
pub mod input;
pub mod video;
pub mod vfs;

pub use audio::AudioMixer;
pub use compositor::{Compositor, PresentRect};
pub use config::Config;
pub use error::PlatformError;
pub use input::{InputEvent, InputSource, Key};
pub use video::VideoDecoder;
pub use vfs::HostFileSystem;
