mod nul_string;
mod seek_ext;

pub use nul_string::{ReadNulStringExt, WriteNulStringExt};
pub use seek_ext::SeekExt;

use std::io;

pub trait Reader: io::Read + io::Seek + core::fmt::Debug {}
impl <T: io::Read + io::Seek + ?Sized + core::fmt::Debug> Reader for T {}
