use anyhow::Result as AResult;
use crate::Reader;
use std::path::Path;

/// Narrow contract for the "platform filesystem/archive reader" collaborator
/// spec.md §1 keeps out of the core runtime's scope: a scenario can be backed
/// by a plain directory or by an NSA/SAR-style archive, and the core should
/// not have to know which.
pub trait VirtualFileSystem {
    fn open(&self, path: impl AsRef<Path>) -> AResult<Box<dyn VirtualFile>>;
    fn exists(&self, path: impl AsRef<Path>) -> bool;
}

pub trait VirtualFile {
    fn reader(&mut self) -> &mut dyn Reader;
    fn len(&self) -> u64;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
