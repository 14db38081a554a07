use anyhow::{Context, Result as AResult};
use libcommon::vfs::{VirtualFile, VirtualFileSystem};
use libcommon::Reader;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Reads scenario and asset files directly from a directory on disk. The
/// NSA/SAR archive readers spec.md §1 excludes from core scope would
/// implement the same two traits against an archive's table of contents
/// instead of the real filesystem.
#[derive(Debug)]
pub struct HostFileSystem {
    root: PathBuf,
}

impl HostFileSystem {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl VirtualFileSystem for HostFileSystem {
    fn open(&self, path: impl AsRef<Path>) -> AResult<Box<dyn VirtualFile>> {
        let full = self.root.join(path.as_ref());
        let file = File::open(&full).with_context(|| format!("Can't open {}", full.display()))?;
        let len = file.metadata()?.len();
        Ok(Box::new(HostFile { file, len }))
    }

    fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.root.join(path.as_ref()).exists()
    }
}

#[derive(Debug)]
struct HostFile {
    file: File,
    len: u64,
}

impl VirtualFile for HostFile {
    fn reader(&mut self) -> &mut dyn Reader {
        &mut self.file
    }

    fn len(&self) -> u64 {
        self.len
    }
}
