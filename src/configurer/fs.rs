//! Filesystem access used by the configurer.
//!
//! The configurer only needs four primitives. Keeping them behind a trait lets
//! tests inject failures at a specific step (e.g. the final rename).

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// Blocking file operations.
pub trait FileSystem: Send + Sync + std::fmt::Debug {
    fn exists(&self, path: &Path) -> bool;

    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Create or truncate `path` and write `contents` to it.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Replace `to` with `from` in a single step.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// The local disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(contents)?;
        // Data must be on disk before a rename can expose it.
        file.sync_all()
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }
}
