//! Pictogram image storage.
//!
//! # Responsibility
//! - Store raw image bytes keyed by pictogram id.
//!
//! # Invariants
//! - Bytes are stored as given; format validation belongs to callers.
//! - A write replaces the previous image atomically (temp file + rename).

use crate::model::resource::ResourceId;
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Byte store for pictogram images.
pub trait ImageStore {
    /// Returns `None` when no image exists for `id`.
    fn get(&self, id: ResourceId) -> io::Result<Option<Vec<u8>>>;
    fn put(&self, id: ResourceId, bytes: &[u8]) -> io::Result<()>;
    /// Removing a missing image is not an error.
    fn remove(&self, id: ResourceId) -> io::Result<()>;
}

/// Filesystem-backed store writing one `<id>.png` file per pictogram.
#[derive(Debug, Clone)]
pub struct FsImageStore {
    root: PathBuf,
}

impl FsImageStore {
    /// Creates the store, creating `root` when missing.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: ResourceId) -> PathBuf {
        self.root.join(format!("{id}.png"))
    }
}

impl ImageStore for FsImageStore {
    fn get(&self, id: ResourceId) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(id)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn put(&self, id: ResourceId, bytes: &[u8]) -> io::Result<()> {
        let target = self.path_for(id);
        let staging = self.root.join(format!("{id}.png.tmp"));
        {
            let mut file = fs::File::create(&staging)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&staging, &target)
    }

    fn remove(&self, id: ResourceId) -> io::Result<()> {
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}
