//! Durable tier: one file per cache entry
//!
//! Entries live at `<dir>/<key>.<ext>` where `ext` comes from the codec.
//! Writes go through a temporary sibling and a rename so a reader never sees
//! a half-written entry from this process.

use crate::codec::Codec;
use crate::entry::CacheEntry;
use crate::key::CacheKey;
use crate::{Error, Result};
use std::fs;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Extension used for in-flight writes
const TMP_EXTENSION: &str = "tmp";

/// Outcome of reading an entry file
#[derive(Debug)]
pub enum DiskRead<T> {
    /// The file exists and decoded cleanly
    Hit(CacheEntry<T>),
    /// No file for this key
    Missing,
    /// The file exists but could not be read or decoded
    Corrupt(Error),
}

/// Directory of entry files encoded with codec `C`
#[derive(Debug)]
pub struct DiskStore<T, C> {
    dir: PathBuf,
    _marker: PhantomData<fn() -> (T, C)>,
}

impl<T, C: Codec<T>> DiskStore<T, C> {
    /// Create a store over `dir`; nothing is touched until the first write
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            _marker: PhantomData,
        }
    }

    /// Directory holding the entry files
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of the entry file for `key`
    #[must_use]
    pub fn path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.{}", key.as_hex(), C::EXTENSION))
    }

    /// Whether an entry file exists for `key`
    #[must_use]
    pub fn exists(&self, key: &CacheKey) -> bool {
        self.path(key).is_file()
    }

    /// Encode and write an entry, replacing any previous file for the key
    pub fn write(&self, key: &CacheKey, entry: &CacheEntry<T>) -> Result<()> {
        let bytes = C::encode(entry)?;
        write_atomic(&self.path(key), &bytes)
    }

    /// Read and decode the entry for `key`
    pub fn read(&self, key: &CacheKey) -> DiskRead<T> {
        let path = self.path(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return DiskRead::Missing,
            Err(e) => return DiskRead::Corrupt(Error::io(e, &path, "read")),
        };
        match C::decode(&bytes) {
            Ok(entry) => DiskRead::Hit(entry),
            Err(e) => DiskRead::Corrupt(e),
        }
    }

    /// Delete the entry file for `key`; a missing file is not an error
    pub fn remove(&self, key: &CacheKey) -> Result<()> {
        remove_if_exists(&self.path(key))
    }

    /// Delete every entry file, returning how many were removed
    pub fn remove_all(&self) -> Result<usize> {
        let files = self.list_entry_files()?;
        for file in &files {
            remove_if_exists(file)?;
        }
        Ok(files.len())
    }

    /// Keys of every entry file present on disk
    pub fn list_keys(&self) -> Result<Vec<CacheKey>> {
        Ok(self
            .list_entry_files()?
            .iter()
            .filter_map(|path| path.file_stem()?.to_str())
            .filter_map(CacheKey::from_hex)
            .collect())
    }

    /// Paths of every entry file, sorted
    ///
    /// Only `<64 hex chars>.<ext>` files count; the ledger and temporaries
    /// sharing the directory are skipped. A missing directory is empty.
    pub fn list_entry_files(&self) -> Result<Vec<PathBuf>> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(e, &self.dir, "read_dir")),
        };

        let mut files = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| Error::io(e, &self.dir, "read_dir_entry"))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some(C::EXTENSION) {
                continue;
            }
            let is_entry = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(CacheKey::from_hex)
                .is_some();
            if is_entry {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Write `bytes` to `path` via a temporary sibling and a rename
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(e, parent, "create_dir_all"))?;
    }

    let tmp_path = path.with_extension(TMP_EXTENSION);
    let mut file = fs::File::create(&tmp_path).map_err(|e| Error::io(e, &tmp_path, "create"))?;
    file.write_all(bytes)
        .map_err(|e| Error::io(e, &tmp_path, "write"))?;
    file.sync_all().map_err(|e| Error::io(e, &tmp_path, "sync"))?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        Error::io(e, path, "rename")
    })
}

/// Remove a file, treating "already gone" as success
pub(crate) fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(e, path, "remove")),
    }
}
