//! Directory persistence for cache namespaces
//!
//! Each entry lives in its own file, `<sha256(key) as hex>.json`, holding the
//! serialized [`CacheEntry`]. Writes land in a temporary file first and are
//! renamed into place.

use crate::cache::entry::CacheEntry;
use crate::error::{CacheError, Result};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

const ENTRY_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";

/// Entries recovered from a directory
#[derive(Debug, Default)]
pub struct LoadedEntries {
    pub entries: Vec<CacheEntry>,
    /// Files that could not be read as entries
    pub skipped: usize,
}

/// File-per-key store rooted at a directory
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// The directory is not touched until the first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `key`
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", file_stem(key), ENTRY_EXTENSION))
    }

    /// Persist an entry, replacing any previous file for its key
    pub async fn write(&self, entry: &CacheEntry) -> Result<PathBuf> {
        let bytes = serde_json::to_vec(entry).map_err(|source| CacheError::SerializationError {
            key: entry.key.clone(),
            source,
        })?;

        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| CacheError::io(&self.root, e))?;

        let path = self.entry_path(&entry.key);
        let tmp = self.root.join(format!(
            ".{}.{}.{}",
            file_stem(&entry.key),
            Uuid::new_v4().simple(),
            TEMP_EXTENSION
        ));

        if let Err(e) = fs::write(&tmp, &bytes).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(CacheError::io(&tmp, e));
        }

        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(CacheError::io(&path, e));
        }

        debug!("Wrote cache entry '{}' to {:?}", entry.key, path);
        Ok(path)
    }

    /// Delete the file for `key`; returns whether a file existed
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let path = self.entry_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::io(path, e)),
        }
    }

    /// Read a single entry file
    pub async fn read_entry(&self, path: &Path) -> Result<CacheEntry> {
        let bytes = fs::read(path).await.map_err(|e| CacheError::io(path, e))?;

        let mut entry: CacheEntry =
            serde_json::from_slice(&bytes).map_err(|e| CacheError::CorruptEntry {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if self.entry_path(&entry.key) != path {
            return Err(CacheError::CorruptEntry {
                path: path.to_path_buf(),
                reason: format!("file name does not match key '{}'", entry.key),
            });
        }

        entry.size_bytes = entry.calculate_size();
        Ok(entry)
    }

    /// Load every entry in the directory
    ///
    /// A missing directory is an empty namespace. Leftover temporary files
    /// are removed; unreadable entry files are skipped.
    pub async fn load_all(&self) -> Result<LoadedEntries> {
        let mut loaded = LoadedEntries::default();

        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(loaded),
            Err(e) => return Err(CacheError::io(&self.root, e)),
        };

        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| CacheError::io(&self.root, e))?
        {
            let path = item.path();
            match owned_file_kind(&path) {
                Some(OwnedFile::Temp) => {
                    debug!("Removing stale temporary file {:?}", path);
                    if let Err(e) = fs::remove_file(&path).await {
                        warn!("Failed to remove stale temporary file {:?}: {}", path, e);
                    }
                }
                Some(OwnedFile::Entry) => match self.read_entry(&path).await {
                    Ok(entry) => loaded.entries.push(entry),
                    Err(e) => {
                        warn!("Skipping unreadable cache file: {}", e);
                        loaded.skipped += 1;
                    }
                },
                None => {}
            }
        }

        Ok(loaded)
    }

    /// Delete every entry file; returns the number removed
    ///
    /// Files not named like an entry are left alone.
    pub async fn clear(&self) -> Result<usize> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(CacheError::io(&self.root, e)),
        };

        let mut removed = 0;
        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| CacheError::io(&self.root, e))?
        {
            let path = item.path();
            if owned_file_kind(&path) == Some(OwnedFile::Entry) {
                fs::remove_file(&path)
                    .await
                    .map_err(|e| CacheError::io(&path, e))?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum OwnedFile {
    Entry,
    Temp,
}

/// Classify files this store writes: `<hash>.json` and `.<hash>.<uuid>.tmp`
fn owned_file_kind(path: &Path) -> Option<OwnedFile> {
    let name = path.file_name()?.to_str()?;

    if let Some(stem) = name.strip_suffix(&format!(".{}", ENTRY_EXTENSION)) {
        return is_hash(stem).then_some(OwnedFile::Entry);
    }

    let rest = name
        .strip_prefix('.')?
        .strip_suffix(&format!(".{}", TEMP_EXTENSION))?;
    let (stem, _) = rest.split_once('.')?;
    is_hash(stem).then_some(OwnedFile::Temp)
}

fn is_hash(stem: &str) -> bool {
    stem.len() == 64 && stem.bytes().all(|b| b.is_ascii_hexdigit())
}

fn file_stem(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}
