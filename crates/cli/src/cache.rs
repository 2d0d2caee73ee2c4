// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Two-level result cache.
//!
//! Persists file fingerprints, ASTs, and rule results across runs. ASTs
//! are grouped into one blob per directory (directories tend to be
//! re-analyzed as units, and grouping amortizes per-file filesystem
//! overhead); rule results live in one sidecar blob per file, since they
//! are usually far smaller than the AST.
//!
//! Change detection is fingerprint-based: size and mtime first, with the
//! md5 content hash consulted only when size matches but mtime moved.
//! The hash is never recomputed when size+mtime already prove equality.
//!
//! All operations are safe for concurrent callers: readers take the
//! shared lock, mutators the exclusive lock. Every on-disk write goes
//! through write-new-then-rename.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ast::Ast;
use crate::rule::Match;

/// Cache schema version; mismatched caches are discarded and rebuilt.
pub const CACHE_VERSION: &str = "1.0";

/// Index file name within the cache directory.
pub const INDEX_FILE_NAME: &str = "cache-index.json";

/// Error type for cache persistence.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// I/O error.
    #[error("io error: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome of validating a file against its recorded fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeState {
    /// Content differs from the cached fingerprint (or no entry exists).
    Changed,
    /// On-disk state matches the cached fingerprint.
    Unchanged,
    /// The file could not be examined.
    Unknown,
}

/// Per-file cache record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    /// File size in bytes.
    pub size: u64,
    /// Modification time seconds since epoch.
    pub mtime_secs: i64,
    /// Modification time nanoseconds.
    pub mtime_nanos: u32,
    /// md5 of the file content at analysis time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// When this file was last analyzed.
    pub last_analyzed: DateTime<Utc>,
    /// Key of the directory blob holding this file's AST.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir_cache_key: Option<String>,
    /// Key of the rule-result blob for this file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_cache_key: Option<String>,
}

/// The persistent index: every known file plus the directory key map.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheIndex {
    version: String,
    created_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
    files: HashMap<PathBuf, FileInfo>,
    directories: HashMap<PathBuf, String>,
}

impl CacheIndex {
    fn empty() -> Self {
        let now = Utc::now();
        Self {
            version: CACHE_VERSION.to_string(),
            created_at: now,
            last_updated: now,
            files: HashMap::new(),
            directories: HashMap::new(),
        }
    }
}

/// One directory's ASTs, keyed by basename.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectoryBlob {
    directory_path: PathBuf,
    last_updated: DateTime<Utc>,
    asts: HashMap<String, Ast>,
}

/// One file's matches from the last successful run.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuleResultBlob {
    version: String,
    file_path: PathBuf,
    last_updated: DateTime<Utc>,
    matches: Vec<Match>,
}

/// A lazily-loaded blob plus its dirty flag.
struct BlobSlot<T> {
    blob: T,
    dirty: bool,
}

/// In-memory cache state behind the lock.
struct CacheState {
    index: CacheIndex,
    dir_blobs: HashMap<String, BlobSlot<DirectoryBlob>>,
    rule_blobs: HashMap<String, BlobSlot<RuleResultBlob>>,
}

/// The process-wide result cache.
pub struct ResultCache {
    dir: PathBuf,
    state: RwLock<CacheState>,
}

/// md5 hex digest of raw bytes.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

/// Cache key for a directory: md5 hex of its absolute path.
pub fn directory_key(dir: &Path) -> String {
    content_hash(dir.display().to_string().as_bytes())
}

/// Cache key for a file's rule results: md5 hex of its absolute path.
pub fn file_key(path: &Path) -> String {
    content_hash(path.display().to_string().as_bytes())
}

/// (size, mtime_secs, mtime_nanos) from file metadata.
fn fingerprint_of(meta: &std::fs::Metadata) -> (u64, i64, u32) {
    let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    let duration = mtime
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();
    (meta.len(), duration.as_secs() as i64, duration.subsec_nanos())
}

impl ResultCache {
    /// Load the cache from `cache_dir`.
    ///
    /// Any read or parse failure, and any schema-version mismatch, yields
    /// an empty cache with a logged warning; the run continues uncached.
    pub fn load(cache_dir: &Path) -> Self {
        let index_path = cache_dir.join(INDEX_FILE_NAME);
        let index = if index_path.exists() {
            match read_json::<CacheIndex>(&index_path) {
                Ok(index) if index.version == CACHE_VERSION => {
                    tracing::debug!("loaded cache index with {} entries", index.files.len());
                    index
                }
                Ok(index) => {
                    tracing::warn!(
                        "cache schema version {} != {CACHE_VERSION}, rebuilding",
                        index.version
                    );
                    CacheIndex::empty()
                }
                Err(e) => {
                    tracing::warn!("cannot load cache index, starting empty: {e}");
                    CacheIndex::empty()
                }
            }
        } else {
            CacheIndex::empty()
        };

        Self {
            dir: cache_dir.to_path_buf(),
            state: RwLock::new(CacheState {
                index,
                dir_blobs: HashMap::new(),
                rule_blobs: HashMap::new(),
            }),
        }
    }

    /// Delete the entire cache directory.
    pub fn clear(cache_dir: &Path) -> Result<(), CacheError> {
        match std::fs::remove_dir_all(cache_dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Io {
                path: cache_dir.to_path_buf(),
                source: e,
            }),
        }
    }

    /// The cache directory this cache persists to.
    pub fn cache_dir(&self) -> &Path {
        &self.dir
    }

    /// Number of files the index knows about.
    pub fn entry_count(&self) -> usize {
        self.read().index.files.len()
    }

    /// Validate a file against its recorded fingerprint.
    pub fn is_changed(&self, path: &Path) -> ChangeState {
        let Ok(meta) = std::fs::metadata(path) else {
            return ChangeState::Unknown;
        };
        let (size, mtime_secs, mtime_nanos) = fingerprint_of(&meta);

        let state = self.read();
        let Some(info) = state.index.files.get(path) else {
            return ChangeState::Changed;
        };
        if info.size != size {
            return ChangeState::Changed;
        }
        if info.mtime_secs == mtime_secs && info.mtime_nanos == mtime_nanos {
            // size+mtime prove equality; the hash is never recomputed here
            return ChangeState::Unchanged;
        }
        // mtime moved but size matches: the recorded hash decides
        let Some(recorded) = &info.content_hash else {
            return ChangeState::Changed;
        };
        let Ok(bytes) = std::fs::read(path) else {
            return ChangeState::Unknown;
        };
        if content_hash(&bytes) == *recorded {
            ChangeState::Unchanged
        } else {
            ChangeState::Changed
        }
    }

    /// Fetch the cached AST for a file, loading its directory blob on demand.
    pub fn get_ast(&self, path: &Path) -> Option<Ast> {
        let file_name = path.file_name()?.to_str()?.to_string();
        let key = {
            let state = self.read();
            state.index.files.get(path)?.dir_cache_key.clone()?
        };

        {
            let state = self.read();
            if let Some(slot) = state.dir_blobs.get(&key) {
                return slot.blob.asts.get(&file_name).cloned();
            }
        }

        let blob = self.read_dir_blob(&key)?;
        let mut state = self.write();
        let slot = state
            .dir_blobs
            .entry(key)
            .or_insert(BlobSlot { blob, dirty: false });
        slot.blob.asts.get(&file_name).cloned()
    }

    /// Fetch the cached rule results for a file.
    pub fn get_rule_results(&self, path: &Path) -> Option<Vec<Match>> {
        let key = {
            let state = self.read();
            state.index.files.get(path)?.rule_cache_key.clone()?
        };

        {
            let state = self.read();
            if let Some(slot) = state.rule_blobs.get(&key) {
                return Some(slot.blob.matches.clone());
            }
        }

        let blob = self.read_rule_blob(&key)?;
        let mut state = self.write();
        let slot = state
            .rule_blobs
            .entry(key)
            .or_insert(BlobSlot { blob, dirty: false });
        Some(slot.blob.matches.clone())
    }

    /// Record a freshly parsed AST plus the file's fingerprint.
    ///
    /// Takes the source text the caller already has in hand so the md5
    /// can be recorded without a second read.
    pub fn store_ast(&self, path: &Path, source: &str, ast: Ast) {
        let Ok(meta) = std::fs::metadata(path) else {
            tracing::warn!("cannot stat {}, not caching", path.display());
            return;
        };
        let (size, mtime_secs, mtime_nanos) = fingerprint_of(&meta);
        let (Some(parent), Some(file_name)) = (
            path.parent().map(Path::to_path_buf),
            path.file_name().and_then(|n| n.to_str()).map(str::to_string),
        ) else {
            return;
        };
        let dir_key = directory_key(&parent);
        let now = Utc::now();

        // Pull an existing blob off disk before taking the write lock
        let resident = self.read().dir_blobs.contains_key(&dir_key);
        let disk_blob = if resident {
            None
        } else {
            self.read_dir_blob(&dir_key)
        };

        let mut guard = self.write();
        let state = &mut *guard;

        let slot = state
            .dir_blobs
            .entry(dir_key.clone())
            .or_insert_with(|| BlobSlot {
                blob: disk_blob.unwrap_or(DirectoryBlob {
                    directory_path: parent.clone(),
                    last_updated: now,
                    asts: HashMap::new(),
                }),
                dirty: false,
            });
        slot.blob.asts.insert(file_name, ast);
        slot.blob.last_updated = now;
        slot.dirty = true;

        state.index.directories.insert(parent, dir_key.clone());
        let rule_cache_key = state
            .index
            .files
            .get(path)
            .and_then(|info| info.rule_cache_key.clone());
        state.index.files.insert(
            path.to_path_buf(),
            FileInfo {
                size,
                mtime_secs,
                mtime_nanos,
                content_hash: Some(content_hash(source.as_bytes())),
                last_analyzed: now,
                dir_cache_key: Some(dir_key),
                rule_cache_key,
            },
        );
    }

    /// Record the matches the rules produced for a file.
    pub fn store_rule_results(&self, path: &Path, matches: Vec<Match>) {
        let key = file_key(path);
        let now = Utc::now();

        let mut guard = self.write();
        let state = &mut *guard;
        state.rule_blobs.insert(
            key.clone(),
            BlobSlot {
                blob: RuleResultBlob {
                    version: CACHE_VERSION.to_string(),
                    file_path: path.to_path_buf(),
                    last_updated: now,
                    matches,
                },
                dirty: true,
            },
        );

        if let Some(info) = state.index.files.get_mut(path) {
            info.rule_cache_key = Some(key);
            info.last_analyzed = now;
        } else if let Ok(meta) = std::fs::metadata(path) {
            let (size, mtime_secs, mtime_nanos) = fingerprint_of(&meta);
            state.index.files.insert(
                path.to_path_buf(),
                FileInfo {
                    size,
                    mtime_secs,
                    mtime_nanos,
                    content_hash: None,
                    last_analyzed: now,
                    dir_cache_key: None,
                    rule_cache_key: Some(key),
                },
            );
        }
    }

    /// Drop entries whose file no longer exists. Returns the count removed.
    pub fn cleanup_stale(&self) -> usize {
        let stale: Vec<PathBuf> = {
            let state = self.read();
            state
                .index
                .files
                .keys()
                .filter(|path| !path.exists())
                .cloned()
                .collect()
        };

        for path in &stale {
            // Blob loads happen outside the write lock
            let dir_key = {
                let state = self.read();
                state
                    .index
                    .files
                    .get(path)
                    .and_then(|info| info.dir_cache_key.clone())
            };
            let disk_blob = dir_key.as_ref().and_then(|key| {
                let resident = self.read().dir_blobs.contains_key(key);
                if resident { None } else { self.read_dir_blob(key) }
            });

            let mut guard = self.write();
            let state = &mut *guard;
            let Some(info) = state.index.files.remove(path) else {
                continue;
            };

            if let Some(dir_key) = info.dir_cache_key {
                if let Some(blob) = disk_blob {
                    state
                        .dir_blobs
                        .entry(dir_key.clone())
                        .or_insert(BlobSlot { blob, dirty: false });
                }
                let now_empty = match state.dir_blobs.get_mut(&dir_key) {
                    Some(slot) => {
                        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                            slot.blob.asts.remove(name);
                            slot.dirty = true;
                        }
                        slot.blob.asts.is_empty()
                    }
                    None => false,
                };
                if now_empty {
                    state.dir_blobs.remove(&dir_key);
                    let _ = std::fs::remove_file(self.dir.join(format!("dir_{dir_key}.json")));
                    if let Some(parent) = path.parent() {
                        state.index.directories.remove(parent);
                    }
                }
            }

            if let Some(rule_key) = info.rule_cache_key {
                state.rule_blobs.remove(&rule_key);
                let _ = std::fs::remove_file(self.dir.join(format!("rules_{rule_key}.json")));
            }
        }

        if !stale.is_empty() {
            tracing::info!("dropped {} stale cache entries", stale.len());
        }
        stale.len()
    }

    /// Persist dirty blobs and the index, each via write-new-then-rename.
    pub fn save(&self) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| CacheError::Io {
            path: self.dir.clone(),
            source: e,
        })?;

        let mut guard = self.write();
        let state = &mut *guard;

        for (key, slot) in state.dir_blobs.iter_mut().filter(|(_, s)| s.dirty) {
            atomic_write_json(&self.dir.join(format!("dir_{key}.json")), &slot.blob)?;
            slot.dirty = false;
        }
        for (key, slot) in state.rule_blobs.iter_mut().filter(|(_, s)| s.dirty) {
            atomic_write_json(&self.dir.join(format!("rules_{key}.json")), &slot.blob)?;
            slot.dirty = false;
        }

        state.index.last_updated = Utc::now();
        atomic_write_json(&self.dir.join(INDEX_FILE_NAME), &state.index)?;
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Read a directory blob from disk; None (with a warning) on any failure.
    fn read_dir_blob(&self, key: &str) -> Option<DirectoryBlob> {
        let path = self.dir.join(format!("dir_{key}.json"));
        if !path.exists() {
            return None;
        }
        match read_json::<DirectoryBlob>(&path) {
            Ok(blob) => Some(blob),
            Err(e) => {
                tracing::warn!("corrupt directory blob {}, ignoring: {e}", path.display());
                None
            }
        }
    }

    /// Read a rule-result blob from disk; version mismatches are misses.
    fn read_rule_blob(&self, key: &str) -> Option<RuleResultBlob> {
        let path = self.dir.join(format!("rules_{key}.json"));
        if !path.exists() {
            return None;
        }
        match read_json::<RuleResultBlob>(&path) {
            Ok(blob) if blob.version == CACHE_VERSION => Some(blob),
            Ok(blob) => {
                tracing::debug!(
                    "rule blob version {} != {CACHE_VERSION}, treating as miss",
                    blob.version
                );
                None
            }
            Err(e) => {
                tracing::warn!("corrupt rule blob {}, ignoring: {e}", path.display());
                None
            }
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CacheError> {
    let bytes = std::fs::read(path).map_err(|e| CacheError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Write JSON atomically: serialize, write a `.tmp` sibling, rename over.
fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CacheError> {
    let bytes = serde_json::to_vec(value)?;
    let temp_path = path.with_extension("tmp");
    std::fs::write(&temp_path, &bytes).map_err(|e| CacheError::Io {
        path: temp_path.clone(),
        source: e,
    })?;
    std::fs::rename(&temp_path, path).map_err(|e| CacheError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
