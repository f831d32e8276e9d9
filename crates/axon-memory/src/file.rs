// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Durable memory backed by a JSON file
//!
//! Every write rewrites the file through a temporary sibling and a rename, so
//! a crash never leaves a half-written store behind. Opening an existing file
//! restores its contents.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{MemoryError, MemoryResult, MemoryStore, MemoryValue};

struct FileInner {
    entries: BTreeMap<String, MemoryValue>,
    closed: bool,
}

pub struct FileMemory {
    path: PathBuf,
    keep_file: bool,
    inner: RwLock<FileInner>,
}

impl FileMemory {
    /// Open (or create) the store at `path`.
    ///
    /// With `keep_file` unset the file is removed again on [`MemoryStore::close`].
    pub fn open(path: impl Into<PathBuf>, keep_file: bool) -> MemoryResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            BTreeMap::new()
        };

        let store = Self {
            path,
            keep_file,
            inner: RwLock::new(FileInner {
                entries,
                closed: false,
            }),
        };
        store.flush(&store.inner.read().entries)?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, MemoryValue>) -> MemoryResult<()> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn mutate<F>(&self, f: F) -> MemoryResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, MemoryValue>),
    {
        let mut inner = self.inner.write();
        if inner.closed {
            return Err(MemoryError::Closed);
        }
        f(&mut inner.entries);
        self.flush(&inner.entries)
    }
}

impl MemoryStore for FileMemory {
    fn set(&self, key: &str, value: MemoryValue) -> MemoryResult<()> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value);
        })
    }

    fn get(&self, key: &str) -> Option<MemoryValue> {
        let inner = self.inner.read();
        if inner.closed {
            return None;
        }
        inner.entries.get(key).cloned()
    }

    fn delete(&self, key: &str) -> MemoryResult<()> {
        self.mutate(|entries| {
            entries.remove(key);
        })
    }

    fn clear(&self) -> MemoryResult<()> {
        self.mutate(|entries| entries.clear())
    }

    fn close(&self) -> MemoryResult<()> {
        let mut inner = self.inner.write();
        if inner.closed {
            return Ok(());
        }
        inner.closed = true;
        inner.entries.clear();

        if !self.keep_file && self.path.exists() {
            fs::remove_file(&self.path)?;
            tracing::debug!(path = %self.path.display(), "memory file removed");
        }
        Ok(())
    }
}
