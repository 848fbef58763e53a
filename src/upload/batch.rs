//! Multi-file uploads and their results.
//!
//! A batch keeps one result per selected file, keyed by a hash of the file's
//! name and size, and an externally tracked order (the order the user
//! arranged the gallery in). Results arrive in any order; consumers read them
//! back in gallery order once every file has one.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::UploadError;

use super::driver::UploadedFile;
use super::file::{FileKey, UploadFile};

/// Outcome of uploading one file of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadResult {
    pub file: UploadFile,
    /// Position of the file in the batch order
    pub index: usize,
    pub result: Result<UploadedFile, UploadError>,
}

impl UploadResult {
    pub fn data(&self) -> Option<&Value> {
        self.result.as_ref().ok().map(|uploaded| &uploaded.data)
    }

    pub fn error(&self) -> Option<&UploadError> {
        self.result.as_ref().err()
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Files selected for upload together, with their results.
#[derive(Debug, Clone, Default)]
pub struct UploadBatch {
    files: HashMap<FileKey, UploadFile>,
    order: Vec<FileKey>,
    results: HashMap<FileKey, UploadResult>,
}

impl UploadBatch {
    /// Start a batch. Files repeating an earlier `(name, size)` are dropped.
    pub fn new(files: impl IntoIterator<Item = UploadFile>) -> Self {
        let mut batch = Self::default();
        for file in files {
            batch.add(file);
        }
        batch
    }

    /// Append a file. Returns `false` if an identical file is already queued.
    pub fn add(&mut self, file: UploadFile) -> bool {
        let key = file.key();
        if self.files.contains_key(&key) {
            log::debug!("Skipping duplicate file {:?}", file.name());
            return false;
        }
        self.order.push(key);
        self.files.insert(key, file);
        true
    }

    /// Remove a file and any result it had.
    pub fn remove(&mut self, key: FileKey) -> Option<UploadFile> {
        let file = self.files.remove(&key)?;
        self.order.retain(|k| *k != key);
        self.results.remove(&key);
        self.reindex();
        Some(file)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn order(&self) -> &[FileKey] {
        &self.order
    }

    /// Replace the batch order. Unknown keys are ignored; known keys missing
    /// from `order` keep their relative order at the end.
    pub fn set_order(&mut self, order: &[FileKey]) {
        let mut next: Vec<FileKey> = Vec::with_capacity(self.order.len());
        for key in order {
            if self.files.contains_key(key) && !next.contains(key) {
                next.push(*key);
            }
        }
        for key in &self.order {
            if !next.contains(key) {
                next.push(*key);
            }
        }
        self.order = next;
        self.reindex();
    }

    pub fn index_of(&self, key: FileKey) -> Option<usize> {
        self.order.iter().position(|k| *k == key)
    }

    /// Record the outcome for `file`. A later result replaces an earlier one.
    pub fn record(&mut self, file: UploadFile, result: Result<UploadedFile, UploadError>) -> bool {
        let key = file.key();
        let Some(index) = self.index_of(key) else {
            log::warn!("Result for unknown file {:?} dropped", file.name());
            return false;
        };
        if let Err(e) = &result {
            log::warn!("Upload of {:?} failed: {}", file.name(), e);
        }
        self.results.insert(
            key,
            UploadResult {
                file,
                index,
                result,
            },
        );
        true
    }

    pub fn result(&self, key: FileKey) -> Option<&UploadResult> {
        self.results.get(&key)
    }

    /// Every file has a result, successful or not.
    pub fn is_complete(&self) -> bool {
        !self.order.is_empty() && self.order.iter().all(|key| self.results.contains_key(key))
    }

    pub fn all_succeeded(&self) -> bool {
        self.is_complete() && self.results.values().all(UploadResult::is_ok)
    }

    /// Results in batch order. Files without a result are skipped.
    pub fn ordered_results(&self) -> Vec<&UploadResult> {
        self.order
            .iter()
            .filter_map(|key| self.results.get(key))
            .collect()
    }

    /// Files whose last attempt failed, in batch order.
    pub fn failed_files(&self) -> Vec<UploadFile> {
        self.ordered_results()
            .into_iter()
            .filter(|result| !result.is_ok())
            .map(|result| result.file.clone())
            .collect()
    }

    /// Files without a successful result, in batch order.
    pub fn pending_files(&self) -> Vec<UploadFile> {
        self.order
            .iter()
            .filter(|key| !self.results.get(*key).is_some_and(UploadResult::is_ok))
            .filter_map(|key| self.files.get(key).cloned())
            .collect()
    }

    fn reindex(&mut self) {
        for (index, key) in self.order.iter().enumerate() {
            if let Some(result) = self.results.get_mut(key) {
                result.index = index;
            }
        }
    }
}
