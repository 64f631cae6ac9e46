//! In-process storage backend.
//!
//! Folders keep their children in insertion order, which is also the
//! enumeration order. New files from [`Storage::create_file`] go to the root
//! (no parent) and get sequential ids, so repeated conversions are easy to
//! tell apart in assertions.

use super::{DriveFile, FilePage, Storage, FOLDER_MIME_TYPE};
use crate::error::StorageError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// A stored file with its bytes and parent folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub file: DriveFile,
    /// `None` for files at the storage root.
    pub parent: Option<String>,
    pub content: Vec<u8>,
}

#[derive(Default)]
struct Inner {
    files: HashMap<String, StoredFile>,
    children: HashMap<String, Vec<String>>,
    created: Vec<String>,
    next_id: u64,
    list_calls: usize,
    upload_failure: Option<String>,
}

impl Inner {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("mem-{:06}", self.next_id)
    }
}

/// Thread-safe in-memory [`Storage`].
pub struct MemoryStorage {
    inner: Mutex<Inner>,
    page_size: usize,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            page_size: 100,
        }
    }

    /// Entries returned per listing page. Minimum 1.
    pub fn with_page_size(mut self, n: usize) -> Self {
        self.page_size = n.max(1);
        self
    }

    /// Register a folder under a caller-chosen id.
    pub fn add_folder(&self, folder_id: &str) {
        let mut inner = self.lock();
        inner.files.insert(
            folder_id.to_string(),
            StoredFile {
                file: DriveFile {
                    id: folder_id.to_string(),
                    name: folder_id.to_string(),
                    mime_type: FOLDER_MIME_TYPE.to_string(),
                },
                parent: None,
                content: Vec::new(),
            },
        );
        inner.children.entry(folder_id.to_string()).or_default();
    }

    /// Add a file to an existing folder and return its id.
    ///
    /// # Panics
    /// If `folder_id` was never registered with [`Self::add_folder`].
    pub fn add_file(&self, folder_id: &str, name: &str, mime_type: &str, content: Vec<u8>) -> String {
        let mut inner = self.lock();
        assert!(
            inner.children.contains_key(folder_id),
            "unknown folder '{folder_id}'"
        );
        let id = inner.allocate_id();
        inner.files.insert(
            id.clone(),
            StoredFile {
                file: DriveFile {
                    id: id.clone(),
                    name: name.to_string(),
                    mime_type: mime_type.to_string(),
                },
                parent: Some(folder_id.to_string()),
                content,
            },
        );
        if let Some(children) = inner.children.get_mut(folder_id) {
            children.push(id.clone());
        }
        id
    }

    /// Make every subsequent `create_file` fail with this message.
    pub fn fail_uploads_with(&self, message: impl Into<String>) {
        self.lock().upload_failure = Some(message.into());
    }

    /// Look up any stored file by id.
    pub fn file(&self, id: &str) -> Option<StoredFile> {
        self.lock().files.get(id).cloned()
    }

    /// Files created through [`Storage::create_file`], oldest first.
    pub fn created_files(&self) -> Vec<StoredFile> {
        let inner = self.lock();
        inner
            .created
            .iter()
            .filter_map(|id| inner.files.get(id).cloned())
            .collect()
    }

    /// How many listing pages have been served.
    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // a poisoned lock only means a test panicked mid-assertion
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn open_folder(&self, folder_id: &str) -> Result<DriveFile, StorageError> {
        let inner = self.lock();
        match inner.files.get(folder_id) {
            Some(stored) if stored.file.is_folder() => Ok(stored.file.clone()),
            Some(stored) => Err(StorageError::NotAFolder {
                id: folder_id.to_string(),
                mime_type: stored.file.mime_type.clone(),
            }),
            None => Err(StorageError::NotFound {
                id: folder_id.to_string(),
            }),
        }
    }

    async fn list_page(
        &self,
        folder_id: &str,
        page_token: Option<&str>,
    ) -> Result<FilePage, StorageError> {
        let mut inner = self.lock();
        inner.list_calls += 1;

        let offset = match page_token {
            None => 0,
            Some(t) => t
                .parse::<usize>()
                .map_err(|_| StorageError::Malformed(format!("bad page token '{t}'")))?,
        };
        let children = inner
            .children
            .get(folder_id)
            .ok_or_else(|| StorageError::NotFound {
                id: folder_id.to_string(),
            })?;

        let end = (offset + self.page_size).min(children.len());
        let files = children
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .filter_map(|id| inner.files.get(id).map(|s| s.file.clone()))
            .collect();
        let next_page_token = (end < children.len()).then(|| end.to_string());

        Ok(FilePage {
            files,
            next_page_token,
        })
    }

    async fn get_file(&self, file_id: &str) -> Result<DriveFile, StorageError> {
        self.lock()
            .files
            .get(file_id)
            .map(|s| s.file.clone())
            .ok_or_else(|| StorageError::NotFound {
                id: file_id.to_string(),
            })
    }

    async fn create_file(
        &self,
        name: &str,
        mime_type: &str,
        content: Vec<u8>,
    ) -> Result<DriveFile, StorageError> {
        let mut inner = self.lock();
        if let Some(ref message) = inner.upload_failure {
            return Err(StorageError::Api {
                status: 500,
                message: message.clone(),
            });
        }

        let id = inner.allocate_id();
        let file = DriveFile {
            id: id.clone(),
            name: name.to_string(),
            mime_type: mime_type.to_string(),
        };
        inner.files.insert(
            id.clone(),
            StoredFile {
                file: file.clone(),
                parent: None,
                content,
            },
        );
        inner.created.push(id);
        Ok(file)
    }
}
