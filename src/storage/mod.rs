//! Storage collaborator: where PDFs are found and images are uploaded.
//!
//! The converter only needs four operations from its storage backend, captured
//! by the [`Storage`] trait. Two backends ship with the crate:
//!
//! * [`drive::DriveStorage`]  : Google Drive v3 REST API over reqwest
//! * [`memory::MemoryStorage`]: in-process folders for tests and dry runs
//!
//! Folder listings are paged. [`FolderScan`] turns pages into a lazy cursor
//! so a lookup that matches on the first page never requests the second.

pub mod drive;
pub mod memory;

use crate::error::StorageError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// MIME type Drive assigns to folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// MIME type of source documents the converter looks for.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// A file (or folder) record as returned by storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

/// One page of a folder listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePage {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    /// Opaque cursor for the next page; `None` on the last page.
    pub next_page_token: Option<String>,
}

/// Operations the converter consumes from a storage backend.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Resolve `folder_id` and verify it is an accessible folder.
    async fn open_folder(&self, folder_id: &str) -> Result<DriveFile, StorageError>;

    /// Fetch one page of the folder's direct children in storage order.
    async fn list_page(
        &self,
        folder_id: &str,
        page_token: Option<&str>,
    ) -> Result<FilePage, StorageError>;

    /// Read a file's metadata by id.
    async fn get_file(&self, file_id: &str) -> Result<DriveFile, StorageError>;

    /// Create a new file at the storage root and return its record.
    async fn create_file(
        &self,
        name: &str,
        mime_type: &str,
        content: Vec<u8>,
    ) -> Result<DriveFile, StorageError>;
}

/// Lazy, forward-only cursor over a folder's entries.
///
/// Pages are requested only when the buffered entries run out. The cursor
/// cannot be rewound; start a new scan to enumerate again.
pub struct FolderScan<'a> {
    storage: &'a dyn Storage,
    folder_id: String,
    buffered: VecDeque<DriveFile>,
    next_page_token: Option<String>,
    exhausted: bool,
    pages_fetched: usize,
}

impl<'a> FolderScan<'a> {
    pub fn new(storage: &'a dyn Storage, folder_id: impl Into<String>) -> Self {
        Self {
            storage,
            folder_id: folder_id.into(),
            buffered: VecDeque::new(),
            next_page_token: None,
            exhausted: false,
            pages_fetched: 0,
        }
    }

    /// Next entry in enumeration order, or `None` once the folder is exhausted.
    pub async fn next(&mut self) -> Result<Option<DriveFile>, StorageError> {
        loop {
            if let Some(file) = self.buffered.pop_front() {
                return Ok(Some(file));
            }
            if self.exhausted {
                return Ok(None);
            }

            let page = self
                .storage
                .list_page(&self.folder_id, self.next_page_token.as_deref())
                .await?;
            self.pages_fetched += 1;
            debug!(
                "Folder {}: page {} with {} entries",
                self.folder_id,
                self.pages_fetched,
                page.files.len()
            );

            self.buffered.extend(page.files);
            self.next_page_token = page.next_page_token.filter(|t| !t.is_empty());
            if self.next_page_token.is_none() {
                self.exhausted = true;
            }
        }
    }

    /// Number of listing pages requested so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }
}
