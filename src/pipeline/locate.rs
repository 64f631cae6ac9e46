//! Locate stage: find the PDF whose name, minus its extension, equals the title.

use crate::error::StorageError;
use crate::storage::{DriveFile, FolderScan, Storage, PDF_MIME_TYPE};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Trailing `.ext` with no `/` or further `.` inside the extension.
static EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.[^/.]+$").expect("valid extension regex"));

/// Remove the last extension from a file name.
///
/// `"invoice.pdf"` → `"invoice"`, `"q1.report.pdf"` → `"q1.report"`,
/// `"README"` → `"README"`.
pub fn strip_extension(name: &str) -> &str {
    match EXTENSION.find(name) {
        Some(m) => &name[..m.start()],
        None => name,
    }
}

/// True when `file` is a PDF whose extension-less name is exactly `title`.
pub fn is_match(file: &DriveFile, title: &str) -> bool {
    file.mime_type == PDF_MIME_TYPE && strip_extension(&file.name) == title
}

/// Scan `folder_id` and return the first matching PDF.
///
/// Stops requesting listing pages as soon as a match is found.
pub async fn locate_pdf(
    storage: &dyn Storage,
    folder_id: &str,
    title: &str,
) -> Result<Option<DriveFile>, StorageError> {
    let mut scan = FolderScan::new(storage, folder_id);
    let mut inspected = 0usize;

    while let Some(file) = scan.next().await? {
        inspected += 1;
        if is_match(&file, title) {
            debug!(
                "Matched '{}' ({}) after {} entries",
                file.name, file.id, inspected
            );
            return Ok(Some(file));
        }
    }

    debug!("No match among {} entries in {}", inspected, folder_id);
    Ok(None)
}
