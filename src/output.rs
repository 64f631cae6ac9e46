//! Result types returned by the converter.

use crate::error::StepError;
use serde::{Deserialize, Serialize};

/// The image file created in storage by a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedFile {
    /// Storage id of the new file.
    pub id: String,
    /// `<stem>.png` or `<stem>.jpg`.
    pub name: String,
    /// `image/png` or `image/jpeg`.
    pub mime_type: String,
    /// Id of the PDF the preview was taken from.
    pub source_id: String,
    /// Name of that PDF.
    pub source_name: String,
    /// Why the local copy requested through `convert_to_file` could not be
    /// written. The file in storage exists regardless.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_copy_error: Option<String>,
}

/// Per-stage timings and sizes for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub locate_ms: u64,
    pub fetch_ms: u64,
    pub encode_ms: u64,
    pub upload_ms: u64,
    pub total_duration_ms: u64,
    /// Size of the thumbnail as served.
    pub preview_bytes: usize,
    /// Size of the uploaded image.
    pub output_bytes: usize,
}

/// How a conversion ended, once the folder was successfully opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConversionOutcome {
    /// A new image file exists in storage.
    Created {
        file: CreatedFile,
        stats: ConversionStats,
    },
    /// The folder holds no PDF with the requested title.
    NotFound,
    /// A stage failed; nothing was created.
    Failed(StepError),
}

impl ConversionOutcome {
    /// Id of the created file, if any.
    pub fn file_id(&self) -> Option<&str> {
        match self {
            ConversionOutcome::Created { file, .. } => Some(&file.id),
            _ => None,
        }
    }

    /// Collapse to the plain "id or nothing" result.
    pub fn into_file_id(self) -> Option<String> {
        match self {
            ConversionOutcome::Created { file, .. } => Some(file.id),
            _ => None,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, ConversionOutcome::Created { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_and_failed_collapse_to_none() {
        assert_eq!(ConversionOutcome::NotFound.into_file_id(), None);
        let failed = ConversionOutcome::Failed(StepError::AuthFailed {
            detail: "expired".into(),
        });
        assert!(failed.file_id().is_none());
        assert!(!failed.is_created());
    }

    #[test]
    fn created_serialises_to_json() {
        let outcome = ConversionOutcome::Created {
            file: CreatedFile {
                id: "new".into(),
                name: "invoice.png".into(),
                mime_type: "image/png".into(),
                source_id: "src".into(),
                source_name: "invoice.pdf".into(),
                local_copy_error: None,
            },
            stats: ConversionStats::default(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"invoice.png\""));
        assert!(!json.contains("local_copy_error"));
        assert_eq!(outcome.file_id(), Some("new"));
    }
}
