//! Progress-callback trait for per-stage conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to observe
//! the pipeline as it moves through locate → fetch → encode → upload.
//!
//! # Example
//!
//! ```rust
//! use drive_pdf2img::{ConversionConfig, ConversionProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl ConversionProgressCallback for Printer {
//!     fn on_stage_start(&self, stage: Stage) {
//!         eprintln!("→ {stage}");
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One step of the conversion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Scanning the folder for the titled PDF.
    Locate,
    /// Downloading the thumbnail preview.
    Fetch,
    /// Re-encoding the preview as PNG or JPEG.
    Encode,
    /// Creating the new file in storage.
    Upload,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Locate => "locate",
            Stage::Fetch => "fetch",
            Stage::Encode => "encode",
            Stage::Upload => "upload",
        };
        f.write_str(s)
    }
}

/// Called by the converter as it moves through each stage.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync` because a
/// shared [`crate::Converter`] may be used from several tasks at once.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes successfully.
    ///
    /// # Arguments
    /// * `stage`     : the stage that finished
    /// * `elapsed_ms`: wall-clock time spent in it
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called when the scan finished without a matching PDF.
    fn on_not_found(&self, title: &str) {
        let _ = title;
    }

    /// Called when a stage failed; the call will report an absent result.
    fn on_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }

    /// Called once the new file exists in storage.
    fn on_created(&self, file_id: &str, name: &str) {
        let _ = (file_id, name);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
