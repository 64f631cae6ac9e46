//! # drive-pdf2img
//!
//! Turn a PDF stored in a Google Drive folder into a PNG or JPEG image file
//! in the same Drive.
//!
//! Drive already renders a preview of every PDF it stores. This crate finds
//! the PDF by title, downloads that rendered thumbnail with the caller's
//! OAuth token, re-encodes it in the requested format and uploads it as a new
//! file at the root of the Drive. No PDF rasteriser is needed locally.
//!
//! ## Pipeline Overview
//!
//! ```text
//! folder id + title
//!  │
//!  ├─ 1. Open    verify the folder exists (the only fatal failure)
//!  ├─ 2. Locate  lazy scan, first application/pdf whose stem == title
//!  ├─ 3. Fetch   GET drive.google.com/thumbnail?id=…&sz=w1000 (bearer auth)
//!  ├─ 4. Encode  decode preview, re-encode as PNG (default) or JPEG
//!  └─ 5. Upload  create <stem>.png / <stem>.jpg at the Drive root
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use drive_pdf2img::{ConversionConfig, Converter, EnvToken, OutputFormat};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Token read from GOOGLE_OAUTH_TOKEN on every request
//!     let converter = Converter::google_drive(
//!         Arc::new(EnvToken::default()),
//!         ConversionConfig::default(),
//!     )?;
//!
//!     match converter.convert("1AbCdEfFolderId", "invoice", OutputFormat::Png).await? {
//!         Some(id) => println!("created {id}"),
//!         None => eprintln!("nothing created, see log"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Result semantics
//!
//! [`Converter::convert`] returns `Ok(Some(id))` on success and `Ok(None)`
//! both when no PDF matches and when a later stage fails; the log tells the
//! two apart. [`Converter::convert_detailed`] exposes the distinction as a
//! [`ConversionOutcome`]. Every successful call creates a new file, so
//! repeating a call yields a second, distinct id.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2img` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod auth;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use auth::{EnvToken, GcloudToken, StaticToken, TokenProvider};
pub use config::{ConversionConfig, ConversionConfigBuilder, OutputFormat};
pub use convert::Converter;
pub use error::{AuthError, Pdf2ImgError, StepError, StorageError};
pub use output::{ConversionOutcome, ConversionStats, CreatedFile};
pub use pipeline::fetch::{FetchedPreview, HttpPreviewFetcher, PreviewFetcher};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use storage::drive::DriveStorage;
pub use storage::memory::MemoryStorage;
pub use storage::{DriveFile, FilePage, FolderScan, Storage};
