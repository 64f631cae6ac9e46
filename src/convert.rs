//! The converter: locate → fetch → encode → upload.
//!
//! [`Converter`] owns its three collaborators (storage, preview fetcher,
//! token provider) behind trait objects, so the same pipeline runs against
//! Google Drive in production and against [`crate::storage::memory`] in tests.
//!
//! Only an unusable folder is fatal. Every later failure is logged as
//! `Error converting the file: …` and reported as an absent result; a
//! missing PDF is logged as "not found" and reported the same way.

use crate::auth::TokenProvider;
use crate::config::{ConversionConfig, OutputFormat};
use crate::error::{Pdf2ImgError, StepError};
use crate::output::{ConversionOutcome, ConversionStats, CreatedFile};
use crate::pipeline::fetch::{self, HttpPreviewFetcher, PreviewFetcher};
use crate::pipeline::{encode, locate};
use crate::progress::Stage;
use crate::storage::drive::DriveStorage;
use crate::storage::Storage;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Converts a titled PDF in a folder into an uploaded PNG/JPEG preview.
///
/// Cheap to share: wrap in an `Arc` and call from as many tasks as needed.
/// Calls do not coordinate; each successful one creates its own file.
pub struct Converter {
    storage: Arc<dyn Storage>,
    fetcher: Arc<dyn PreviewFetcher>,
    token: Arc<dyn TokenProvider>,
    config: ConversionConfig,
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("storage", &"<dyn Storage>")
            .field("fetcher", &"<dyn PreviewFetcher>")
            .field("token", &"<dyn TokenProvider>")
            .field("config", &self.config)
            .finish()
    }
}

impl Converter {
    pub fn new(
        storage: Arc<dyn Storage>,
        fetcher: Arc<dyn PreviewFetcher>,
        token: Arc<dyn TokenProvider>,
        config: ConversionConfig,
    ) -> Self {
        Self {
            storage,
            fetcher,
            token,
            config,
        }
    }

    /// Converter wired to the real Drive API and thumbnail endpoint.
    ///
    /// The same token provider authorises both storage calls and the
    /// thumbnail request.
    pub fn google_drive(
        token: Arc<dyn TokenProvider>,
        config: ConversionConfig,
    ) -> Result<Self, Pdf2ImgError> {
        let fetcher = HttpPreviewFetcher::new(config.fetch_timeout_secs)?;
        let storage = DriveStorage::new(Arc::clone(&token));
        Ok(Self::new(Arc::new(storage), Arc::new(fetcher), token, config))
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Convert the PDF titled `title` in `folder_id` and return the new file's id.
    ///
    /// # Returns
    /// * `Ok(Some(id))`: a new image file was created
    /// * `Ok(None)`: no matching PDF, or a later stage failed (see the log)
    ///
    /// # Errors
    /// `Err(Pdf2ImgError::FolderUnavailable)` when the folder cannot be opened.
    pub async fn convert(
        &self,
        folder_id: &str,
        title: &str,
        format: OutputFormat,
    ) -> Result<Option<String>, Pdf2ImgError> {
        Ok(self
            .convert_detailed(folder_id, title, format)
            .await?
            .into_file_id())
    }

    /// Like [`Self::convert`] but keeps "not found" and "failed" apart and
    /// reports per-stage timings.
    pub async fn convert_detailed(
        &self,
        folder_id: &str,
        title: &str,
        format: OutputFormat,
    ) -> Result<ConversionOutcome, Pdf2ImgError> {
        let (outcome, _) = self.run(folder_id, title, format, false).await?;
        Ok(outcome)
    }

    /// Convert, then also write the uploaded image bytes to `output_path`.
    ///
    /// The local file is written atomically (temp file + rename) and only
    /// when a file was created in storage. A failed local write does not undo
    /// the upload: the outcome stays `Created` and carries the write error in
    /// [`CreatedFile::local_copy_error`].
    pub async fn convert_to_file(
        &self,
        folder_id: &str,
        title: &str,
        format: OutputFormat,
        output_path: impl AsRef<Path>,
    ) -> Result<ConversionOutcome, Pdf2ImgError> {
        let (mut outcome, bytes) = self.run(folder_id, title, format, true).await?;
        if let (Some(bytes), ConversionOutcome::Created { file, .. }) = (bytes, &mut outcome) {
            if let Err(e) = write_local_copy(output_path.as_ref(), &bytes).await {
                error!("Created {} but could not keep a local copy: {}", file.id, e);
                file.local_copy_error = Some(e.to_string());
            }
        }
        Ok(outcome)
    }

    /// Blocking wrapper around [`Self::convert`].
    ///
    /// Creates a single-threaded tokio runtime internally; do not call from
    /// inside an async context.
    pub fn convert_sync(
        &self,
        folder_id: &str,
        title: &str,
        format: OutputFormat,
    ) -> Result<Option<String>, Pdf2ImgError> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Pdf2ImgError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.convert(folder_id, title, format))
    }

    async fn run(
        &self,
        folder_id: &str,
        title: &str,
        format: OutputFormat,
        keep_bytes: bool,
    ) -> Result<(ConversionOutcome, Option<Vec<u8>>), Pdf2ImgError> {
        let total_start = Instant::now();
        info!("Converting '{}' in folder {} to {}", title, folder_id, format);
        let mut stats = ConversionStats::default();

        // ── Step 1: Open folder ──────────────────────────────────────────────
        self.storage
            .open_folder(folder_id)
            .await
            .map_err(|source| Pdf2ImgError::FolderUnavailable {
                folder_id: folder_id.to_string(),
                source,
            })?;

        // ── Step 2: Locate ───────────────────────────────────────────────────
        let started = self.begin(Stage::Locate);
        let located = match locate::locate_pdf(self.storage.as_ref(), folder_id, title).await {
            Ok(found) => found,
            Err(e) => {
                let err = StepError::ListingFailed {
                    folder_id: folder_id.to_string(),
                    detail: e.to_string(),
                };
                return Ok((self.fail(Stage::Locate, err), None));
            }
        };
        stats.locate_ms = self.finish(Stage::Locate, started);

        let Some(located) = located else {
            warn!("PDF titled '{}' not found in folder {}", title, folder_id);
            if let Some(cb) = self.config.progress_callback.as_deref() {
                cb.on_not_found(title);
            }
            return Ok((ConversionOutcome::NotFound, None));
        };

        // ── Step 3: Fetch preview ────────────────────────────────────────────
        let started = self.begin(Stage::Fetch);
        let source = match self.storage.get_file(&located.id).await {
            Ok(file) => file,
            Err(e) => {
                let err = StepError::LookupFailed {
                    file_id: located.id.clone(),
                    detail: e.to_string(),
                };
                return Ok((self.fail(Stage::Fetch, err), None));
            }
        };
        let preview = match fetch::fetch_preview(
            self.fetcher.as_ref(),
            self.token.as_ref(),
            &self.config,
            &source.id,
        )
        .await
        {
            Ok(p) => p,
            Err(err) => return Ok((self.fail(Stage::Fetch, err), None)),
        };
        stats.fetch_ms = self.finish(Stage::Fetch, started);
        stats.preview_bytes = preview.bytes.len();

        // ── Step 4: Encode ───────────────────────────────────────────────────
        let started = self.begin(Stage::Encode);
        let name = encode::output_name(&source.name, format);
        let bytes = match encode::encode_preview(&preview.bytes, format, self.config.jpeg_quality)
        {
            Ok(b) => b,
            Err(err) => return Ok((self.fail(Stage::Encode, err), None)),
        };
        stats.encode_ms = self.finish(Stage::Encode, started);
        stats.output_bytes = bytes.len();

        // ── Step 5: Upload ───────────────────────────────────────────────────
        let started = self.begin(Stage::Upload);
        let local_copy = keep_bytes.then(|| bytes.clone());
        let created = match self
            .storage
            .create_file(&name, format.mime_type(), bytes)
            .await
        {
            Ok(f) => f,
            Err(e) => {
                let err = StepError::UploadFailed {
                    name,
                    detail: e.to_string(),
                };
                return Ok((self.fail(Stage::Upload, err), None));
            }
        };
        stats.upload_ms = self.finish(Stage::Upload, started);
        stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

        info!(
            "Created '{}' ({}) from '{}' in {}ms",
            created.name, created.id, source.name, stats.total_duration_ms
        );
        if let Some(cb) = self.config.progress_callback.as_deref() {
            cb.on_created(&created.id, &created.name);
        }

        let file = CreatedFile {
            id: created.id,
            name: created.name,
            mime_type: created.mime_type,
            source_id: source.id,
            source_name: source.name,
            local_copy_error: None,
        };
        Ok((ConversionOutcome::Created { file, stats }, local_copy))
    }

    fn begin(&self, stage: Stage) -> Instant {
        debug!("Stage {} started", stage);
        if let Some(cb) = self.config.progress_callback.as_deref() {
            cb.on_stage_start(stage);
        }
        Instant::now()
    }

    fn finish(&self, stage: Stage, started: Instant) -> u64 {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        debug!("Stage {} finished in {}ms", stage, elapsed_ms);
        if let Some(cb) = self.config.progress_callback.as_deref() {
            cb.on_stage_complete(stage, elapsed_ms);
        }
        elapsed_ms
    }

    fn fail(&self, stage: Stage, err: StepError) -> ConversionOutcome {
        error!("Error converting the file: {}", err);
        if let Some(cb) = self.config.progress_callback.as_deref() {
            cb.on_error(stage, &err.to_string());
        }
        ConversionOutcome::Failed(err)
    }
}

/// Atomic write: temp file next to the target, then rename.
async fn write_local_copy(path: &Path, bytes: &[u8]) -> Result<(), Pdf2ImgError> {
    let write_failed = |source: std::io::Error| Pdf2ImgError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(write_failed)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, bytes)
        .await
        .map_err(write_failed)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_failed(e));
    }

    debug!("Wrote local copy to {}", path.display());
    Ok(())
}
