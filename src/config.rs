//! Configuration types for PDF-to-image conversion.
//!
//! Everything the converter needs beyond its collaborators lives in
//! [`ConversionConfig`], built via [`ConversionConfigBuilder`]. Defaults
//! reproduce the plain Drive thumbnail flow: a 1000 px wide preview, no
//! explicit fetch timeout, PNG output.

use crate::error::Pdf2ImgError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Public Drive endpoint serving rendered previews of any file.
pub const DEFAULT_THUMBNAIL_ENDPOINT: &str = "https://drive.google.com/thumbnail";

/// Configuration for a single conversion.
///
/// # Example
/// ```rust
/// use drive_pdf2img::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .thumbnail_width(1600)
///     .jpeg_quality(80)
///     .build()
///     .unwrap();
/// assert_eq!(config.thumbnail_width, 1600);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Base URL of the thumbnail service. Default: [`DEFAULT_THUMBNAIL_ENDPOINT`].
    ///
    /// Overridable so tests can point the fetch stage at a mock server.
    pub thumbnail_endpoint: String,

    /// Requested preview width in pixels, sent as `sz=w<width>`. Range: 16–4000. Default: 1000.
    pub thumbnail_width: u32,

    /// Timeout for the thumbnail request in seconds. Default: None.
    ///
    /// `None` leaves the HTTP client's own default in place.
    pub fetch_timeout_secs: Option<u64>,

    /// JPEG encoder quality (1–100). Default: 90. Ignored for PNG output.
    pub jpeg_quality: u8,

    /// Optional stage-event callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            thumbnail_endpoint: DEFAULT_THUMBNAIL_ENDPOINT.to_string(),
            thumbnail_width: 1000,
            fetch_timeout_secs: None,
            jpeg_quality: 90,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("thumbnail_endpoint", &self.thumbnail_endpoint)
            .field("thumbnail_width", &self.thumbnail_width)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("jpeg_quality", &self.jpeg_quality)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Thumbnail URL for the given file id, e.g.
    /// `https://drive.google.com/thumbnail?id=abc&sz=w1000`.
    pub fn thumbnail_url(&self, file_id: &str) -> String {
        format!(
            "{}?id={}&sz=w{}",
            self.thumbnail_endpoint.trim_end_matches('/'),
            file_id,
            self.thumbnail_width
        )
    }
}

/// Builder for [`ConversionConfig`].
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl fmt::Debug for ConversionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ConversionConfigBuilder {
    pub fn thumbnail_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.thumbnail_endpoint = url.into();
        self
    }

    pub fn thumbnail_width(mut self, width: u32) -> Self {
        self.config.thumbnail_width = width.clamp(16, 4000);
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = Some(secs);
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2ImgError> {
        let c = &self.config;
        if !(c.thumbnail_endpoint.starts_with("http://")
            || c.thumbnail_endpoint.starts_with("https://"))
        {
            return Err(Pdf2ImgError::InvalidConfig(format!(
                "thumbnail endpoint must be an HTTP(S) URL, got '{}'",
                c.thumbnail_endpoint
            )));
        }
        if c.fetch_timeout_secs == Some(0) {
            return Err(Pdf2ImgError::InvalidConfig(
                "fetch timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Image format of the uploaded file.
///
/// PNG is the default; JPEG is chosen only when explicitly asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Lossless PNG, `.png` extension. (default)
    #[default]
    Png,
    /// JPEG, `.jpg` extension.
    Jpeg,
}

impl OutputFormat {
    /// Resolve a caller-supplied format string.
    ///
    /// Only the exact literal `"JPEG"` selects JPEG. Anything else, including
    /// no value at all, `"jpeg"`, `"png"` or `"gif"`, falls back to PNG.
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            Some("JPEG") => OutputFormat::Jpeg,
            _ => OutputFormat::Png,
        }
    }

    /// File extension including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => ".png",
            OutputFormat::Jpeg => ".jpg",
        }
    }

    /// MIME type stored on the uploaded file.
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Png => f.write_str("PNG"),
            OutputFormat::Jpeg => f.write_str("JPEG"),
        }
    }
}
