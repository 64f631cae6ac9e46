//! Error types for the drive-pdf2img library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2ImgError`]: **Fatal**. The conversion cannot even start (the
//!   folder id is wrong or inaccessible, the configuration is invalid).
//!   Returned as `Err(Pdf2ImgError)` from the `Converter::convert*` methods.
//!
//! * [`StepError`]: **Non-fatal**. One pipeline stage failed after the
//!   folder was opened (listing hiccup, thumbnail fetch, re-encoding,
//!   upload). The converter logs it and reports an absent result, so a
//!   failed call never leaves a half-created file behind.
//!
//! Collaborator traits raise their own narrower types: [`StorageError`] from
//! [`crate::storage::Storage`] and [`AuthError`] from
//! [`crate::auth::TokenProvider`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the drive-pdf2img library.
///
/// Stage-level failures use [`StepError`] and are reported through
/// [`crate::output::ConversionOutcome::Failed`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Pdf2ImgError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The folder id does not resolve to an accessible folder.
    #[error("Folder '{folder_id}' is unavailable: {source}\nCheck the id and that the token can read it.")]
    FolderUnavailable {
        folder_id: String,
        #[source]
        source: StorageError,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not write the local copy of the converted image.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal failure in one stage of a single conversion.
///
/// The display text always carries the underlying cause so the
/// `Error converting the file: …` log line is self-explanatory.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum StepError {
    /// Enumerating the folder failed part-way through.
    #[error("listing folder '{folder_id}' failed: {detail}")]
    ListingFailed { folder_id: String, detail: String },

    /// The matched file could not be re-read by id.
    #[error("looking up file '{file_id}' failed: {detail}")]
    LookupFailed { file_id: String, detail: String },

    /// No bearer token could be obtained for the thumbnail request.
    #[error("could not obtain an access token: {detail}")]
    AuthFailed { detail: String },

    /// Transport error or non-success status while fetching the thumbnail.
    #[error("fetching preview '{url}' failed: {reason}")]
    FetchFailed { url: String, reason: String },

    /// The fetched bytes could not be decoded or re-encoded.
    #[error("encoding preview as {format} failed: {detail}")]
    EncodeFailed { format: String, detail: String },

    /// Storage rejected the new file.
    #[error("uploading '{name}' failed: {detail}")]
    UploadFailed { name: String, detail: String },
}

/// Errors raised by [`crate::storage::Storage`] implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// No file or folder exists with this id.
    #[error("'{id}' was not found")]
    NotFound { id: String },

    /// The id exists but is not a folder.
    #[error("'{id}' is not a folder (mime type {mime_type})")]
    NotAFolder { id: String, mime_type: String },

    /// The credentials cannot read or write this resource.
    #[error("permission denied on '{id}'")]
    PermissionDenied { id: String },

    /// The storage API answered with an unexpected status.
    #[error("storage API returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The request never produced a response.
    #[error("storage transport error: {0}")]
    Transport(String),

    /// The response body did not have the expected shape.
    #[error("malformed storage response: {0}")]
    Malformed(String),

    /// A token could not be obtained for the request.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Errors raised while acquiring a bearer token.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The environment variable holding the token is unset or empty.
    #[error("environment variable {var} is not set\nExport an OAuth access token, e.g. `export {var}=$(gcloud auth print-access-token)`.")]
    MissingEnv { var: String },

    /// The token helper command could not be run or exited unsuccessfully.
    #[error("token command `{command}` failed: {detail}")]
    CommandFailed { command: String, detail: String },

    /// The provider produced an empty token.
    #[error("token provider returned an empty token")]
    EmptyToken,
}
