//! Pipeline stages for PDF-to-image conversion.
//!
//! Each submodule implements exactly one step so it can be tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! locate ──▶ fetch ──▶ encode ──▶ upload
//! (scan)     (HTTP)    (image)    (Storage::create_file)
//! ```
//!
//! 1. [`locate`]: lazy folder scan, first PDF whose extension-less name
//!    equals the title
//! 2. [`fetch`]: one bearer-authenticated GET of the Drive thumbnail
//! 3. [`encode`]: decode the preview and re-encode as PNG or JPEG; derive
//!    the output name
//!
//! The upload is a single storage call and lives in [`crate::convert`].

pub mod encode;
pub mod fetch;
pub mod locate;
