//! Encode stage: preview bytes → PNG or JPEG, plus the output file name.
//!
//! Drive serves thumbnails in whatever raster format it picks (usually PNG,
//! sometimes JPEG) regardless of what we ask for. Decoding and re-encoding
//! with the `image` crate guarantees the uploaded bytes match the extension
//! we put on the name. JPEG has no alpha channel, so transparent pixels are
//! flattened by dropping alpha before encoding.

use crate::config::OutputFormat;
use crate::error::StepError;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Output name for a source file: first `.`-separated segment plus the
/// format's extension.
///
/// `"invoice.pdf"` → `"invoice.png"`; `"q1.report.pdf"` → `"q1.jpg"` for JPEG.
pub fn output_name(source_name: &str, format: OutputFormat) -> String {
    let stem = source_name.split('.').next().unwrap_or_default();
    format!("{stem}{}", format.extension())
}

/// Decode `bytes` and re-encode them in `format`.
pub fn encode_preview(
    bytes: &[u8],
    format: OutputFormat,
    jpeg_quality: u8,
) -> Result<Vec<u8>, StepError> {
    let failed = |detail: String| StepError::EncodeFailed {
        format: format.to_string(),
        detail,
    };

    let img = image::load_from_memory(bytes).map_err(|e| failed(format!("decode: {e}")))?;
    debug!("Decoded preview {}x{}", img.width(), img.height());

    let mut buf = Vec::new();
    match format {
        OutputFormat::Png => {
            img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
                .map_err(|e| failed(e.to_string()))?;
        }
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, jpeg_quality))
                .map_err(|e| failed(e.to_string()))?;
        }
    }

    debug!("Encoded {} → {} bytes", format, buf.len());
    Ok(buf)
}
