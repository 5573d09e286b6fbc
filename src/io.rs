// ============================================================================
// IMAGE LOADING AND EXPORT ENCODING
// ============================================================================
//
// Loading fails fast: a corrupt or unreadable source surfaces a load error
// and no editor session is created. Export flattens the session's composite
// and encodes it to a web-standard raster format; the editor itself never
// touches the network — the encoded bytes (and their data-URL form) are
// handed to the host application's upload collaborator.

use std::io::Cursor;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::EditorError;

/// Export encodings accepted by the upload endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Png,
    Jpeg,
    Webp,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Webp => "webp",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::Webp => "image/webp",
        }
    }

    /// Parse from a format name or file extension (case-insensitive).
    pub fn from_ext(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(ExportFormat::Png),
            "jpg" | "jpeg" => Some(ExportFormat::Jpeg),
            "webp" => Some(ExportFormat::Webp),
            _ => None,
        }
    }
}

/// One finished export, ready to hand to the upload collaborator.
#[derive(Debug, Clone)]
pub struct ExportResult {
    /// Encoded file contents.
    pub bytes: Vec<u8>,
    pub format: ExportFormat,
    /// Position of the edited image in the batch it came from.
    pub original_index: usize,
}

impl ExportResult {
    /// Data-URL form of the encoded file, for immediate display by the host.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime(),
            BASE64.encode(&self.bytes)
        )
    }
}

/// Decode an image file into an RGBA buffer. Fails fast on unreadable or
/// corrupt sources.
pub fn load_path(path: &Path) -> Result<RgbaImage, EditorError> {
    let img = image::open(path).map_err(|e| EditorError::Load {
        path: Some(path.to_path_buf()),
        reason: e.to_string(),
    })?;
    Ok(img.into_rgba8())
}

/// Decode an in-memory blob into an RGBA buffer.
pub fn load_bytes(bytes: &[u8]) -> Result<RgbaImage, EditorError> {
    let img = image::load_from_memory(bytes).map_err(|e| EditorError::Load {
        path: None,
        reason: e.to_string(),
    })?;
    Ok(img.into_rgba8())
}

/// Encode a flattened raster to `format`. `quality` (1–100) applies to JPEG
/// only; PNG and WebP are lossless here.
pub fn encode(image: &RgbaImage, format: ExportFormat, quality: u8) -> Result<Vec<u8>, EditorError> {
    let mut writer = Cursor::new(Vec::new());

    match format {
        ExportFormat::Png => {
            let encoder = PngEncoder::new(&mut writer);
            #[allow(deprecated)]
            encoder
                .encode(
                    image.as_raw(),
                    image.width(),
                    image.height(),
                    image::ColorType::Rgba8,
                )
                .map_err(|e| EditorError::Encode(e.to_string()))?;
        }
        ExportFormat::Jpeg => {
            // JPEG has no alpha channel.
            let rgb_image = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
            encoder
                .encode(
                    rgb_image.as_raw(),
                    rgb_image.width(),
                    rgb_image.height(),
                    image::ColorType::Rgb8,
                )
                .map_err(|e| EditorError::Encode(e.to_string()))?;
        }
        ExportFormat::Webp => {
            DynamicImage::ImageRgba8(image.clone())
                .write_to(&mut writer, image::ImageOutputFormat::WebP)
                .map_err(|e| EditorError::Encode(e.to_string()))?;
        }
    }

    Ok(writer.into_inner())
}

/// Flatten-and-encode convenience wrapper producing an [`ExportResult`].
pub fn export(
    image: &RgbaImage,
    format: ExportFormat,
    quality: u8,
    original_index: usize,
) -> Result<ExportResult, EditorError> {
    let bytes = encode(image, format, quality)?;
    Ok(ExportResult {
        bytes,
        format,
        original_index,
    })
}
