//! Image preparation: normalise an uploaded document into one encoded
//! raster image ready for the vision API.
//!
//! Uploaded raster images pass through byte-for-byte — re-encoding a
//! photo of an invoice only costs quality. PDFs are rendered via pdfium:
//! only the **first page**, at a 300-DPI-equivalent resolution. Invoices
//! are assumed single-page; silently truncating a multi-page PDF to page
//! one is a deliberate scope limitation, not a bug.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which uses thread-local
//! state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the CPU-heavy render onto the
//! blocking thread pool so the async workers keep serving.

use crate::config::ExtractionConfig;
use crate::error::DocumentError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use pdfium_render::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Declared media kind of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// A raster image (JPEG or PNG).
    Image,
    /// A PDF; only the first page is used.
    Pdf,
}

impl DocumentKind {
    /// Infer the kind from a file name: `.pdf` is a PDF, everything else
    /// is treated as a raster image (decode validation catches the rest).
    pub fn from_filename(name: &str) -> Self {
        if name.to_lowercase().ends_with(".pdf") {
            DocumentKind::Pdf
        } else {
            DocumentKind::Image
        }
    }
}

/// One uploaded invoice document. Ephemeral — exists only for the duration
/// of a single extraction call.
#[derive(Debug, Clone)]
pub struct InvoiceDocument {
    /// Display name, used in logs and per-file error messages.
    pub name: String,
    pub kind: DocumentKind,
    pub bytes: Vec<u8>,
}

impl InvoiceDocument {
    pub fn new(name: impl Into<String>, kind: DocumentKind, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            kind,
            bytes,
        }
    }

    /// Read a document from disk, inferring the kind from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let bytes = std::fs::read(path).map_err(|e| DocumentError::Decode {
            name: name.clone(),
            detail: e.to_string(),
        })?;
        Ok(Self {
            kind: DocumentKind::from_filename(&name),
            name,
            bytes,
        })
    }
}

/// A single encoded raster image, base64-text-safe for the request payload.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub base64: String,
    pub mime: &'static str,
}

impl PreparedImage {
    /// The `data:` URI embedded in the vision API request.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.base64)
    }
}

/// Produce exactly one encoded raster image for the document.
///
/// Images pass through unchanged; PDFs are rendered (first page only) to
/// JPEG. An unreadable or non-document file fails with
/// [`DocumentError::Decode`] scoped to this one document.
pub async fn prepare(
    doc: &InvoiceDocument,
    config: &ExtractionConfig,
) -> Result<PreparedImage, DocumentError> {
    match doc.kind {
        DocumentKind::Image => passthrough_image(doc),
        DocumentKind::Pdf => {
            let bytes = doc.bytes.clone();
            let name = doc.name.clone();
            let dpi = config.dpi;
            let max_pixels = config.max_rendered_pixels;
            let quality = config.jpeg_quality;

            let jpeg = tokio::task::spawn_blocking(move || {
                render_first_page_blocking(&name, &bytes, dpi, max_pixels, quality)
            })
            .await
            .map_err(|e| DocumentError::Decode {
                name: doc.name.clone(),
                detail: format!("render task panicked: {e}"),
            })??;

            let base64 = STANDARD.encode(&jpeg);
            debug!("'{}': rendered PDF page 1 → {} bytes base64", doc.name, base64.len());
            Ok(PreparedImage {
                base64,
                mime: "image/jpeg",
            })
        }
    }
}

/// Validate an uploaded raster image and wrap it unchanged.
fn passthrough_image(doc: &InvoiceDocument) -> Result<PreparedImage, DocumentError> {
    let format = image::guess_format(&doc.bytes).map_err(|e| DocumentError::Decode {
        name: doc.name.clone(),
        detail: e.to_string(),
    })?;

    let mime = match format {
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Png => "image/png",
        other => {
            return Err(DocumentError::Decode {
                name: doc.name.clone(),
                detail: format!("unsupported image format {other:?}; upload JPEG or PNG"),
            })
        }
    };

    // Full decode to catch truncated or corrupt files before the API call;
    // the original bytes are forwarded, not the decoded pixels.
    image::load_from_memory(&doc.bytes).map_err(|e| DocumentError::Decode {
        name: doc.name.clone(),
        detail: e.to_string(),
    })?;

    debug!("'{}': image passthrough ({})", doc.name, mime);
    Ok(PreparedImage {
        base64: STANDARD.encode(&doc.bytes),
        mime,
    })
}

/// Blocking implementation of first-page PDF rendering.
///
/// Target width is derived from the page's physical width at the
/// configured DPI, capped by `max_pixels` in either dimension.
fn render_first_page_blocking(
    name: &str,
    bytes: &[u8],
    dpi: u32,
    max_pixels: u32,
    quality: u8,
) -> Result<Vec<u8>, DocumentError> {
    let pdfium = Pdfium::default();

    let document =
        pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| DocumentError::Decode {
                name: name.to_string(),
                detail: format!("{e:?}"),
            })?;

    let pages = document.pages();
    if pages.len() == 0 {
        return Err(DocumentError::Decode {
            name: name.to_string(),
            detail: "PDF has no pages".to_string(),
        });
    }
    debug!("'{}': PDF loaded, {} pages, rendering page 1 only", name, pages.len());

    let page = pages.get(0).map_err(|e| DocumentError::Decode {
        name: name.to_string(),
        detail: format!("{e:?}"),
    })?;

    let width_px = (page.width().value / 72.0 * dpi as f32).round() as u32;
    let target_width = width_px.min(max_pixels);

    let render_config = PdfRenderConfig::new()
        .set_target_width(target_width as i32)
        .set_maximum_height(max_pixels as i32);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| DocumentError::Decode {
            name: name.to_string(),
            detail: format!("{e:?}"),
        })?;

    let image = bitmap.as_image();
    debug!("'{}': rendered {}x{} px", name, image.width(), image.height());

    encode_jpeg(&image, quality).map_err(|e| DocumentError::Decode {
        name: name.to_string(),
        detail: format!("JPEG encoding failed: {e}"),
    })
}

/// JPEG-encode a rendered page. pdfium hands back RGBA; JPEG has no alpha
/// channel, so flatten to RGB first.
fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let mut buf = Vec::new();
    let mut cursor = Cursor::new(&mut buf);
    let encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
    rgb.write_with_encoder(encoder)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn tiny_png() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([250, 250, 250])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .expect("encode");
        buf
    }

    #[test]
    fn kind_from_filename() {
        assert_eq!(DocumentKind::from_filename("szamla.pdf"), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_filename("SZAMLA.PDF"), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_filename("szamla.jpg"), DocumentKind::Image);
        assert_eq!(DocumentKind::from_filename("scan"), DocumentKind::Image);
    }

    #[tokio::test]
    async fn image_passes_through_unchanged() {
        let bytes = tiny_png();
        let doc = InvoiceDocument::new("s.png", DocumentKind::Image, bytes.clone());
        let prepared = prepare(&doc, &ExtractionConfig::default())
            .await
            .expect("PNG must prepare");
        assert_eq!(prepared.mime, "image/png");
        assert_eq!(
            STANDARD.decode(&prepared.base64).expect("valid base64"),
            bytes,
            "image bytes must be forwarded unchanged"
        );
        assert!(prepared.data_uri().starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn jpeg_is_recognised() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([10, 20, 30])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
            .expect("encode");
        let doc = InvoiceDocument::new("s.jpg", DocumentKind::Image, buf);
        let prepared = prepare(&doc, &ExtractionConfig::default()).await.unwrap();
        assert_eq!(prepared.mime, "image/jpeg");
    }

    #[tokio::test]
    async fn garbage_image_is_a_decode_error() {
        let doc = InvoiceDocument::new(
            "notes.txt",
            DocumentKind::Image,
            b"definitely not an image".to_vec(),
        );
        let err = prepare(&doc, &ExtractionConfig::default())
            .await
            .expect_err("must fail");
        assert!(matches!(err, DocumentError::Decode { .. }));
        assert!(err.to_string().contains("notes.txt"));
    }

    #[tokio::test]
    async fn truncated_png_is_a_decode_error() {
        let mut bytes = tiny_png();
        bytes.truncate(bytes.len() / 2);
        let doc = InvoiceDocument::new("cut.png", DocumentKind::Image, bytes);
        let err = prepare(&doc, &ExtractionConfig::default())
            .await
            .expect_err("truncated file must fail");
        assert!(matches!(err, DocumentError::Decode { .. }));
    }

    #[test]
    fn jpeg_quality_changes_output_size() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(64, 64, |x, y| {
            Rgb([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8])
        }));
        let low = encode_jpeg(&img, 10).expect("low quality encodes");
        let high = encode_jpeg(&img, 95).expect("high quality encodes");
        assert!(
            high.len() > low.len(),
            "higher quality must produce more bytes ({} vs {})",
            high.len(),
            low.len()
        );
    }

    #[test]
    fn jpeg_encoder_flattens_alpha() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            4,
            4,
            image::Rgba([255, 0, 0, 128]),
        ));
        let jpeg = encode_jpeg(&img, 85).expect("RGBA must encode after flattening");
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
    }
}
