//! PDF reading.
//!
//! The conversion pipeline only needs three things from a PDF: the text of a
//! page, the raster images embedded in a page, and a rendering of a page. The
//! [`PageSource`] trait captures exactly that, so the pipeline can run against
//! MuPDF in production and against in-memory pages in tests.

#[cfg(feature = "pdf")]
mod images;
#[cfg(feature = "pdf")]
mod mupdf_source;

#[cfg(feature = "pdf")]
pub use images::{cmyk_to_rgb, encode_samples};
#[cfg(feature = "pdf")]
pub use mupdf_source::MuPdfSource;

use crate::error::Result;

/// Encoded image formats the converter emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

/// An embedded image, already encoded for the EPUB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub data: Vec<u8>,
    pub format: ImageFormat,
}

/// Read access to the pages of a document. Page numbers are 1-based.
pub trait PageSource {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Plain text of a page, lines separated by `\n`.
    fn page_text(&self, page: u32) -> Result<String>;

    /// Raster images embedded in a page, in document order.
    ///
    /// Images that cannot be decoded are left out.
    fn page_images(&self, page: u32) -> Result<Vec<PageImage>>;

    /// Render a whole page to PNG at the given zoom factor.
    fn render_page(&self, page: u32, zoom: f32) -> Result<Vec<u8>>;
}
