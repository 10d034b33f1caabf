//! Error types for reflow operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while converting a PDF into an EPUB.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[cfg(feature = "pdf")]
    #[error("MuPDF error: {0}")]
    MuPdf(#[from] mupdf::Error),

    #[cfg(feature = "pdf")]
    #[error("PDF object error: {0}")]
    Lopdf(#[from] lopdf::Error),

    #[cfg(feature = "pdf")]
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    #[error("Page {page} not found (document has {count} pages)")]
    PageNotFound { page: u32, count: u32 },

    #[error("Stylesheet not found: {}", .0.display())]
    MissingStylesheet(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;
