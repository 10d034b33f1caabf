//! # reflow
//!
//! Converts PDF documents into reflowable EPUB 3 ebooks.
//!
//! ## Pipeline
//!
//! - Page 1 is rasterized and becomes the cover
//! - The text and embedded images of every other page are extracted
//! - An optional table-of-contents page is parsed into chapter titles and
//!   starting pages
//! - Pages are grouped into chapters, rendered as XHTML and packaged together
//!   with a stylesheet, `nav.xhtml` and `toc.ncx`
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use reflow::{Config, Converter};
//!
//! let converter = Converter::new(Config::default());
//! let plan = converter
//!     .convert(Path::new("input.pdf"), Path::new("output.epub"), Some(3))
//!     .unwrap();
//! println!("{} chapters", plan.chapters.len());
//! ```
//!
//! ## Without a PDF
//!
//! The pipeline runs against any [`PageSource`], and the pieces are usable
//! on their own:
//!
//! ```
//! use reflow::{Segmenter, TocParser, segment::PageContents};
//!
//! let entries = TocParser::default().parse("Contenido\nUno ..... 3\nDos - 5\n");
//! let pages: PageContents = (2..=6).map(|p| (p, format!("page {p}"))).collect();
//! let eligible: Vec<u32> = pages.keys().copied().collect();
//!
//! let chapters = Segmenter::default().segment(&pages, &eligible, &entries, None);
//! assert_eq!(chapters.len(), 3); // preface, Uno, Dos
//! ```

pub mod book;
pub mod config;
pub mod convert;
pub mod epub;
pub mod error;
pub mod extract;
pub mod pdf;
pub mod render;
pub mod segment;
pub mod toc;
pub(crate) mod util;

pub use book::{Book, Metadata, Resource, SpineItem, TocEntry};
pub use config::Config;
pub use convert::{Conversion, Converter, Plan};
pub use epub::{write_epub, write_epub_to_writer};
pub use error::{Error, Result};
pub use extract::{Extraction, ImageRecord, PageExtractor};
pub use pdf::{ImageFormat, PageImage, PageSource};
#[cfg(feature = "pdf")]
pub use pdf::MuPdfSource;
pub use render::ChapterRenderer;
pub use segment::{Chapter, ChapterKind, Segmenter};
pub use toc::TocParser;
