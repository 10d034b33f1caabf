mod writer;

pub use writer::{write_epub, write_epub_to_writer};

/// Package document, generated by the writer.
pub const OPF_HREF: &str = "content.opf";
/// EPUB 2 table of contents, generated by the writer.
pub const NCX_HREF: &str = "toc.ncx";
/// EPUB 3 navigation document, generated by the writer from [`crate::Book::toc`].
pub const NAV_HREF: &str = "nav.xhtml";
