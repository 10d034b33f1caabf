//! Page extraction: turns PDF pages into chapter-ready markup.

use log::debug;

use crate::config::PageConfig;
use crate::error::Result;
use crate::pdf::PageSource;
use crate::segment::PageContents;
use crate::util::escape_xml;

/// Directory inside the package holding extracted images.
pub const IMAGE_DIR: &str = "images";

/// An image pulled out of a page, ready to be packaged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    /// Package-relative path, e.g. `images/img_1.png`
    pub filename: String,
    pub data: Vec<u8>,
    pub media_type: String,
}

/// Everything extracted from the content pages of a document.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub pages: PageContents,
    pub images: Vec<ImageRecord>,
}

/// Content pages of a `total_pages` document: every page but the cover and the TOC page.
pub fn content_pages(total_pages: u32, toc_page: Option<u32>) -> Vec<u32> {
    (2..=total_pages)
        .filter(|page| Some(*page) != toc_page)
        .collect()
}

/// Convert page text to markup: escaped, with `<br/>` for each line break.
pub fn text_to_markup(text: &str) -> String {
    escape_xml(text).replace('\n', "<br/>")
}

/// Builds per-page markup from a [`PageSource`].
#[derive(Debug, Clone)]
pub struct PageExtractor {
    config: PageConfig,
}

impl Default for PageExtractor {
    fn default() -> Self {
        Self::new(PageConfig::default())
    }
}

impl PageExtractor {
    pub fn new(config: PageConfig) -> Self {
        Self { config }
    }

    /// Extract `pages` in ascending order.
    ///
    /// Images are numbered across the whole document, starting at 1, in the
    /// order they are encountered.
    pub fn extract<S: PageSource + ?Sized>(&self, source: &S, pages: &[u32]) -> Result<Extraction> {
        let mut pages = pages.to_vec();
        pages.sort_unstable();
        pages.dedup();

        let mut extraction = Extraction::default();
        for page in pages {
            let text = source.page_text(page)?;
            let mut markup = text_to_markup(&text);

            if self.config.page_markers {
                markup.push_str(&format!(
                    "<br/><span class='page-ref'>[{} {page}]</span>",
                    escape_xml(&self.config.page_label)
                ));
            }

            let images = source.page_images(page)?;
            debug!("Page {page}: {} chars, {} images", text.len(), images.len());
            for image in images {
                let n = extraction.images.len() + 1;
                let filename = format!("{IMAGE_DIR}/img_{n}.{}", image.format.extension());
                markup.push_str(&format!(
                    "<div><img src='{filename}' alt='Image {n}' /></div>"
                ));
                extraction.images.push(ImageRecord {
                    filename,
                    data: image.data,
                    media_type: image.format.media_type().to_string(),
                });
            }

            extraction.pages.insert(page, markup);
        }

        Ok(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::pdf::{ImageFormat, PageImage};

    struct Pages(Vec<(&'static str, usize)>);

    impl PageSource for Pages {
        fn page_count(&self) -> u32 {
            self.0.len() as u32
        }

        fn page_text(&self, page: u32) -> Result<String> {
            self.0
                .get(page as usize - 1)
                .map(|(text, _)| text.to_string())
                .ok_or(Error::PageNotFound {
                    page,
                    count: self.page_count(),
                })
        }

        fn page_images(&self, page: u32) -> Result<Vec<PageImage>> {
            let count = self.0[page as usize - 1].1;
            Ok((0..count)
                .map(|i| PageImage {
                    data: vec![page as u8, i as u8],
                    format: if i % 2 == 0 { ImageFormat::Png } else { ImageFormat::Jpeg },
                })
                .collect())
        }

        fn render_page(&self, _page: u32, _zoom: f32) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_content_pages() {
        assert_eq!(content_pages(5, None), vec![2, 3, 4, 5]);
        assert_eq!(content_pages(5, Some(3)), vec![2, 4, 5]);
        assert_eq!(content_pages(5, Some(9)), vec![2, 3, 4, 5]);
        assert!(content_pages(1, None).is_empty());
        assert!(content_pages(0, None).is_empty());
    }

    #[test]
    fn test_text_to_markup() {
        assert_eq!(text_to_markup("uno\ndos\n"), "uno<br/>dos<br/>");
        assert_eq!(text_to_markup("a < b & c"), "a &lt; b &amp; c");
        assert_eq!(text_to_markup("a\u{3}b\u{0}c\n"), "abc<br/>");
    }

    #[test]
    fn test_page_marker_and_images() {
        let source = Pages(vec![("cover", 0), ("Hola\nmundo", 2), ("Adios", 1)]);
        let extraction = PageExtractor::default().extract(&source, &[3, 2]).unwrap();

        assert_eq!(
            extraction.pages[&2],
            "Hola<br/>mundo<br/><span class='page-ref'>[Página 2]</span>\
             <div><img src='images/img_1.png' alt='Image 1' /></div>\
             <div><img src='images/img_2.jpg' alt='Image 2' /></div>"
        );
        assert_eq!(
            extraction.pages[&3],
            "Adios<br/><span class='page-ref'>[Página 3]</span>\
             <div><img src='images/img_3.png' alt='Image 3' /></div>"
        );

        let names: Vec<_> = extraction.images.iter().map(|i| i.filename.as_str()).collect();
        assert_eq!(names, vec!["images/img_1.png", "images/img_2.jpg", "images/img_3.png"]);
        assert_eq!(extraction.images[1].media_type, "image/jpeg");
        assert_eq!(extraction.images[2].data, vec![3, 0]);
    }

    #[test]
    fn test_page_markers_disabled() {
        let source = Pages(vec![("cover", 0), ("Texto", 0)]);
        let extractor = PageExtractor::new(PageConfig {
            page_markers: false,
            ..Default::default()
        });
        let extraction = extractor.extract(&source, &[2]).unwrap();
        assert_eq!(extraction.pages[&2], "Texto");
    }

    #[test]
    fn test_missing_page_is_an_error() {
        let source = Pages(vec![("cover", 0)]);
        assert!(PageExtractor::default().extract(&source, &[2]).is_err());
    }
}
