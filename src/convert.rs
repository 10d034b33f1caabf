//! The conversion pipeline: extract, parse the TOC page, segment, render, package.

use std::fs;
#[cfg(feature = "pdf")]
use std::path::Path;

use log::{debug, info, warn};
use serde::Serialize;

use crate::book::{Book, Metadata, TocEntry as NavEntry};
use crate::config::{Config, DEFAULT_STYLESHEET};
use crate::epub::NAV_HREF;
use crate::error::{Error, Result};
use crate::extract::{ImageRecord, PageExtractor, content_pages};
use crate::pdf::PageSource;
use crate::render::ChapterRenderer;
use crate::segment::{Chapter, Segmenter};
use crate::toc::{TocEntry, TocParser};

pub const COVER_IMAGE_HREF: &str = "cover.png";
pub const COVER_PAGE_HREF: &str = "cover.xhtml";

/// What a document turns into, before packaging.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub total_pages: u32,
    pub toc_page: Option<u32>,
    /// Entries as parsed from the TOC page, in line order
    pub toc_entries: Vec<TocEntry>,
    pub chapters: Vec<Chapter>,
    #[serde(skip)]
    pub images: Vec<ImageRecord>,
}

/// A fully assembled book and the plan it was built from.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub book: Book,
    pub plan: Plan,
}

/// Runs the PDF to EPUB pipeline with a given configuration.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    config: Config,
}

impl Converter {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Extract content pages and split them into chapters.
    ///
    /// `toc_page` is only parsed when it is a content page (2 or later, within
    /// the document); otherwise every content page goes into one chapter.
    pub fn plan<S: PageSource + ?Sized>(&self, source: &S, toc_page: Option<u32>) -> Result<Plan> {
        let total_pages = source.page_count();
        let eligible = content_pages(total_pages, toc_page);

        let extraction = PageExtractor::new(self.config.pages.clone()).extract(source, &eligible)?;
        info!(
            "Extracted {} content pages and {} images",
            extraction.pages.len(),
            extraction.images.len()
        );

        let toc_entries = match toc_page {
            Some(page) if (2..=total_pages).contains(&page) => {
                let text = source.page_text(page)?;
                let entries = TocParser::new(&self.config.toc.heading).parse(&text);
                info!("Found {} TOC entries on page {page}", entries.len());
                entries
            }
            Some(page) => {
                warn!("TOC page {page} is not a content page of this {total_pages}-page document; ignoring it");
                Vec::new()
            }
            None => Vec::new(),
        };

        let chapters = Segmenter::from_config(&self.config.toc).segment(
            &extraction.pages,
            &eligible,
            &toc_entries,
            toc_page,
        );
        for chapter in &chapters {
            debug!(
                "{} -> {:?} (pages {}-{})",
                chapter.filename, chapter.title, chapter.first_page, chapter.last_page
            );
        }

        Ok(Plan {
            total_pages,
            toc_page,
            toc_entries,
            chapters,
            images: extraction.images,
        })
    }

    /// Read the document and assemble the complete book in memory.
    pub fn build_book<S: PageSource + ?Sized>(
        &self,
        source: &S,
        title: &str,
        stylesheet: &str,
        toc_page: Option<u32>,
    ) -> Result<Conversion> {
        if source.page_count() == 0 {
            return Err(Error::InvalidPdf("document has no pages".to_string()));
        }

        let cover = source.render_page(1, self.config.cover_zoom)?;
        let plan = self.plan(source, toc_page)?;
        let book = self.assemble(&plan, title, cover, stylesheet);
        Ok(Conversion { book, plan })
    }

    /// Package a plan: cover, images, stylesheet, chapters, navigation.
    pub fn assemble(&self, plan: &Plan, title: &str, cover_png: Vec<u8>, stylesheet: &str) -> Book {
        let meta = &self.config.metadata;
        let renderer = ChapterRenderer::new(&meta.language);

        let mut book = Book::new();
        book.metadata = meta.authors.iter().fold(
            Metadata::new(title)
                .with_language(&meta.language)
                .with_identifier(&meta.identifier),
            |metadata, author| metadata.with_author(author),
        );

        book.set_cover(COVER_IMAGE_HREF, cover_png, "image/png");
        book.add_resource(
            COVER_PAGE_HREF,
            renderer.render_cover(COVER_IMAGE_HREF).into_bytes(),
            "application/xhtml+xml",
        );
        book.add_auxiliary_spine_item(COVER_PAGE_HREF);

        for image in &plan.images {
            book.add_resource(&image.filename, image.data.clone(), &image.media_type);
        }

        book.add_resource(DEFAULT_STYLESHEET, stylesheet.as_bytes().to_vec(), "text/css");

        book.add_spine_item(NAV_HREF);
        for chapter in &plan.chapters {
            book.add_resource(
                &chapter.filename,
                renderer.render(&chapter.title, &chapter.content).into_bytes(),
                "application/xhtml+xml",
            );
            book.add_spine_item(&chapter.filename);
            book.toc.push(NavEntry::new(&chapter.title, &chapter.filename));
        }

        book
    }

    /// Read the stylesheet from the first existing candidate path.
    pub fn load_stylesheet(&self) -> Result<String> {
        let candidates = self.config.stylesheet_candidates();
        for path in &candidates {
            if path.is_file() {
                debug!("Using stylesheet {}", path.display());
                return Ok(fs::read_to_string(path)?);
            }
        }
        let missing = candidates.into_iter().next_back().unwrap_or_default();
        Err(Error::MissingStylesheet(missing))
    }

    /// Convert `input` into an EPUB at `output`.
    ///
    /// The PDF is closed before the EPUB is written, and nothing is written
    /// unless the whole book was assembled.
    #[cfg(feature = "pdf")]
    pub fn convert(&self, input: &Path, output: &Path, toc_page: Option<u32>) -> Result<Plan> {
        use crate::epub::write_epub;
        use crate::pdf::MuPdfSource;

        let stylesheet = self.load_stylesheet()?;
        let title = self.config.title_for(input);

        let conversion = {
            let source = MuPdfSource::open(input)?;
            self.build_book(&source, &title, &stylesheet, toc_page)?
        };

        write_epub(&conversion.book, output)?;
        info!(
            "Wrote {} ({} chapters)",
            output.display(),
            conversion.plan.chapters.len()
        );
        Ok(conversion.plan)
    }
}
