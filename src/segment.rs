//! Chapter segmentation.
//!
//! Turns per-page content and the entries parsed from a TOC page into an
//! ordered list of chapters. Each TOC entry owns the pages from its starting
//! page up to the page before the next entry; pages before the first entry
//! become a synthesized preface. Without entries the whole document is one
//! chapter.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use log::{debug, warn};
use serde::Serialize;

use crate::config::TocConfig;
use crate::toc::TocEntry;

/// Markup for each extracted page, keyed by 1-based PDF page number.
pub type PageContents = BTreeMap<u32, String>;

/// Filename of the synthesized preface chapter.
pub const PREFACE_FILENAME: &str = "chapter_prefacio.xhtml";

/// How a chapter came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterKind {
    /// Pages before the first TOC entry
    Preface,
    /// One TOC entry
    Toc,
    /// Every content page, used when the TOC yields nothing
    Fallback,
}

/// A named run of pages rendered as one content document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chapter {
    pub title: String,
    pub filename: String,
    pub kind: ChapterKind,
    pub first_page: u32,
    /// Inclusive. Smaller than `first_page` when the range is empty, e.g. two
    /// TOC entries starting on the same page.
    pub last_page: u32,
    #[serde(skip)]
    pub content: String,
}

impl Chapter {
    pub fn pages(&self) -> RangeInclusive<u32> {
        self.first_page..=self.last_page
    }
}

/// Concatenate the content of pages `start..=end` in page order.
///
/// Pages missing from `contents` are skipped.
pub fn combine_pages(contents: &PageContents, start: u32, end: u32) -> String {
    if start > end {
        return String::new();
    }
    contents
        .range(start..=end)
        .map(|(_, content)| content.as_str())
        .collect()
}

/// Splits content pages into chapters.
#[derive(Debug, Clone)]
pub struct Segmenter {
    preface_title: String,
    fallback_title: String,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::from_config(&TocConfig::default())
    }
}

impl Segmenter {
    pub fn new(preface_title: impl Into<String>, fallback_title: impl Into<String>) -> Self {
        Self {
            preface_title: preface_title.into(),
            fallback_title: fallback_title.into(),
        }
    }

    pub fn from_config(config: &TocConfig) -> Self {
        Self::new(&config.preface_title, &config.fallback_title)
    }

    /// Build chapters covering `eligible` pages.
    ///
    /// `entries` may be in any order. Entries starting on `toc_page` are
    /// ignored, so the pages they would have started stay with the preceding
    /// chapter.
    pub fn segment(
        &self,
        contents: &PageContents,
        eligible: &[u32],
        entries: &[TocEntry],
        toc_page: Option<u32>,
    ) -> Vec<Chapter> {
        let (Some(&low), Some(&high)) = (eligible.iter().min(), eligible.iter().max()) else {
            warn!("No content pages to segment");
            return Vec::new();
        };

        let mut entries: Vec<&TocEntry> = entries
            .iter()
            .filter(|entry| {
                let on_toc_page = Some(entry.page) == toc_page;
                if on_toc_page {
                    debug!("Skipping TOC entry {:?} on the TOC page itself", entry.title);
                }
                !on_toc_page
            })
            .collect();
        entries.sort_by_key(|entry| entry.page);

        let Some(first) = entries.first() else {
            debug!("No usable TOC entries, emitting a single chapter for pages {low}-{high}");
            return vec![Chapter {
                title: self.fallback_title.clone(),
                filename: "chapter_1.xhtml".to_string(),
                kind: ChapterKind::Fallback,
                first_page: low,
                last_page: high,
                content: combine_pages(contents, low, high),
            }];
        };

        let mut chapters = Vec::with_capacity(entries.len() + 1);

        if low < first.page {
            let last_page = first.page - 1;
            chapters.push(Chapter {
                title: self.preface_title.clone(),
                filename: PREFACE_FILENAME.to_string(),
                kind: ChapterKind::Preface,
                first_page: low,
                last_page,
                content: combine_pages(contents, low, last_page),
            });
        }

        for (idx, entry) in entries.iter().enumerate() {
            let last_page = match entries.get(idx + 1) {
                Some(next) => next.page.saturating_sub(1),
                None => high,
            };
            chapters.push(Chapter {
                title: entry.title.clone(),
                filename: format!("chapter_{}.xhtml", idx + 1),
                kind: ChapterKind::Toc,
                first_page: entry.page,
                last_page,
                content: combine_pages(contents, entry.page, last_page),
            });
        }

        debug!("Segmented pages {low}-{high} into {} chapters", chapters.len());
        chapters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(pages: RangeInclusive<u32>) -> PageContents {
        pages.map(|p| (p, format!("[p{p}]"))).collect()
    }

    fn ranges(chapters: &[Chapter]) -> Vec<(&str, u32, u32)> {
        chapters
            .iter()
            .map(|c| (c.title.as_str(), c.first_page, c.last_page))
            .collect()
    }

    #[test]
    fn test_combine_pages_skips_missing() {
        let mut pages = contents(2..=5);
        pages.remove(&3);
        assert_eq!(combine_pages(&pages, 2, 5), "[p2][p4][p5]");
        assert_eq!(combine_pages(&pages, 6, 9), "");
        assert_eq!(combine_pages(&pages, 5, 4), "");
    }

    #[test]
    fn test_fallback_single_chapter() {
        let pages = contents(2..=12);
        let eligible: Vec<u32> = (2..=12).collect();
        let chapters = Segmenter::default().segment(&pages, &eligible, &[], None);

        assert_eq!(chapters.len(), 1);
        let chapter = &chapters[0];
        assert_eq!(chapter.title, "Contenido");
        assert_eq!(chapter.filename, "chapter_1.xhtml");
        assert_eq!(chapter.kind, ChapterKind::Fallback);
        assert_eq!(chapter.pages(), 2..=12);
        assert!(chapter.content.starts_with("[p2]"));
        assert!(chapter.content.ends_with("[p12]"));
    }

    #[test]
    fn test_preface_and_entries() {
        let pages = contents(2..=20);
        let eligible: Vec<u32> = (2..=20).collect();
        let entries = vec![TocEntry::new("B", 10), TocEntry::new("A", 3)];
        let chapters = Segmenter::default().segment(&pages, &eligible, &entries, Some(1));

        assert_eq!(
            ranges(&chapters),
            vec![("Prefacio", 2, 2), ("A", 3, 9), ("B", 10, 20)]
        );
        assert_eq!(chapters[0].filename, PREFACE_FILENAME);
        assert_eq!(chapters[0].kind, ChapterKind::Preface);
        assert_eq!(chapters[1].filename, "chapter_1.xhtml");
        assert_eq!(chapters[2].filename, "chapter_2.xhtml");
        assert_eq!(chapters[0].content, "[p2]");
        assert_eq!(chapters[1].content, "[p3][p4][p5][p6][p7][p8][p9]");
    }

    #[test]
    fn test_no_preface_when_first_entry_is_first_page() {
        let pages = contents(2..=8);
        let eligible: Vec<u32> = (2..=8).collect();
        let entries = vec![TocEntry::new("Uno", 2), TocEntry::new("Dos", 5)];
        let chapters = Segmenter::default().segment(&pages, &eligible, &entries, None);

        assert_eq!(ranges(&chapters), vec![("Uno", 2, 4), ("Dos", 5, 8)]);
    }

    #[test]
    fn test_entry_on_toc_page_is_skipped() {
        // TOC on page 4 lists itself; its pages fold into the preceding chapter.
        let mut pages = contents(2..=12);
        pages.remove(&4);
        let eligible: Vec<u32> = (2..=12).filter(|p| *p != 4).collect();
        let entries = vec![
            TocEntry::new("Indice", 4),
            TocEntry::new("Uno", 3),
            TocEntry::new("Dos", 9),
        ];
        let chapters = Segmenter::default().segment(&pages, &eligible, &entries, Some(4));

        assert_eq!(
            ranges(&chapters),
            vec![("Prefacio", 2, 2), ("Uno", 3, 8), ("Dos", 9, 12)]
        );
        assert!(chapters.iter().all(|c| c.title != "Indice"));
        assert_eq!(chapters[1].filename, "chapter_1.xhtml");
        assert_eq!(chapters[2].filename, "chapter_2.xhtml");
        assert_eq!(chapters[1].content, "[p3][p5][p6][p7][p8]");
    }

    #[test]
    fn test_only_entry_on_toc_page_falls_back() {
        let pages = contents(3..=6);
        let eligible: Vec<u32> = (3..=6).collect();
        let entries = vec![TocEntry::new("Indice", 2)];
        let chapters = Segmenter::default().segment(&pages, &eligible, &entries, Some(2));

        assert_eq!(ranges(&chapters), vec![("Contenido", 3, 6)]);
        assert_eq!(chapters[0].kind, ChapterKind::Fallback);
    }

    #[test]
    fn test_duplicate_start_pages_yield_empty_range() {
        let pages = contents(2..=6);
        let eligible: Vec<u32> = (2..=6).collect();
        let entries = vec![TocEntry::new("Primero", 3), TocEntry::new("Segundo", 3)];
        let chapters = Segmenter::default().segment(&pages, &eligible, &entries, None);

        assert_eq!(
            ranges(&chapters),
            vec![("Prefacio", 2, 2), ("Primero", 3, 2), ("Segundo", 3, 6)]
        );
        assert!(chapters[1].content.is_empty());
        assert_eq!(chapters[2].content, "[p3][p4][p5][p6]");
    }

    #[test]
    fn test_entry_beyond_last_page_is_empty() {
        let pages = contents(2..=5);
        let eligible: Vec<u32> = (2..=5).collect();
        let entries = vec![TocEntry::new("Uno", 2), TocEntry::new("Perdido", 40)];
        let chapters = Segmenter::default().segment(&pages, &eligible, &entries, None);

        assert_eq!(ranges(&chapters), vec![("Uno", 2, 39), ("Perdido", 40, 5)]);
        assert_eq!(chapters[0].content, "[p2][p3][p4][p5]");
        assert!(chapters[1].content.is_empty());
    }

    #[test]
    fn test_no_eligible_pages() {
        let chapters = Segmenter::default().segment(&PageContents::new(), &[], &[], None);
        assert!(chapters.is_empty());
    }

    #[test]
    fn test_custom_titles() {
        let segmenter = Segmenter::new("Preface", "Contents");
        let pages = contents(2..=4);
        let eligible: Vec<u32> = (2..=4).collect();

        let fallback = segmenter.segment(&pages, &eligible, &[], None);
        assert_eq!(fallback[0].title, "Contents");

        let with_toc = segmenter.segment(&pages, &eligible, &[TocEntry::new("One", 3)], None);
        assert_eq!(with_toc[0].title, "Preface");
    }

    #[test]
    fn test_entries_sorted_by_page_keeping_line_order() {
        let pages = contents(2..=12);
        let eligible: Vec<u32> = (2..=12).collect();
        let entries = vec![
            TocEntry::new("B", 10),
            TocEntry::new("A", 3),
            TocEntry::new("C", 10),
        ];
        let chapters = Segmenter::default().segment(&pages, &eligible, &entries, None);

        assert_eq!(
            ranges(&chapters),
            vec![("Prefacio", 2, 2), ("A", 3, 9), ("B", 10, 9), ("C", 10, 12)]
        );
    }

    #[test]
    fn test_deterministic() {
        let pages = contents(2..=30);
        let eligible: Vec<u32> = (2..=30).collect();
        let entries = vec![
            TocEntry::new("C", 20),
            TocEntry::new("A", 5),
            TocEntry::new("B", 12),
        ];
        let segmenter = Segmenter::default();
        let first = segmenter.segment(&pages, &eligible, &entries, Some(1));
        let second = segmenter.segment(&pages, &eligible, &entries, Some(1));
        assert_eq!(first, second);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_every_content_page_lands_in_one_chapter(
                total in 2u32..40,
                toc_raw in 0u32..45,
                starts in prop::collection::vec(1u32..50, 0..8),
            ) {
                let toc_page = (toc_raw != 0).then_some(toc_raw);
                let eligible: Vec<u32> = (2..=total).filter(|p| Some(*p) != toc_page).collect();
                let pages: PageContents = eligible.iter().map(|p| (*p, format!("[p{p}]"))).collect();
                let entries: Vec<TocEntry> = starts
                    .iter()
                    .enumerate()
                    .map(|(i, page)| TocEntry::new(format!("T{i}"), *page))
                    .collect();

                let chapters = Segmenter::default().segment(&pages, &eligible, &entries, toc_page);

                for page in &eligible {
                    let marker = format!("[p{page}]");
                    let owners = chapters.iter().filter(|c| c.content.contains(&marker)).count();
                    prop_assert_eq!(owners, 1, "page {} in {} chapters", page, owners);
                }
                if let Some(toc) = toc_page {
                    prop_assert!(chapters.iter().all(|c| c.kind != ChapterKind::Toc || c.first_page != toc));
                }
            }

            #[test]
            fn prop_without_entries_one_chapter_spans_content(total in 2u32..200) {
                let eligible: Vec<u32> = (2..=total).collect();
                let pages: PageContents = eligible.iter().map(|p| (*p, String::new())).collect();
                let chapters = Segmenter::default().segment(&pages, &eligible, &[], None);

                prop_assert_eq!(chapters.len(), 1);
                prop_assert_eq!(chapters[0].pages(), 2..=total);
            }
        }
    }
}
