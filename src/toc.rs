//! Table-of-contents page parsing.
//!
//! A TOC page is plain text where each entry ends with the page the entry
//! starts on:
//!
//! ```text
//! Contenido
//! Introduccion ........ 3
//! Capitulo Uno - 10
//! ```
//!
//! Parsing is a pure function of the page text so it can be tested without a
//! PDF. Lines that do not look like entries are dropped.

use std::sync::LazyLock;

use log::trace;
use regex::Regex;
use serde::Serialize;

/// Word that marks the heading line of a TOC page.
pub const DEFAULT_HEADING: &str = "Contenido";

/// A title and the PDF page it starts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub title: String,
    pub page: u32,
}

impl TocEntry {
    pub fn new(title: impl Into<String>, page: u32) -> Self {
        Self {
            title: title.into(),
            page,
        }
    }
}

/// Separator styles between an entry's title and its page number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    /// A run of periods with optional surrounding whitespace: `Title ..... 12`
    DotLeader,
    /// A hyphen with whitespace on both sides: `Title - 12`
    Hyphen,
}

static DOT_LEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)\s*\.+\s*([0-9]+)$").expect("valid regex"));

static HYPHEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)\s+-\s+([0-9]+)$").expect("valid regex"));

/// A line split at a separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitLine<'a> {
    pub separator: Separator,
    /// Untrimmed text before the separator
    pub title: &'a str,
    pub number: &'a str,
}

impl Separator {
    /// All styles, in precedence order for equally short titles.
    pub const ALL: [Separator; 2] = [Separator::DotLeader, Separator::Hyphen];

    fn pattern(self) -> &'static Regex {
        match self {
            Separator::DotLeader => &DOT_LEADER,
            Separator::Hyphen => &HYPHEN,
        }
    }

    /// Split `line` at the earliest position where this separator is followed
    /// by a trailing page number.
    pub fn split(self, line: &str) -> Option<SplitLine<'_>> {
        let caps = self.pattern().captures(line)?;
        Some(SplitLine {
            separator: self,
            title: caps.get(1)?.as_str(),
            number: caps.get(2)?.as_str(),
        })
    }
}

/// Split a line with whichever separator yields the shortest title.
///
/// Ties go to the earlier style in [`Separator::ALL`].
pub fn split_line(line: &str) -> Option<SplitLine<'_>> {
    Separator::ALL
        .iter()
        .filter_map(|sep| sep.split(line))
        .min_by_key(|split| split.title.len())
}

/// Parser for the text of a TOC page.
#[derive(Debug, Clone)]
pub struct TocParser {
    heading: String,
}

impl Default for TocParser {
    fn default() -> Self {
        Self::new(DEFAULT_HEADING)
    }
}

impl TocParser {
    /// Create a parser that skips lines containing `heading` (any case).
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into().to_lowercase(),
        }
    }

    /// Extract entries from the page text, in line order.
    pub fn parse(&self, text: &str) -> Vec<TocEntry> {
        text.lines().filter_map(|line| self.parse_line(line)).collect()
    }

    /// Parse a single line; `None` for blank, heading and non-matching lines.
    pub fn parse_line(&self, line: &str) -> Option<TocEntry> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        if !self.heading.is_empty() && line.to_lowercase().contains(&self.heading) {
            trace!("Skipping TOC heading line: {line:?}");
            return None;
        }

        let Some(split) = split_line(line) else {
            trace!("Dropping TOC line without page number: {line:?}");
            return None;
        };

        match split.number.parse::<u32>() {
            Ok(page) if page > 0 => Some(TocEntry::new(split.title.trim(), page)),
            _ => {
                trace!("Dropping TOC line with unusable page number: {line:?}");
                None
            }
        }
    }
}
