//! Small string helpers shared by the extractor, renderer and EPUB writer.

use chrono::Utc;

/// `dcterms:modified` requires UTC with second precision.
const MODIFIED_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Escape XML special characters and drop characters XML 1.0 forbids.
///
/// Used for every piece of text that originates outside the crate (PDF text,
/// TOC titles, metadata) before it is embedded in XHTML or package documents.
pub fn escape_xml(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\t' | '\n' | '\r' => result.push(c),
            '\u{0}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}' => {}
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}

/// Turn a package-relative href into a manifest id.
///
/// Manifest ids are XML names, so they may not start with a digit.
pub fn href_to_id(href: &str) -> String {
    let id = href.replace(['/', '.', ' ', '-'], "_");
    if id.starts_with(|c: char| c.is_ascii_digit()) {
        format!("r_{id}")
    } else {
        id
    }
}

/// Current time as an EPUB `dcterms:modified` value.
pub fn now_iso8601() -> String {
    Utc::now().format(MODIFIED_FORMAT).to_string()
}
