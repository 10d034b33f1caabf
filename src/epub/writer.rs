use std::borrow::Cow;
use std::io::{Seek, Write};
use std::path::Path;

use log::debug;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::{NAV_HREF, NCX_HREF, OPF_HREF};
use crate::book::{Book, TocEntry};
use crate::error::Result;
use crate::util::{escape_xml, href_to_id, now_iso8601};

/// Write a [`Book`] to an EPUB file on disk.
///
/// Creates an EPUB 3 file with an OPF package document, a navigation document,
/// an NCX table of contents for EPUB 2 readers, and all resources.
///
/// # Example
///
/// ```no_run
/// use reflow::{Book, Metadata, write_epub};
///
/// let mut book = Book::new();
/// book.metadata = Metadata::new("My Book").with_author("Me").with_language("es");
/// write_epub(&book, "output.epub")?;
/// # Ok::<(), reflow::Error>(())
/// ```
pub fn write_epub<P: AsRef<Path>>(book: &Book, path: P) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_epub_to_writer(book, file)
}

/// Write a [`Book`] to any [`Write`] + [`Seek`] destination.
pub fn write_epub_to_writer<W: Write + Seek>(book: &Book, writer: W) -> Result<()> {
    let mut zip = ZipWriter::new(writer);

    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    // 1. Write mimetype (must be first, uncompressed)
    zip.start_file("mimetype", stored)?;
    zip.write_all(b"application/epub+zip")?;

    // 2. Write META-INF/container.xml
    zip.start_file("META-INF/container.xml", deflated)?;
    zip.write_all(CONTAINER_XML.as_bytes())?;

    // 3. Write content.opf
    let modified = book.metadata.modified.clone().unwrap_or_else(now_iso8601);
    zip.start_file(format!("OEBPS/{OPF_HREF}"), deflated)?;
    zip.write_all(generate_opf(book, &modified).as_bytes())?;

    // 4. Write navigation documents
    let entries = nav_entries(book);
    zip.start_file(format!("OEBPS/{NCX_HREF}"), deflated)?;
    zip.write_all(generate_ncx(book, &entries).as_bytes())?;
    zip.start_file(format!("OEBPS/{NAV_HREF}"), deflated)?;
    zip.write_all(generate_nav(book, &entries).as_bytes())?;

    // 5. Write all resources (skip generated files)
    for resource in &book.resources {
        if is_generated(&resource.href) {
            continue;
        }
        zip.start_file(format!("OEBPS/{}", resource.href), deflated)?;
        zip.write_all(&resource.data)?;
    }

    zip.finish()?;
    debug!(
        "Wrote EPUB with {} resources and {} spine items",
        book.resources.len(),
        book.spine.len()
    );
    Ok(())
}

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

fn is_generated(href: &str) -> bool {
    href == OPF_HREF || href == NCX_HREF || href == NAV_HREF
}

/// Navigation entries, never empty: a book without chapters links to its nav document.
fn nav_entries(book: &Book) -> Cow<'_, [TocEntry]> {
    if book.toc.is_empty() {
        Cow::Owned(vec![TocEntry::new(book.metadata.title.clone(), NAV_HREF)])
    } else {
        Cow::Borrowed(&book.toc)
    }
}

fn language(book: &Book) -> &str {
    if book.metadata.language.is_empty() {
        "en"
    } else {
        &book.metadata.language
    }
}

fn generate_opf(book: &Book, modified: &str) -> String {
    let mut opf = String::new();

    opf.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
"#,
    );

    opf.push_str(&format!(
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
        escape_xml(&book.metadata.identifier)
    ));
    opf.push_str(&format!(
        "    <dc:title>{}</dc:title>\n",
        escape_xml(&book.metadata.title)
    ));
    opf.push_str(&format!(
        "    <dc:language>{}</dc:language>\n",
        escape_xml(language(book))
    ));
    for author in &book.metadata.authors {
        opf.push_str(&format!(
            "    <dc:creator>{}</dc:creator>\n",
            escape_xml(author)
        ));
    }
    opf.push_str(&format!(
        "    <meta property=\"dcterms:modified\">{}</meta>\n",
        escape_xml(modified)
    ));

    // EPUB 2 readers find the cover through this meta
    if let Some(cover) = &book.metadata.cover_image {
        opf.push_str(&format!(
            "    <meta name=\"cover\" content=\"{}\"/>\n",
            href_to_id(cover)
        ));
    }

    opf.push_str("  </metadata>\n  <manifest>\n");

    opf.push_str(&format!(
        "    <item id=\"ncx\" href=\"{NCX_HREF}\" media-type=\"application/x-dtbncx+xml\"/>\n"
    ));
    opf.push_str(&format!(
        "    <item id=\"{}\" href=\"{NAV_HREF}\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
        href_to_id(NAV_HREF)
    ));

    for resource in &book.resources {
        if is_generated(&resource.href) {
            continue;
        }
        let properties = resource
            .properties
            .as_ref()
            .map(|p| format!(" properties=\"{}\"", escape_xml(p)))
            .unwrap_or_default();
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"{}/>\n",
            href_to_id(&resource.href),
            escape_xml(&resource.href),
            escape_xml(&resource.media_type),
            properties
        ));
    }

    opf.push_str("  </manifest>\n  <spine toc=\"ncx\">\n");

    for item in &book.spine {
        let linear = if item.linear { "" } else { " linear=\"no\"" };
        opf.push_str(&format!(
            "    <itemref idref=\"{}\"{}/>\n",
            href_to_id(&item.href),
            linear
        ));
    }

    opf.push_str("  </spine>\n</package>\n");
    opf
}

fn generate_ncx(book: &Book, entries: &[TocEntry]) -> String {
    let mut ncx = String::new();

    ncx.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd">
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content=""#,
    );
    ncx.push_str(&escape_xml(&book.metadata.identifier));
    ncx.push_str(
        r#""/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle>
    <text>"#,
    );
    ncx.push_str(&escape_xml(&book.metadata.title));
    ncx.push_str(
        r#"</text>
  </docTitle>
  <navMap>
"#,
    );

    for (i, entry) in entries.iter().enumerate() {
        let play_order = i + 1;
        ncx.push_str(&format!(
            "    <navPoint id=\"navPoint-{play_order}\" playOrder=\"{play_order}\">\n"
        ));
        ncx.push_str(&format!(
            "      <navLabel><text>{}</text></navLabel>\n",
            escape_xml(&entry.title)
        ));
        ncx.push_str(&format!(
            "      <content src=\"{}\"/>\n",
            escape_xml(&entry.href)
        ));
        ncx.push_str("    </navPoint>\n");
    }

    ncx.push_str("  </navMap>\n</ncx>\n");
    ncx
}

fn generate_nav(book: &Book, entries: &[TocEntry]) -> String {
    let lang = escape_xml(language(book));
    let title = escape_xml(&book.metadata.title);

    let mut nav = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" xml:lang="{lang}" lang="{lang}">
  <head>
    <title>{title}</title>
  </head>
  <body>
    <nav epub:type="toc" id="toc">
      <h1>{title}</h1>
      <ol>
"#
    );

    for entry in entries {
        nav.push_str(&format!(
            "        <li><a href=\"{}\">{}</a></li>\n",
            escape_xml(&entry.href),
            escape_xml(&entry.title)
        ));
    }

    nav.push_str("      </ol>\n    </nav>\n  </body>\n</html>\n");
    nav
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::Metadata;

    fn sample_book() -> Book {
        let mut book = Book::new();
        book.metadata = Metadata::new("Libro & Co")
            .with_author("Desconocido")
            .with_language("es")
            .with_identifier("id123456");
        book.metadata.modified = Some("2024-01-01T00:00:00Z".to_string());
        book.set_cover("cover.png", vec![0], "image/png");
        book.add_resource("chapter_1.xhtml", b"<html/>".to_vec(), "application/xhtml+xml");
        book.add_spine_item(NAV_HREF);
        book.add_spine_item("chapter_1.xhtml");
        book.toc.push(TocEntry::new("Uno <1>", "chapter_1.xhtml"));
        book
    }

    #[test]
    fn test_opf_metadata_and_manifest() {
        let opf = generate_opf(&sample_book(), "2024-01-01T00:00:00Z");

        assert!(opf.contains("<dc:identifier id=\"BookId\">id123456</dc:identifier>"));
        assert!(opf.contains("<dc:title>Libro &amp; Co</dc:title>"));
        assert!(opf.contains("<dc:language>es</dc:language>"));
        assert!(opf.contains("<dc:creator>Desconocido</dc:creator>"));
        assert!(opf.contains("<meta property=\"dcterms:modified\">2024-01-01T00:00:00Z</meta>"));
        assert!(opf.contains("<meta name=\"cover\" content=\"cover_png\"/>"));
        assert!(opf.contains(
            "<item id=\"cover_png\" href=\"cover.png\" media-type=\"image/png\" properties=\"cover-image\"/>"
        ));
        assert!(opf.contains("properties=\"nav\""));
        assert!(opf.contains("<itemref idref=\"nav_xhtml\"/>\n    <itemref idref=\"chapter_1_xhtml\"/>"));
    }

    #[test]
    fn test_non_linear_spine_item() {
        let mut book = sample_book();
        book.add_resource("cover.xhtml", b"<html/>".to_vec(), "application/xhtml+xml");
        book.spine.insert(
            0,
            crate::book::SpineItem {
                href: "cover.xhtml".to_string(),
                linear: false,
            },
        );
        let opf = generate_opf(&book, "2024-01-01T00:00:00Z");
        assert!(opf.contains("<itemref idref=\"cover_xhtml\" linear=\"no\"/>"));
    }

    #[test]
    fn test_ncx_and_nav_escape_titles() {
        let book = sample_book();
        let entries = nav_entries(&book);

        let ncx = generate_ncx(&book, &entries);
        assert!(ncx.contains("<navLabel><text>Uno &lt;1&gt;</text></navLabel>"));
        assert!(ncx.contains("playOrder=\"1\""));

        let nav = generate_nav(&book, &entries);
        assert!(nav.contains("<li><a href=\"chapter_1.xhtml\">Uno &lt;1&gt;</a></li>"));
        assert!(nav.contains("epub:type=\"toc\""));
    }

    #[test]
    fn test_empty_toc_links_to_nav() {
        let mut book = sample_book();
        book.toc.clear();
        let entries = nav_entries(&book);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].href, NAV_HREF);
    }

    #[test]
    fn test_mimetype_is_first_and_stored() {
        let mut buffer = std::io::Cursor::new(Vec::new());
        write_epub_to_writer(&sample_book(), &mut buffer).unwrap();

        let bytes = buffer.into_inner();
        let le16 = |at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]) as usize;
        // Local file header: method at 8, name length at 26, extra length at 28
        assert_eq!(le16(8), 0);
        assert_eq!(&bytes[30..38], b"mimetype");
        let data_start = 30 + le16(26) + le16(28);
        assert_eq!(&bytes[data_start..data_start + 20], b"application/epub+zip");
    }
}
