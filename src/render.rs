//! XHTML content documents for chapters and the cover page.

use crate::config::DEFAULT_STYLESHEET;
use crate::util::escape_xml;

/// Wraps chapter content into standalone XHTML documents.
#[derive(Debug, Clone)]
pub struct ChapterRenderer {
    language: String,
}

impl ChapterRenderer {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }

    /// Render one chapter.
    ///
    /// `title` is plain text and is escaped here. `content` must already be
    /// markup; the page extractor escapes PDF text when it builds it.
    pub fn render(&self, title: &str, content: &str) -> String {
        let title = escape_xml(title);
        let heading = if title.trim().is_empty() {
            String::new()
        } else {
            format!("<h1>{title}</h1>")
        };

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" xml:lang="{lang}" lang="{lang}">
  <head>
    <title>{title}</title>
    <link href="{css}" rel="stylesheet" type="text/css" />
  </head>
  <body>
    {heading}
    <article epub:type="chapter" class="article-chapter">
      {content}
    </article>
  </body>
</html>
"#,
            lang = escape_xml(&self.language),
            css = DEFAULT_STYLESHEET,
        )
    }

    /// Render the page that displays the cover image.
    pub fn render_cover(&self, image_href: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" xml:lang="{lang}" lang="{lang}">
  <head>
    <title>Cover</title>
  </head>
  <body>
    <section epub:type="cover">
      <img src="{src}" alt="Cover" />
    </section>
  </body>
</html>
"#,
            lang = escape_xml(&self.language),
            src = escape_xml(image_href),
        )
    }
}
