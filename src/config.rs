//! Conversion configuration.
//!
//! Everything the converter used to hard-code (package metadata, the words it
//! looks for on the TOC page, the page marker label) lives here with the
//! historical values as defaults. A config file only needs the keys it wants
//! to change:
//!
//! ```toml
//! [metadata]
//! language = "en"
//! authors = ["Jane Doe"]
//!
//! [toc]
//! heading = "Contents"
//! preface_title = "Preface"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Location of the stylesheet, relative to the executable or the working directory.
pub const DEFAULT_STYLESHEET: &str = "styles/custom.css";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub metadata: MetadataConfig,
    pub toc: TocConfig,
    pub pages: PageConfig,
    /// Explicit stylesheet path. When unset, [`DEFAULT_STYLESHEET`] is looked up
    /// next to the executable and then in the working directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stylesheet: Option<PathBuf>,
    /// Zoom factor used when rasterizing the cover page.
    pub cover_zoom: f32,
}

/// Package metadata applied to every generated book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub identifier: String,
    pub language: String,
    pub authors: Vec<String>,
    /// Book title. Defaults to the input file name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TocConfig {
    /// Lines on the TOC page containing this word (any case) are the page heading, not entries.
    pub heading: String,
    /// Title of the chapter synthesized for pages before the first TOC entry.
    pub preface_title: String,
    /// Title of the single chapter emitted when no TOC entries are available.
    pub fallback_title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Append a `[Página N]` reference after each page's text.
    pub page_markers: bool,
    pub page_label: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            metadata: MetadataConfig::default(),
            toc: TocConfig::default(),
            pages: PageConfig::default(),
            stylesheet: None,
            cover_zoom: 1.0,
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            identifier: "id123456".to_string(),
            language: "es".to_string(),
            authors: vec!["Desconocido".to_string()],
            title: None,
        }
    }
}

impl Default for TocConfig {
    fn default() -> Self {
        Self {
            heading: "Contenido".to_string(),
            preface_title: "Prefacio".to_string(),
            fallback_title: "Contenido".to_string(),
        }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            page_markers: true,
            page_label: "Página".to_string(),
        }
    }
}

impl Config {
    /// Parse a TOML configuration document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Title for a book converted from `input`: the configured title, or the input file name.
    pub fn title_for(&self, input: &Path) -> String {
        if let Some(title) = &self.metadata.title {
            return title.clone();
        }
        input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.to_string_lossy().into_owned())
    }

    /// Candidate stylesheet paths in lookup order.
    pub fn stylesheet_candidates(&self) -> Vec<PathBuf> {
        if let Some(path) = &self.stylesheet {
            return vec![path.clone()];
        }

        let mut candidates = Vec::new();
        if let Ok(exe) = std::env::current_exe()
            && let Some(dir) = exe.parent()
        {
            candidates.push(dir.join(DEFAULT_STYLESHEET));
        }
        candidates.push(PathBuf::from(DEFAULT_STYLESHEET));
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.metadata.identifier, "id123456");
        assert_eq!(config.metadata.language, "es");
        assert_eq!(config.metadata.authors, vec!["Desconocido"]);
        assert_eq!(config.toc.heading, "Contenido");
        assert_eq!(config.toc.preface_title, "Prefacio");
        assert!(config.pages.page_markers);
        assert_eq!(config.cover_zoom, 1.0);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [metadata]
            language = "en"
            authors = ["Jane Doe", "John Roe"]

            [toc]
            heading = "Contents"
            "#,
        )
        .unwrap();

        assert_eq!(config.metadata.language, "en");
        assert_eq!(config.metadata.authors, vec!["Jane Doe", "John Roe"]);
        assert_eq!(config.metadata.identifier, "id123456");
        assert_eq!(config.toc.heading, "Contents");
        assert_eq!(config.toc.preface_title, "Prefacio");
        assert!(config.pages.page_markers);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(Config::from_toml_str("metadata = 3").is_err());
    }

    #[test]
    fn test_title_for() {
        let mut config = Config::default();
        assert_eq!(config.title_for(Path::new("/tmp/libro.pdf")), "libro.pdf");

        config.metadata.title = Some("Mi Libro".to_string());
        assert_eq!(config.title_for(Path::new("/tmp/libro.pdf")), "Mi Libro");
    }

    #[test]
    fn test_explicit_stylesheet_is_only_candidate() {
        let config = Config {
            stylesheet: Some(PathBuf::from("/etc/reflow/book.css")),
            ..Default::default()
        };
        assert_eq!(
            config.stylesheet_candidates(),
            vec![PathBuf::from("/etc/reflow/book.css")]
        );
    }

    #[test]
    fn test_default_stylesheet_candidates_end_with_cwd() {
        let candidates = Config::default().stylesheet_candidates();
        assert_eq!(candidates.last(), Some(&PathBuf::from(DEFAULT_STYLESHEET)));
    }
}
