/// In-memory representation of the EPUB package being assembled.
///
/// The converter fills a `Book` completely before anything is written to disk,
/// so a failed conversion never leaves a partial output file behind.
#[derive(Debug, Clone, Default)]
pub struct Book {
    pub metadata: Metadata,
    pub spine: Vec<SpineItem>,
    pub toc: Vec<TocEntry>,
    /// Resources in manifest order.
    pub resources: Vec<Resource>,
}

/// Book metadata (Dublin Core subset)
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: String,
    pub authors: Vec<String>,
    pub language: String,
    pub identifier: String,
    /// Href of the cover image resource
    pub cover_image: Option<String>,
    /// `dcterms:modified` timestamp; the writer uses the current time when unset
    pub modified: Option<String>,
}

/// An item in the reading order (spine)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineItem {
    pub href: String,
    pub linear: bool,
}

/// A navigation entry, listed in both nav.xhtml and toc.ncx
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub title: String,
    pub href: String,
}

/// A packaged file (content document, image, CSS)
#[derive(Debug, Clone)]
pub struct Resource {
    pub href: String,
    pub data: Vec<u8>,
    pub media_type: String,
    /// EPUB 3 manifest properties, e.g. `cover-image`
    pub properties: Option<String>,
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource to the book, replacing any resource with the same href
    pub fn add_resource(&mut self, href: impl Into<String>, data: Vec<u8>, media_type: impl Into<String>) {
        let resource = Resource {
            href: href.into(),
            data,
            media_type: media_type.into(),
            properties: None,
        };
        match self.resources.iter_mut().find(|r| r.href == resource.href) {
            Some(existing) => *existing = resource,
            None => self.resources.push(resource),
        }
    }

    /// Get a resource by href
    pub fn get_resource(&self, href: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.href == href)
    }

    /// Set the cover image, registering it as a resource
    pub fn set_cover(&mut self, href: impl Into<String>, data: Vec<u8>, media_type: impl Into<String>) {
        let href = href.into();
        self.add_resource(href.clone(), data, media_type);
        if let Some(resource) = self.resources.iter_mut().find(|r| r.href == href) {
            resource.properties = Some("cover-image".to_string());
        }
        self.metadata.cover_image = Some(href);
    }

    /// Add a spine item
    pub fn add_spine_item(&mut self, href: impl Into<String>) {
        self.spine.push(SpineItem {
            href: href.into(),
            linear: true,
        });
    }

    /// Add a spine item that is reachable but outside the linear reading order
    pub fn add_auxiliary_spine_item(&mut self, href: impl Into<String>) {
        self.spine.push(SpineItem {
            href: href.into(),
            linear: false,
        });
    }
}

impl Metadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }
}

impl TocEntry {
    pub fn new(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            href: href.into(),
        }
    }
}
