//! [`PageSource`] backed by MuPDF for text and rendering, and lopdf for
//! walking the image XObjects of each page.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use log::{debug, warn};
use lopdf::{Dictionary, Object, ObjectId, Stream};
use mupdf::{Colorspace, Document, Matrix};

use super::images::{RawImage, decode_image, encode_samples, resolve};
use super::{PageImage, PageSource};
use crate::error::{Error, Result};

/// Page tree nesting beyond this is treated as a cycle.
const MAX_TREE_DEPTH: usize = 64;

const MAX_FORM_DEPTH: usize = 8;

/// An open PDF document.
///
/// Both underlying handles are released when the source is dropped.
pub struct MuPdfSource {
    doc: Document,
    objects: lopdf::Document,
    page_ids: BTreeMap<u32, ObjectId>,
    page_count: u32,
}

impl MuPdfSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.to_string_lossy();

        let doc = Document::open(&*path_str)?;
        let page_count = u32::try_from(doc.page_count()?)
            .map_err(|_| Error::InvalidPdf("negative page count".to_string()))?;

        let objects = lopdf::Document::load(path)?;
        let page_ids = objects.get_pages();

        debug!("Opened {} ({page_count} pages)", path.display());
        Ok(Self {
            doc,
            objects,
            page_ids,
            page_count,
        })
    }

    fn load_page(&self, page: u32) -> Result<mupdf::Page> {
        self.check_page(page)?;
        Ok(self.doc.load_page((page - 1) as i32)?)
    }

    /// Image XObjects in the page's resources and in the forms it draws,
    /// in dictionary order.
    fn image_xobjects(&self, page_id: ObjectId) -> Vec<(ObjectId, &Stream)> {
        let mut found = Vec::new();
        let mut seen = BTreeSet::new();
        if let Some(resources) = self.inherited(page_id, b"Resources").and_then(|r| r.as_dict().ok()) {
            self.collect_images(resources, 0, &mut seen, &mut found);
        }
        found
    }

    fn collect_images<'a>(
        &'a self,
        resources: &'a Dictionary,
        depth: usize,
        seen: &mut BTreeSet<ObjectId>,
        found: &mut Vec<(ObjectId, &'a Stream)>,
    ) {
        let Some(xobjects) = resources
            .get(b"XObject")
            .ok()
            .and_then(|x| resolve(&self.objects, x).as_dict().ok())
        else {
            return;
        };

        for (name, obj) in xobjects.iter() {
            let Ok(id) = obj.as_reference() else {
                debug!("Skipping inline XObject /{}", String::from_utf8_lossy(name));
                continue;
            };
            if !seen.insert(id) {
                continue;
            }
            let Some(stream) = self.objects.get_object(id).ok().and_then(|o| o.as_stream().ok()) else {
                continue;
            };

            match stream.dict.get(b"Subtype").and_then(Object::as_name) {
                Ok(b"Image") => found.push((id, stream)),
                Ok(b"Form") if depth < MAX_FORM_DEPTH => {
                    let form_resources = stream
                        .dict
                        .get(b"Resources")
                        .ok()
                        .and_then(|r| resolve(&self.objects, r).as_dict().ok());
                    if let Some(form_resources) = form_resources {
                        self.collect_images(form_resources, depth + 1, seen, found);
                    }
                }
                _ => {}
            }
        }
    }

    /// Look `key` up on a page, falling back to its ancestors in the page tree.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut node = self.objects.get_dictionary(page_id).ok()?;
        for _ in 0..MAX_TREE_DEPTH {
            if let Ok(value) = node.get(key) {
                return Some(resolve(&self.objects, value));
            }
            let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
            node = self.objects.get_dictionary(parent).ok()?;
        }
        None
    }

    fn check_page(&self, page: u32) -> Result<()> {
        if page == 0 || page > self.page_count {
            return Err(Error::PageNotFound {
                page,
                count: self.page_count,
            });
        }
        Ok(())
    }
}

impl PageSource for MuPdfSource {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn page_text(&self, page: u32) -> Result<String> {
        Ok(self.load_page(page)?.to_text()?)
    }

    fn page_images(&self, page: u32) -> Result<Vec<PageImage>> {
        self.check_page(page)?;
        let Some(&page_id) = self.page_ids.get(&page) else {
            return Ok(Vec::new());
        };

        let mut images = Vec::new();
        for (id, stream) in self.image_xobjects(page_id) {
            let raw = RawImage::from_stream(&self.objects, stream);
            match decode_image(&raw, |filters| apply_filters(stream, filters)) {
                Ok(Some(image)) => images.push(image),
                Ok(None) => warn!("Page {page}: skipping image {id:?} ({raw}): no EPUB equivalent"),
                Err(e) => warn!("Page {page}: could not decode image {id:?}: {e}"),
            }
        }
        Ok(images)
    }

    fn render_page(&self, page: u32, zoom: f32) -> Result<Vec<u8>> {
        let page_obj = self.load_page(page)?;
        let matrix = Matrix::new_scale(zoom, zoom);
        let pixmap = page_obj.to_pixmap(&matrix, &Colorspace::device_rgb(), false, false)?;

        let width = pixmap.width() as u32;
        let height = pixmap.height() as u32;
        let n = pixmap.n() as usize;
        let samples = pixmap.samples();

        let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
        for px in samples.chunks_exact(n).take(width as usize * height as usize) {
            rgb.extend_from_slice(&px[..3]);
        }

        encode_samples(width, height, 3, &rgb)
    }
}

/// Undo `filters` on the stream content, ignoring the stream's own `Filter`.
fn apply_filters(stream: &Stream, filters: &[String]) -> Result<Vec<u8>> {
    if filters.is_empty() {
        return Ok(stream.content.clone());
    }

    let mut dict = stream.dict.clone();
    let names = filters
        .iter()
        .map(|f| Object::Name(f.clone().into_bytes()))
        .collect::<Vec<_>>();
    dict.set("Filter", Object::Array(names));
    Ok(Stream::new(dict, stream.content.clone()).decompressed_content()?)
}
