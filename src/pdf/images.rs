//! Decoding of image XObjects into EPUB-friendly formats.

use std::fmt;
use std::io::Cursor;

use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, Stream};

use super::{ImageFormat, PageImage};
use crate::error::{Error, Result};

/// Filters that produce a finished image rather than raw samples.
const IMAGE_CODECS: [&str; 4] = ["DCTDecode", "JPXDecode", "JBIG2Decode", "CCITTFaxDecode"];

/// Follow a reference to the object it points at. Dangling references resolve
/// to themselves.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn get_resolved<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok().map(|obj| resolve(doc, obj))
}

/// Colour space of an image's samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    /// One sample per pixel, looked up in `palette` (`base` components per entry)
    Indexed { base: Box<ColorSpace>, palette: Vec<u8> },
    Unsupported(String),
}

impl ColorSpace {
    fn from_name(name: &[u8]) -> Self {
        match name {
            b"DeviceGray" | b"G" | b"CalGray" => Self::Gray,
            b"DeviceRGB" | b"RGB" | b"CalRGB" => Self::Rgb,
            b"DeviceCMYK" | b"CMYK" => Self::Cmyk,
            other => Self::Unsupported(String::from_utf8_lossy(other).into_owned()),
        }
    }

    fn from_object(doc: &Document, obj: &Object) -> Self {
        let items = match resolve(doc, obj) {
            Object::Name(name) => return Self::from_name(name),
            Object::Array(items) => items,
            _ => return Self::Unsupported("malformed".to_string()),
        };
        let Some(family) = items.first().and_then(|o| resolve(doc, o).as_name().ok()) else {
            return Self::Unsupported("malformed".to_string());
        };

        match family {
            b"Indexed" | b"I" => {
                let base = items
                    .get(1)
                    .map_or(Self::Unsupported("malformed".to_string()), |b| {
                        Self::from_object(doc, b)
                    });
                let palette = items
                    .get(3)
                    .map(|lookup| palette_bytes(doc, lookup))
                    .unwrap_or_default();
                Self::Indexed {
                    base: Box::new(base),
                    palette,
                }
            }
            b"ICCBased" => {
                let components = items
                    .get(1)
                    .and_then(|o| resolve(doc, o).as_stream().ok())
                    .and_then(|s| get_resolved(doc, &s.dict, b"N"))
                    .and_then(|n| n.as_i64().ok());
                match components {
                    Some(1) => Self::Gray,
                    Some(3) => Self::Rgb,
                    Some(4) => Self::Cmyk,
                    _ => Self::Unsupported("ICCBased".to_string()),
                }
            }
            other => Self::from_name(other),
        }
    }

    /// Samples per pixel, for the colour spaces that can be converted.
    fn components(&self) -> Option<usize> {
        match self {
            Self::Gray | Self::Indexed { .. } => Some(1),
            Self::Rgb => Some(3),
            Self::Cmyk => Some(4),
            Self::Unsupported(_) => None,
        }
    }
}

fn palette_bytes(doc: &Document, lookup: &Object) -> Vec<u8> {
    match resolve(doc, lookup) {
        Object::String(bytes, _) => bytes.clone(),
        Object::Stream(stream) => stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone()),
        _ => Vec::new(),
    }
}

/// An image XObject as found in a page's resources.
#[derive(Debug, Clone)]
pub(crate) struct RawImage<'a> {
    pub width: u32,
    pub height: u32,
    pub color_space: Option<ColorSpace>,
    pub filters: Vec<String>,
    pub bits_per_component: u32,
    /// Stencil mask: one bit per pixel with no colour of its own
    pub image_mask: bool,
    /// Stream content, still encoded with `filters`
    pub content: &'a [u8],
}

impl<'a> RawImage<'a> {
    pub(crate) fn from_stream(doc: &Document, stream: &'a Stream) -> Self {
        let dict = &stream.dict;
        let int = |key: &[u8]| {
            get_resolved(doc, dict, key)
                .and_then(|o| o.as_i64().ok())
                .and_then(|v| u32::try_from(v).ok())
        };

        let filters = match get_resolved(doc, dict, b"Filter") {
            Some(Object::Name(name)) => vec![String::from_utf8_lossy(name).into_owned()],
            Some(Object::Array(names)) => names
                .iter()
                .filter_map(|n| resolve(doc, n).as_name().ok())
                .map(|n| String::from_utf8_lossy(n).into_owned())
                .collect(),
            _ => Vec::new(),
        };
        let image_mask = get_resolved(doc, dict, b"ImageMask")
            .and_then(|o| o.as_bool().ok())
            .unwrap_or(false);

        Self {
            width: int(b"Width").unwrap_or(0),
            height: int(b"Height").unwrap_or(0),
            color_space: dict
                .get(b"ColorSpace")
                .ok()
                .map(|cs| ColorSpace::from_object(doc, cs)),
            filters,
            bits_per_component: int(b"BitsPerComponent").unwrap_or(if image_mask { 1 } else { 8 }),
            image_mask,
            content: &stream.content,
        }
    }

    fn is_cmyk(&self) -> bool {
        self.color_space == Some(ColorSpace::Cmyk)
    }
}

impl fmt::Display for RawImage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}, {} bpc", self.width, self.height, self.bits_per_component)?;
        match &self.color_space {
            Some(ColorSpace::Indexed { base, .. }) => write!(f, ", indexed {base:?}")?,
            Some(cs) => write!(f, ", {cs:?}")?,
            None if self.image_mask => write!(f, ", stencil mask")?,
            None => {}
        }
        if !self.filters.is_empty() {
            write!(f, ", filters {}", self.filters.join(" "))?;
        }
        Ok(())
    }
}

/// Decode an image XObject.
///
/// A stream whose last filter is `DCTDecode` is a JPEG once the filters in
/// front of it are applied, and passes through unless it is CMYK. Everything
/// else is run through `apply_filters`, expanded to 8-bit gray or RGB and
/// re-encoded as PNG. `apply_filters` receives the filters to undo, in order.
///
/// Returns `None` for images with no EPUB equivalent: JPEG 2000, JBIG2, fax,
/// stencil masks and colour spaces other than gray, RGB, CMYK and palettes of
/// those.
pub(crate) fn decode_image(
    raw: &RawImage<'_>,
    apply_filters: impl FnOnce(&[String]) -> Result<Vec<u8>>,
) -> Result<Option<PageImage>> {
    if raw.width == 0 || raw.height == 0 || raw.image_mask {
        return Ok(None);
    }

    if let Some((last, leading)) = raw.filters.split_last() {
        if last == "DCTDecode" && !leading.iter().any(|f| IMAGE_CODECS.contains(&f.as_str())) {
            let jpeg = if leading.is_empty() {
                raw.content.to_vec()
            } else {
                apply_filters(leading)?
            };
            return decode_jpeg(raw, jpeg).map(Some);
        }
    }
    if raw.filters.iter().any(|f| IMAGE_CODECS.contains(&f.as_str())) {
        return Ok(None);
    }

    let bpc = raw.bits_per_component;
    if !matches!(bpc, 1 | 2 | 4 | 8 | 16) {
        return Ok(None);
    }

    let samples = apply_filters(&raw.filters)?;
    let pixels = raw.width as usize * raw.height as usize;
    let color_space = match &raw.color_space {
        Some(cs) => cs.clone(),
        None if bpc == 8 => match samples.len() / pixels {
            1 => ColorSpace::Gray,
            3 => ColorSpace::Rgb,
            4 => ColorSpace::Cmyk,
            _ => return Ok(None),
        },
        None => return Ok(None),
    };
    let Some(components) = color_space.components() else {
        return Ok(None);
    };
    let Some(values) = unpack_samples(&samples, raw.width, raw.height, components, bpc) else {
        return Err(Error::InvalidPdf(format!(
            "{} bytes of samples do not fill a {raw} image",
            samples.len()
        )));
    };

    let data = match color_space {
        ColorSpace::Gray => encode_samples(raw.width, raw.height, 1, &scale(&values, bpc))?,
        ColorSpace::Rgb => encode_samples(raw.width, raw.height, 3, &scale(&values, bpc))?,
        ColorSpace::Cmyk => {
            encode_samples(raw.width, raw.height, 3, &cmyk_to_rgb(&scale(&values, bpc)))?
        }
        ColorSpace::Indexed { base, palette } => {
            let (components, expanded) = match expand_palette(&values, &base, &palette) {
                Some(expanded) => expanded,
                None => return Ok(None),
            };
            encode_samples(raw.width, raw.height, components, &expanded)?
        }
        ColorSpace::Unsupported(_) => return Ok(None),
    };

    Ok(Some(PageImage {
        data,
        format: ImageFormat::Png,
    }))
}

fn decode_jpeg(raw: &RawImage<'_>, jpeg: Vec<u8>) -> Result<PageImage> {
    if !jpeg.starts_with(&[0xFF, 0xD8]) {
        return Err(Error::InvalidPdf(format!("DCT stream of a {raw} image is not a JPEG")));
    }
    if !raw.is_cmyk() {
        return Ok(PageImage {
            data: jpeg,
            format: ImageFormat::Jpeg,
        });
    }

    let decoded = image::load_from_memory_with_format(&jpeg, image::ImageFormat::Jpeg)?;
    Ok(PageImage {
        data: encode_png(DynamicImage::ImageRgb8(decoded.to_rgb8()))?,
        format: ImageFormat::Png,
    })
}

/// Split packed samples into one value per sample.
///
/// Rows start on byte boundaries. 16-bit samples are big-endian. Returns
/// `None` when `data` is too short for the image.
fn unpack_samples(data: &[u8], width: u32, height: u32, components: usize, bpc: u32) -> Option<Vec<u16>> {
    let per_row = width as usize * components;
    let row_bytes = (per_row * bpc as usize).div_ceil(8);
    let height = height as usize;
    if row_bytes == 0 || data.len() < row_bytes * height {
        return None;
    }

    let mut values = Vec::with_capacity(per_row * height);
    for row in data.chunks_exact(row_bytes).take(height) {
        match bpc {
            8 => values.extend(row[..per_row].iter().map(|&b| u16::from(b))),
            16 => values.extend(
                row.chunks_exact(2)
                    .take(per_row)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]])),
            ),
            _ => {
                let bpc = bpc as usize;
                let mask = (1u16 << bpc) - 1;
                for i in 0..per_row {
                    let bit = i * bpc;
                    let shift = 8 - bpc - bit % 8;
                    values.push((u16::from(row[bit / 8]) >> shift) & mask);
                }
            }
        }
    }
    Some(values)
}

/// Scale unpacked samples to the 0..=255 range.
fn scale(values: &[u16], bpc: u32) -> Vec<u8> {
    match bpc {
        8 => values.iter().map(|&v| v as u8).collect(),
        16 => values.iter().map(|&v| (v >> 8) as u8).collect(),
        _ => {
            let max = (1u16 << bpc) - 1;
            values.iter().map(|&v| (v * 255 / max) as u8).collect()
        }
    }
}

/// Look every index up in the palette. Indices past the end of the palette
/// use its last entry. Returns the component count (1 or 3) and the samples.
fn expand_palette(indices: &[u16], base: &ColorSpace, palette: &[u8]) -> Option<(usize, Vec<u8>)> {
    let entry_len = match base {
        ColorSpace::Gray | ColorSpace::Rgb | ColorSpace::Cmyk => base.components()?,
        _ => return None,
    };
    let entries = palette.len() / entry_len;
    if entries == 0 {
        return None;
    }

    let mut expanded = Vec::with_capacity(indices.len() * entry_len);
    for &index in indices {
        let start = (index as usize).min(entries - 1) * entry_len;
        expanded.extend_from_slice(&palette[start..start + entry_len]);
    }

    Some(match base {
        ColorSpace::Gray => (1, expanded),
        ColorSpace::Cmyk => (3, cmyk_to_rgb(&expanded)),
        _ => (3, expanded),
    })
}

/// Convert CMYK samples to RGB with the naive subtractive formula.
pub fn cmyk_to_rgb(samples: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(samples.len() / 4 * 3);
    for px in samples.chunks_exact(4) {
        let k = px[3] as u16;
        for &c in &px[..3] {
            rgb.push(255 - (c as u16 + k).min(255) as u8);
        }
    }
    rgb
}

/// Encode 8-bit gray (1 component) or RGB (3 components) samples as PNG.
pub fn encode_samples(width: u32, height: u32, components: usize, samples: &[u8]) -> Result<Vec<u8>> {
    let img = match components {
        1 => GrayImage::from_raw(width, height, samples.to_vec()).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, samples.to_vec()).map(DynamicImage::ImageRgb8),
        _ => None,
    }
    .ok_or_else(|| {
        Error::InvalidPdf(format!(
            "image samples do not fit {width}x{height} with {components} components"
        ))
    })?;

    encode_png(img)
}

pub(crate) fn encode_png(img: DynamicImage) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    img.write_to(&mut Cursor::new(&mut output), image::ImageFormat::Png)?;
    Ok(output)
}
