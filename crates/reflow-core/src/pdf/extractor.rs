//! Page access on top of pdf-extract's content-stream interpreter.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use image::{DynamicImage, GrayImage, RgbImage};
use pdf_extract::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::blocks::BlockCollector;
use super::{PageSource, Result};
use crate::error::PdfError;
use crate::models::fragment::NativePage;

/// An opened PDF document.
pub struct PdfExtractor {
    document: Document,
    pages: BTreeMap<u32, ObjectId>,
}

impl PdfExtractor {
    /// Parse a PDF held in memory.
    ///
    /// Documents encrypted with an empty user password are decrypted
    /// transparently; anything else is rejected.
    pub fn load(data: &[u8]) -> Result<Self> {
        let mut document = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if document.is_encrypted() {
            if document.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        let pages = document.get_pages();
        if pages.is_empty() {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", pages.len());
        Ok(Self { document, pages })
    }

    /// Read and parse a PDF file.
    pub fn open(path: &Path) -> crate::Result<Self> {
        let data = std::fs::read(path)?;
        Ok(Self::load(&data)?)
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        self.pages.get(&page).copied().ok_or(PdfError::InvalidPage(page))
    }

    /// All decodable images drawn directly by the page.
    fn page_images(&self, page_id: ObjectId) -> Vec<DynamicImage> {
        let Some(resources) = page_resources(&self.document, page_id) else {
            return Vec::new();
        };

        let xobjects = match resources.get(b"XObject").and_then(|o| self.document.dereference(o)) {
            Ok((_, Object::Dictionary(dict))) => dict,
            _ => return Vec::new(),
        };

        xobjects
            .iter()
            .filter_map(|(_, reference)| self.document.dereference(reference).ok())
            .filter_map(|(_, object)| decode_image(&self.document, object))
            .collect()
    }
}

impl PageSource for PdfExtractor {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn native_page(&self, page: u32) -> Result<NativePage> {
        self.page_id(page)?;

        let mut collector = BlockCollector::new();
        // pdf-extract panics on some malformed fonts; keep that page-local.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::output_doc_page(&self.document, &mut collector, page)
        }));

        match outcome {
            Ok(Ok(())) => Ok(collector.finish()),
            Ok(Err(e)) => Err(PdfError::TextExtraction(e.to_string())),
            Err(_) => Err(PdfError::TextExtraction(format!(
                "content stream decoder aborted on page {page}"
            ))),
        }
    }

    fn page_image(&self, page: u32) -> Result<DynamicImage> {
        let page_id = self.page_id(page)?;

        let largest = self
            .page_images(page_id)
            .into_iter()
            .max_by_key(|img| u64::from(img.width()) * u64::from(img.height()));

        match largest {
            Some(img) => {
                debug!("Page {} image: {}x{}", page, img.width(), img.height());
                Ok(img)
            }
            None => Err(PdfError::NoPageImage(page)),
        }
    }
}

/// Resources dictionary of a page, following `Parent` links for inherited ones.
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
    let mut node_id = page_id;
    loop {
        let Object::Dictionary(node) = doc.get_object(node_id).ok()? else {
            return None;
        };

        if let Ok(resources) = node.get(b"Resources") {
            if let Ok((_, Object::Dictionary(dict))) = doc.dereference(resources) {
                return Some(dict.clone());
            }
        }

        match node.get(b"Parent") {
            Ok(Object::Reference(parent)) => node_id = *parent,
            _ => return None,
        }
    }
}

fn first_name(object: &Object) -> Option<&[u8]> {
    match object {
        Object::Name(name) => Some(name.as_slice()),
        Object::Array(items) => items.first().and_then(|o| o.as_name().ok()),
        _ => None,
    }
}

/// Decode an image XObject. JPEG streams and 8-bit RGB/gray rasters are
/// supported; other encodings yield `None`.
fn decode_image(doc: &Document, object: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = object else {
        return None;
    };
    let dict = &stream.dict;

    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }

    let width = u32::try_from(dict.get(b"Width").ok()?.as_i64().ok()?).ok()?;
    let height = u32::try_from(dict.get(b"Height").ok()?.as_i64().ok()?).ok()?;
    trace!("Image XObject {}x{}", width, height);

    match dict.get(b"Filter").ok().and_then(first_name) {
        Some(b"DCTDecode") => {
            return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
                .ok();
        }
        Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
            trace!("Unsupported image filter");
            return None;
        }
        _ => {}
    }

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);
    if bits != 8 {
        trace!("Unsupported bits per component: {}", bits);
        return None;
    }

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| match o {
            Object::Reference(r) => doc.get_object(*r).ok().and_then(first_name),
            other => first_name(other),
        })
        .unwrap_or(b"DeviceRGB");

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    raster_image(data, width, height, color_space)
}

fn raster_image(mut data: Vec<u8>, width: u32, height: u32, color_space: &[u8]) -> Option<DynamicImage> {
    let pixels = (width as usize).checked_mul(height as usize)?;

    match color_space {
        b"DeviceRGB" | b"RGB" | b"CalRGB" => {
            data.truncate(pixels.checked_mul(3)?);
            RgbImage::from_raw(width, height, data).map(DynamicImage::ImageRgb8)
        }
        b"DeviceGray" | b"G" | b"CalGray" => {
            data.truncate(pixels);
            GrayImage::from_raw(width, height, data).map(DynamicImage::ImageLuma8)
        }
        _ => {
            trace!("Unsupported color space: {}", String::from_utf8_lossy(color_space));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_rejects_garbage() {
        assert!(matches!(
            PdfExtractor::load(b"not a pdf at all"),
            Err(PdfError::Parse(_))
        ));
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        let result = PdfExtractor::open(Path::new("/definitely/not/here.pdf"));
        assert!(matches!(result, Err(crate::ReflowError::Io(_))));
    }

    #[test]
    fn test_raster_gray() {
        let img = raster_image(vec![0, 64, 128, 255], 2, 2, b"DeviceGray").unwrap();
        assert_eq!((img.width(), img.height()), (2, 2));
    }

    #[test]
    fn test_raster_rgb_short_data_rejected() {
        assert!(raster_image(vec![0; 5], 2, 2, b"DeviceRGB").is_none());
    }

    #[test]
    fn test_raster_unknown_color_space() {
        assert!(raster_image(vec![0; 16], 2, 2, b"DeviceCMYK").is_none());
    }
}
