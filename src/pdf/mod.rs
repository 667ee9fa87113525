//! `ImageSource` backed by `lopdf`.

pub mod decode;
pub mod placement;

use std::path::Path;

use image::DynamicImage;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use crate::error::{ExtractError, Result};
use crate::models::{BBox, ImageRef, RawImage};
use crate::source::{DocumentOpener, ImageSource};

use placement::{PageBox, Placement, collect_placements};

/// Inheritance chains longer than this are treated as broken
const MAX_PARENT_DEPTH: usize = 64;

/// A loaded PDF with image placements resolved for every page
pub struct PdfDocument {
    doc: Document,
    pages: Vec<Vec<Placement>>,
}

impl PdfDocument {
    pub fn open(path: &Path) -> Result<Self> {
        let doc = Document::load(path).map_err(|source| ExtractError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_document(doc)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_document(Document::load_mem(bytes)?)
    }

    pub fn from_document(doc: Document) -> Result<Self> {
        let mut pages = Vec::new();
        for (number, page_id) in doc.get_pages() {
            let placements = page_placements(&doc, page_id)?;
            debug!(page = number, images = placements.len(), "Scanned page");
            pages.push(placements);
        }
        Ok(Self { doc, pages })
    }

    fn placements(&self, page: usize) -> Result<&[Placement]> {
        self.pages
            .get(page)
            .map(Vec::as_slice)
            .ok_or(ExtractError::PageOutOfRange {
                page,
                count: self.pages.len(),
            })
    }
}

impl ImageSource for PdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_images(&self, page: usize) -> Result<Vec<RawImage>> {
        Ok(self
            .placements(page)?
            .iter()
            .map(|p| RawImage {
                source_ref: image_ref(p.image),
                width: p.width,
                height: p.height,
            })
            .collect())
    }

    fn image_bbox(&self, page: usize, image: &ImageRef) -> Result<BBox> {
        self.placements(page)?
            .iter()
            .find(|p| image_ref(p.image) == *image)
            .map(|p| p.bbox)
            .ok_or(ExtractError::ImageNotPlaced { page, image: *image })
    }

    fn load_image(&self, image: &ImageRef) -> Result<DynamicImage> {
        let stream = self
            .doc
            .get_object((image.object, image.generation))
            .and_then(Object::as_stream)?;
        decode::decode_image(&self.doc, *image, stream)
    }
}

/// Opens every batch entry as a PDF
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfOpener;

impl DocumentOpener for PdfOpener {
    type Source = PdfDocument;

    fn open(&self, path: &Path) -> Result<PdfDocument> {
        PdfDocument::open(path)
    }
}

fn image_ref(id: ObjectId) -> ImageRef {
    ImageRef::new(id.0, id.1)
}

fn page_placements(doc: &Document, page_id: ObjectId) -> Result<Vec<Placement>> {
    let page_box = inherited(doc, page_id, b"CropBox")
        .or_else(|| inherited(doc, page_id, b"MediaBox"))
        .and_then(|o| o.as_array().ok())
        .and_then(|values| PageBox::from_array(values))
        .unwrap_or(PageBox::LETTER);
    let resources = inherited(doc, page_id, b"Resources").and_then(|o| o.as_dict().ok());

    let has_contents = doc.get_dictionary(page_id)?.has(b"Contents");
    if !has_contents {
        return Ok(Vec::new());
    }
    let content = Content::decode(&doc.get_page_content(page_id)?)?;
    Ok(collect_placements(doc, &content, resources, page_box))
}

/// Page attribute, looked up through the `/Parent` chain
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok();
    for _ in 0..MAX_PARENT_DEPTH {
        let dict: &Dictionary = current?;
        if let Ok(obj) = dict.get(key) {
            return resolve(doc, obj);
        }
        current = dict
            .get(b"Parent")
            .ok()
            .and_then(|p| resolve(doc, p))
            .and_then(|p| p.as_dict().ok());
    }
    None
}

/// Follow indirect references to the object they point at.
///
/// `None` for dangling references and reference cycles.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    let mut current = obj;
    for _ in 0..MAX_PARENT_DEPTH {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

pub(crate) fn as_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Stream bytes with filters removed; unfiltered streams are returned as is
pub(crate) fn stream_data(stream: &Stream) -> lopdf::Result<Vec<u8>> {
    if stream.dict.has(b"Filter") {
        stream.decompressed_content()
    } else {
        Ok(stream.content.clone())
    }
}
