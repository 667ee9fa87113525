use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use idphoto_extract::{
    BBox, DocumentOpener, ExtractError, ImageCandidate, ImageRef, ImageSource, PixelSize, Position,
    RawImage, Result,
};
use image::{DynamicImage, ImageBuffer, Rgb};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

/// One image on a fake page: declared size, where it sits, and the colour
/// its pixels decode to
#[derive(Debug, Clone)]
pub struct FakeImage {
    pub raw: RawImage,
    pub bbox: BBox,
    pub color: [u8; 3],
}

/// Builds a fake image whose red channel equals its object number, so the
/// written PNGs can be traced back to their source.
pub fn fake_image(object: u32, width: u32, height: u32, x: f64, y: f64) -> FakeImage {
    FakeImage {
        raw: RawImage {
            source_ref: ImageRef::new(object, 0),
            width,
            height,
        },
        bbox: BBox {
            x0: x,
            y0: y,
            x1: x + 100.0,
            y1: y + 120.0,
        },
        color: [object as u8, 0, 0],
    }
}

/// In-memory document. Records which images had their position requested.
#[derive(Debug, Clone, Default)]
pub struct FakeSource {
    pub pages: Vec<Vec<FakeImage>>,
    /// Images whose pixel data fails to decode
    pub undecodable: Vec<ImageRef>,
    pub bbox_requests: RefCell<Vec<ImageRef>>,
}

impl FakeSource {
    pub fn new(pages: Vec<Vec<FakeImage>>) -> Self {
        Self {
            pages,
            undecodable: Vec::new(),
            bbox_requests: RefCell::new(Vec::new()),
        }
    }

    fn find(&self, image: &ImageRef) -> Option<&FakeImage> {
        self.pages
            .iter()
            .flatten()
            .find(|img| img.raw.source_ref == *image)
    }
}

impl ImageSource for FakeSource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_images(&self, page: usize) -> Result<Vec<RawImage>> {
        let images = self.pages.get(page).ok_or(ExtractError::PageOutOfRange {
            page,
            count: self.pages.len(),
        })?;
        Ok(images.iter().map(|img| img.raw.clone()).collect())
    }

    fn image_bbox(&self, page: usize, image: &ImageRef) -> Result<BBox> {
        self.bbox_requests.borrow_mut().push(*image);
        self.pages
            .get(page)
            .and_then(|imgs| imgs.iter().find(|img| img.raw.source_ref == *image))
            .map(|img| img.bbox)
            .ok_or(ExtractError::ImageNotPlaced { page, image: *image })
    }

    fn load_image(&self, image: &ImageRef) -> Result<DynamicImage> {
        if self.undecodable.contains(image) {
            return Err(ExtractError::unsupported(*image, "JBIG2Decode encoding"));
        }
        let img = self
            .find(image)
            .ok_or_else(|| ExtractError::unsupported(*image, "unknown image"))?;
        // Pixel content only needs to identify the image, keep it small.
        let buf = ImageBuffer::from_pixel(8, 8, Rgb(img.color));
        Ok(DynamicImage::ImageRgb8(buf))
    }
}

/// Opens documents by file name from a fixed table. Names mapped to `None`
/// fail as if the file could not be decoded.
#[derive(Debug, Clone, Default)]
pub struct FakeOpener {
    pub documents: HashMap<String, Option<FakeSource>>,
}

impl FakeOpener {
    pub fn with(mut self, name: &str, source: Option<FakeSource>) -> Self {
        self.documents.insert(name.to_string(), source);
        self
    }
}

impl DocumentOpener for FakeOpener {
    type Source = FakeSource;

    fn open(&self, path: &Path) -> Result<FakeSource> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match self.documents.get(&name) {
            Some(Some(source)) => Ok(source.clone()),
            _ => Err(ExtractError::unsupported(ImageRef::new(1, 0), "JPXDecode encoding")),
        }
    }
}

/// A source with one qualifying image on one page
pub fn single_photo_source() -> FakeSource {
    FakeSource::new(vec![vec![fake_image(10, 200, 300, 50.0, 50.0)]])
}

/// Creates empty files named `names` in `dir`
pub fn touch_all(dir: &Path, names: &[&str]) -> std::io::Result<()> {
    for name in names {
        std::fs::write(dir.join(name), b"")?;
    }
    Ok(())
}

pub fn candidate(object: u32, x: f64, y: f64) -> ImageCandidate {
    ImageCandidate::new(
        ImageRef::new(object, 0),
        Position { x, y },
        PixelSize {
            width: 200,
            height: 300,
        },
    )
    .expect("non-zero size")
}

// ---- real PDF documents built with lopdf ----

pub const PAGE_WIDTH: i64 = 595;
pub const PAGE_HEIGHT: i64 = 842;

/// An image XObject drawn at `(x, y)` (top-left, y down) scaled to
/// `draw_width` x `draw_height` page units
#[derive(Debug, Clone)]
pub struct PdfImageDraw {
    pub x: i64,
    pub y: i64,
    pub draw_width: i64,
    pub draw_height: i64,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub color: [u8; 3],
}

pub fn pdf_image(x: i64, y: i64, pixel_width: u32, pixel_height: u32, color: [u8; 3]) -> PdfImageDraw {
    PdfImageDraw {
        x,
        y,
        draw_width: 100,
        draw_height: 120,
        pixel_width,
        pixel_height,
        color,
    }
}

fn rgb_image_stream(placed: &PdfImageDraw) -> Stream {
    let pixels = (placed.pixel_width * placed.pixel_height) as usize;
    let data: Vec<u8> = placed.color.iter().copied().cycle().take(pixels * 3).collect();
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(placed.pixel_width),
            "Height" => i64::from(placed.pixel_height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        data,
    )
}

/// `q w 0 0 h x y' cm /name Do Q`, with `y` flipped into PDF user space
fn draw_ops(placed: &PdfImageDraw, name: &str) -> Vec<Operation> {
    let bottom = PAGE_HEIGHT - placed.y - placed.draw_height;
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                placed.draw_width.into(),
                0.into(),
                0.into(),
                placed.draw_height.into(),
                placed.x.into(),
                bottom.into(),
            ],
        ),
        Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
        Operation::new("Q", vec![]),
    ]
}

fn finish(mut doc: Document, pages_id: ObjectId, page_ids: Vec<ObjectId>) -> anyhow::Result<Vec<u8>> {
    let kids: Vec<Object> = page_ids.iter().map(|id| Object::Reference(*id)).collect();
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

/// Serialized PDF with one page per entry, each image drawn directly from
/// the page content stream in the given order
pub fn build_pdf(pages: &[Vec<PdfImageDraw>]) -> anyhow::Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut page_ids = Vec::new();

    for images in pages {
        let mut xobjects = lopdf::Dictionary::new();
        let mut operations = Vec::new();
        for (i, placed) in images.iter().enumerate() {
            let name = format!("Im{}", i + 1);
            let image_id = doc.add_object(rgb_image_stream(placed));
            xobjects.set(name.as_bytes().to_vec(), Object::Reference(image_id));
            operations.extend(draw_ops(placed, &name));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! { "XObject" => xobjects },
        });
        page_ids.push(page_id);
    }

    finish(doc, pages_id, page_ids)
}

/// Single page whose only content is a Form XObject translated by
/// `(dx, dy)` user-space units, drawing `placed` inside it
pub fn build_pdf_with_form(placed: &PdfImageDraw, dx: i64, dy: i64) -> anyhow::Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(rgb_image_stream(placed));
    let form_content = Content {
        operations: draw_ops(placed, "Im1"),
    };
    let form_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            "Matrix" => vec![1.into(), 0.into(), 0.into(), 1.into(), dx.into(), dy.into()],
            "Resources" => dictionary! { "XObject" => dictionary! { "Im1" => image_id } },
        },
        form_content.encode()?,
    ));

    let page_content = Content {
        operations: vec![Operation::new("Do", vec![Object::Name(b"Fm1".to_vec())])],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, page_content.encode()?));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! { "XObject" => dictionary! { "Fm1" => form_id } },
    });

    finish(doc, pages_id, vec![page_id])
}

/// Single page drawing one image with an arbitrary color space and raw
/// sample data
pub fn build_pdf_with_samples(
    width: i64,
    height: i64,
    bits_per_component: i64,
    color_space: Object,
    samples: Vec<u8>,
) -> anyhow::Result<Vec<u8>> {
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width,
        "Height" => height,
        "ColorSpace" => color_space,
        "BitsPerComponent" => bits_per_component,
    };
    build_pdf_with_image(Stream::new(dict, samples))
}

/// Single page drawing `image` as its only XObject
pub fn build_pdf_with_image(image: Stream) -> anyhow::Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(image);
    let placed = pdf_image(40, 40, 0, 0, [0, 0, 0]);
    let content = Content {
        operations: draw_ops(&placed, "Im1"),
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! { "XObject" => dictionary! { "Im1" => image_id } },
    });

    finish(doc, pages_id, vec![page_id])
}
