//! Where images are drawn on a page.
//!
//! Walks a page's content stream keeping track of the current
//! transformation matrix, and records the box each image XObject lands in.

use std::collections::HashSet;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::models::BBox;
use crate::pdf::{as_number, resolve, stream_data};

/// Form XObjects nested deeper than this are not entered
const MAX_FORM_DEPTH: usize = 16;

/// Affine transform `[a b c d e f]` as used by the `cm` operator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Six numeric operands, or `None`
    pub fn from_operands(operands: &[Object]) -> Option<Self> {
        let values: Vec<f64> = operands.iter().map(as_number).collect::<Option<_>>()?;
        match values.as_slice() {
            &[a, b, c, d, e, f] => Some(Self::new(a, b, c, d, e, f)),
            _ => None,
        }
    }

    /// Transform applying `self` first, then `outer`
    pub fn then(&self, outer: &Matrix) -> Matrix {
        Matrix {
            a: self.a * outer.a + self.b * outer.c,
            b: self.a * outer.b + self.b * outer.d,
            c: self.c * outer.a + self.d * outer.c,
            d: self.c * outer.b + self.d * outer.d,
            e: self.e * outer.a + self.f * outer.c + outer.e,
            f: self.e * outer.b + self.f * outer.d + outer.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Visible page area in default user space (y up)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl PageBox {
    /// US Letter, used when a page declares no box at all
    pub const LETTER: PageBox = PageBox {
        left: 0.0,
        bottom: 0.0,
        right: 612.0,
        top: 792.0,
    };

    pub fn from_array(values: &[Object]) -> Option<Self> {
        let nums: Vec<f64> = values.iter().map(as_number).collect::<Option<_>>()?;
        match nums.as_slice() {
            &[x0, y0, x1, y1] => Some(Self {
                left: x0.min(x1),
                bottom: y0.min(y1),
                right: x0.max(x1),
                top: y0.max(y1),
            }),
            _ => None,
        }
    }

    /// Image space unit square under `ctm`, in top-left page coordinates
    pub fn image_bbox(&self, ctm: &Matrix) -> BBox {
        let corners = [
            ctm.apply(0.0, 0.0),
            ctm.apply(1.0, 0.0),
            ctm.apply(0.0, 1.0),
            ctm.apply(1.0, 1.0),
        ];
        let (min_x, max_x, min_y, max_y) = corners.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
            |(lx, hx, ly, hy), &(x, y)| (lx.min(x), hx.max(x), ly.min(y), hy.max(y)),
        );
        BBox {
            x0: min_x - self.left,
            y0: self.top - max_y,
            x1: max_x - self.left,
            y1: self.top - min_y,
        }
    }
}

/// First drawing of one image XObject on a page
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub image: ObjectId,
    pub width: u32,
    pub height: u32,
    pub bbox: BBox,
}

/// Collect image placements from decoded page content, in drawing order.
///
/// An image drawn more than once is reported at its first placement.
pub fn collect_placements(
    doc: &Document,
    content: &Content,
    resources: Option<&Dictionary>,
    page_box: PageBox,
) -> Vec<Placement> {
    let mut walker = Walker {
        doc,
        page_box,
        seen: HashSet::new(),
        placements: Vec::new(),
    };
    walker.walk(content, resources, Matrix::IDENTITY, 0);
    walker.placements
}

struct Walker<'a> {
    doc: &'a Document,
    page_box: PageBox,
    seen: HashSet<ObjectId>,
    placements: Vec<Placement>,
}

impl<'a> Walker<'a> {
    fn walk(&mut self, content: &Content, resources: Option<&'a Dictionary>, base: Matrix, depth: usize) {
        let mut ctm = base;
        let mut stack: Vec<Matrix> = Vec::new();

        for op in &content.operations {
            match op.operator.as_str() {
                "q" => stack.push(ctm),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        ctm = saved;
                    } else {
                        debug!("Unbalanced Q in content stream");
                    }
                }
                "cm" => match Matrix::from_operands(&op.operands) {
                    Some(m) => ctm = m.then(&ctm),
                    None => debug!(operands = ?op.operands, "Ignoring malformed cm"),
                },
                "Do" => {
                    if let Some(Ok(name)) = op.operands.first().map(Object::as_name) {
                        self.draw_xobject(name, resources, ctm, depth);
                    }
                }
                _ => {}
            }
        }
    }

    fn draw_xobject(&mut self, name: &[u8], resources: Option<&'a Dictionary>, ctm: Matrix, depth: usize) {
        let doc = self.doc;
        let Some(xobjects) = resources
            .and_then(|r| r.get(b"XObject").ok())
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_dict().ok())
        else {
            debug!(name = %String::from_utf8_lossy(name), "Do without XObject resources");
            return;
        };
        let Ok(Object::Reference(id)) = xobjects.get(name) else {
            debug!(name = %String::from_utf8_lossy(name), "XObject missing or not indirect");
            return;
        };
        let id = *id;
        let Ok(stream) = doc.get_object(id).and_then(Object::as_stream) else {
            debug!(?id, "XObject is not a stream");
            return;
        };

        match stream.dict.get(b"Subtype").and_then(Object::as_name) {
            Ok(b"Image") => {
                if !self.seen.insert(id) {
                    return;
                }
                let dim = |key: &[u8]| {
                    stream
                        .dict
                        .get(key)
                        .ok()
                        .and_then(|o| resolve(doc, o))
                        .and_then(as_number)
                        .map_or(0, |v| v.max(0.0) as u32)
                };
                self.placements.push(Placement {
                    image: id,
                    width: dim(b"Width"),
                    height: dim(b"Height"),
                    bbox: self.page_box.image_bbox(&ctm),
                });
            }
            Ok(b"Form") => {
                if depth >= MAX_FORM_DEPTH {
                    debug!(?id, "Form XObjects nested too deeply");
                    return;
                }
                let matrix = stream
                    .dict
                    .get(b"Matrix")
                    .and_then(Object::as_array)
                    .ok()
                    .and_then(|ops| Matrix::from_operands(ops))
                    .unwrap_or_default();
                let form_resources = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|o| resolve(doc, o))
                    .and_then(|o| o.as_dict().ok())
                    .or(resources);
                let content = match stream_data(stream).and_then(|data| Content::decode(&data)) {
                    Ok(content) => content,
                    Err(e) => {
                        debug!(?id, error = %e, "Skipping undecodable form");
                        return;
                    }
                };
                self.walk(&content, form_resources, matrix.then(&ctm), depth + 1);
            }
            _ => {}
        }
    }
}
