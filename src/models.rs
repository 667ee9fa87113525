use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Opaque handle to an image inside its source document.
///
/// For PDF sources this is the indirect object number and generation of the
/// image XObject. The ordering code never looks inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageRef {
    pub object: u32,
    pub generation: u16,
}

impl ImageRef {
    pub fn new(object: u32, generation: u16) -> Self {
        Self { object, generation }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.object, self.generation)
    }
}

/// Image descriptor as listed by the source, before any filtering
#[derive(Debug, Clone, PartialEq)]
pub struct RawImage {
    pub source_ref: ImageRef,
    /// Declared pixel width
    pub width: u32,
    /// Declared pixel height
    pub height: u32,
}

/// Bounding box of an image placement in page space (origin top-left, y down)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

/// A qualifying image on one page
#[derive(Debug, Clone, PartialEq)]
pub struct ImageCandidate {
    pub position: Position,
    pub size: PixelSize,
    pub source_ref: ImageRef,
}

impl ImageCandidate {
    /// Returns `None` for images with a zero dimension.
    pub fn new(source_ref: ImageRef, position: Position, size: PixelSize) -> Option<Self> {
        if size.width == 0 || size.height == 0 {
            return None;
        }
        Some(Self {
            position,
            size,
            source_ref,
        })
    }
}

/// Row/column pair an image is sorted by. Field order gives row-major `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReadingKey {
    pub row: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderedImage {
    pub candidate: ImageCandidate,
    pub key: ReadingKey,
}

/// One page's qualifying images in reading order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderedPage {
    pub page: usize,
    pub images: Vec<OrderedImage>,
}

/// What happened to one document
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentOutcome {
    Extracted { written: Vec<PathBuf> },
    NoQualifyingImage,
}

impl DocumentOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Extracted { .. })
    }

    pub fn written(&self) -> &[PathBuf] {
        match self {
            Self::Extracted { written } => written,
            Self::NoQualifyingImage => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    NoQualifyingImage,
    DecodeFailed(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoQualifyingImage => write!(f, "no qualifying image"),
            Self::DecodeFailed(msg) => write!(f, "decode failed: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDocument {
    /// Original file name, without directory
    pub file_name: String,
    pub reason: FailureReason,
}

/// Aggregate over one batch run
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BatchResult {
    pub processed: usize,
    pub unprocessed: usize,
    pub failures: Vec<FailedDocument>,
    pub missing_list: Option<PathBuf>,
}

impl BatchResult {
    pub fn total(&self) -> usize {
        self.processed + self.unprocessed
    }

    pub fn failed_names(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.file_name.as_str())
    }
}
