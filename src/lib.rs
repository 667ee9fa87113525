pub mod batch;
pub mod config;
pub mod error;
pub mod extraction;
pub mod models;
pub mod pdf;
pub mod source;

pub use batch::{BatchReport, BatchRunner, RegionSequencer, region_code};
pub use config::{ClusterMode, ExtractionConfig, SizeBounds};
pub use error::{ExtractError, Result};
pub use extraction::ExtractionPipeline;
pub use models::{
    BBox, BatchResult, DocumentOutcome, FailedDocument, FailureReason, ImageCandidate, ImageRef,
    OrderedImage, OrderedPage, PixelSize, Position, RawImage, ReadingKey,
};
pub use pdf::{PdfDocument, PdfOpener};
pub use source::{DocumentOpener, ImageSource};
