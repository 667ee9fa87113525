#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types for tests
pub use idphoto_extract::{
    BBox, BatchResult, BatchRunner, ClusterMode, DocumentOutcome, ExtractError, ExtractionConfig,
    ExtractionPipeline, FailureReason, ImageCandidate, ImageRef, ImageSource, PdfDocument,
    PdfOpener, PixelSize, Position, RawImage, ReadingKey, SizeBounds,
};
