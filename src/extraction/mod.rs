pub mod clusters;
pub mod filter;
pub mod order;

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use tracing::{debug, info};

use crate::config::ExtractionConfig;
use crate::error::Result;
use crate::models::{
    DocumentOutcome, ImageCandidate, OrderedImage, OrderedPage, PixelSize, Position,
};
use crate::source::ImageSource;

/// Per-document orchestrator: filter, cluster, order, write
#[derive(Debug, Clone, Default)]
pub struct ExtractionPipeline {
    config: ExtractionConfig,
}

impl ExtractionPipeline {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Qualifying images of one page, in reading order
    pub fn order_page<S: ImageSource>(&self, source: &S, page: usize) -> Result<OrderedPage> {
        let raw = source.page_images(page)?;
        let listed = raw.len();
        let qualifying = filter::filter_id_photos(raw, &self.config.size);

        debug!(
            page,
            listed,
            qualifying = qualifying.len(),
            "Filtered page images"
        );

        let mut candidates = Vec::with_capacity(qualifying.len());
        for img in qualifying {
            let bbox = source.image_bbox(page, &img.source_ref)?;
            let position = Position { x: bbox.x0, y: bbox.y0 };
            let size = PixelSize {
                width: img.width,
                height: img.height,
            };
            if let Some(candidate) = ImageCandidate::new(img.source_ref, position, size) {
                candidates.push(candidate);
            }
        }

        let images = order::order_page(candidates, &self.config);
        for (i, image) in images.iter().enumerate() {
            debug!(
                page,
                rank = i + 1,
                image = %image.candidate.source_ref,
                x = image.candidate.position.x,
                y = image.candidate.position.y,
                row = image.key.row,
                column = image.key.column,
                "Ordered image"
            );
        }

        Ok(OrderedPage { page, images })
    }

    /// Every page of the document, each ordered independently
    pub fn order_document<S: ImageSource>(&self, source: &S) -> Result<Vec<OrderedPage>> {
        (0..source.page_count())
            .map(|page| self.order_page(source, page))
            .collect()
    }

    /// Whole-document sequence: page orderings concatenated in page order
    pub fn ordered_images<S: ImageSource>(&self, source: &S) -> Result<Vec<OrderedImage>> {
        Ok(self
            .order_document(source)?
            .into_iter()
            .flat_map(|page| page.images)
            .collect())
    }

    /// Extract the document's ID photos as `{output_name}_{n}.png` into
    /// `output_dir`, numbered from 1 in reading order.
    ///
    /// All images are decoded before the first file is written, so a decode
    /// failure leaves nothing behind for this document.
    pub fn extract<S: ImageSource>(
        &self,
        source: &S,
        output_dir: &Path,
        output_name: &str,
    ) -> Result<DocumentOutcome> {
        let sequence = self.ordered_images(source)?;
        if sequence.is_empty() {
            return Ok(DocumentOutcome::NoQualifyingImage);
        }

        let decoded = sequence
            .iter()
            .map(|image| source.load_image(&image.candidate.source_ref))
            .collect::<Result<Vec<DynamicImage>>>()?;

        std::fs::create_dir_all(output_dir)?;

        let mut written = Vec::with_capacity(decoded.len());
        for (i, img) in decoded.into_iter().enumerate() {
            let path = output_path(output_dir, output_name, i + 1);
            img.to_rgb8().save_with_format(&path, ImageFormat::Png)?;
            debug!(path = %path.display(), "Wrote image");
            written.push(path);
        }

        info!(output_name, count = written.len(), "Extracted images");
        Ok(DocumentOutcome::Extracted { written })
    }
}

/// `{dir}/{name}_{sequence}.png`
pub fn output_path(output_dir: &Path, output_name: &str, sequence: usize) -> PathBuf {
    output_dir.join(format!("{}_{}.png", output_name, sequence))
}
