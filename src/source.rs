use std::path::Path;

use image::DynamicImage;

use crate::error::Result;
use crate::models::{BBox, ImageRef, RawImage};

/// Access to the images of one open document.
///
/// Pages are numbered from 0 in document order.
pub trait ImageSource {
    fn page_count(&self) -> usize;

    /// Image descriptors found on a page
    fn page_images(&self, page: usize) -> Result<Vec<RawImage>>;

    /// Where `image` sits on `page`
    fn image_bbox(&self, page: usize, image: &ImageRef) -> Result<BBox>;

    /// Decode the pixels of `image`
    fn load_image(&self, image: &ImageRef) -> Result<DynamicImage>;
}

/// Opens documents found during a batch run
pub trait DocumentOpener {
    type Source: ImageSource;

    fn open(&self, path: &Path) -> Result<Self::Source>;
}
