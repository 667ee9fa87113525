use crate::config::SizeBounds;
use crate::models::RawImage;

/// Check declared pixel dimensions against the ID photo window.
///
/// Bounds are strict on both ends; the portrait check allows square images.
pub fn is_id_photo(width: u32, height: u32, bounds: &SizeBounds) -> bool {
    bounds.min_width < width
        && width < bounds.max_width
        && bounds.min_height < height
        && height < bounds.max_height
        && (!bounds.require_height_greater_than_width || width <= height)
}

/// Keep the raw images that qualify as ID photos, preserving source order
pub fn filter_id_photos(images: Vec<RawImage>, bounds: &SizeBounds) -> Vec<RawImage> {
    images
        .into_iter()
        .filter(|img| is_id_photo(img.width, img.height, bounds))
        .collect()
}
