use crate::config::ExtractionConfig;
use crate::extraction::clusters::{ClusterAssignment, cluster_coordinates};
use crate::models::{ImageCandidate, OrderedImage, ReadingKey};

/// Sort key: rows top to bottom, then columns left to right
pub fn reading_key(image: &OrderedImage) -> ReadingKey {
    image.key
}

/// Cluster one page's candidates on both axes and sort them into reading order.
///
/// Images with identical keys keep their relative input order.
pub fn order_page(candidates: Vec<ImageCandidate>, config: &ExtractionConfig) -> Vec<OrderedImage> {
    let xs: Vec<f64> = candidates.iter().map(|c| c.position.x).collect();
    let ys: Vec<f64> = candidates.iter().map(|c| c.position.y).collect();

    let columns = cluster_coordinates(&xs, config.max_same_line_coordinate_gap, config.cluster_mode);
    let rows = cluster_coordinates(&ys, config.max_same_line_coordinate_gap, config.cluster_mode);

    let mut ordered: Vec<OrderedImage> = candidates
        .into_iter()
        .map(|candidate| {
            let key = key_for(&candidate, &rows, &columns);
            OrderedImage { candidate, key }
        })
        .collect();

    ordered.sort_by_key(reading_key);
    ordered
}

fn key_for(candidate: &ImageCandidate, rows: &ClusterAssignment, columns: &ClusterAssignment) -> ReadingKey {
    // Both assignments were built from these very coordinates, so lookups hit.
    ReadingKey {
        row: rows.index_of(candidate.position.y).unwrap_or_default(),
        column: columns.index_of(candidate.position.x).unwrap_or_default(),
    }
}
