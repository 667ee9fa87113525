use serde::{Deserialize, Serialize};

// Pixel bounds for an embedded image to count as an ID photo. All strict.
pub const REQUIRE_HEIGHT_GREATER_THAN_WIDTH: bool = true;
pub const MAX_PHOTO_WIDTH: u32 = 900;
pub const MAX_PHOTO_HEIGHT: u32 = 900;
pub const MIN_PHOTO_WIDTH: u32 = 150;
pub const MIN_PHOTO_HEIGHT: u32 = 150;

/// Largest gap between neighbouring coordinates that still counts as the
/// same row or column, in page units.
pub const MAX_SAME_LINE_COORDINATE_GAP: f64 = 10.0;

/// Pixel window an image has to fall into to be kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeBounds {
    pub min_width: u32,
    pub max_width: u32,
    pub min_height: u32,
    pub max_height: u32,
    /// Reject landscape images (`width > height`)
    pub require_height_greater_than_width: bool,
}

impl Default for SizeBounds {
    fn default() -> Self {
        Self {
            min_width: MIN_PHOTO_WIDTH,
            max_width: MAX_PHOTO_WIDTH,
            min_height: MIN_PHOTO_HEIGHT,
            max_height: MAX_PHOTO_HEIGHT,
            require_height_greater_than_width: REQUIRE_HEIGHT_GREATER_THAN_WIDTH,
        }
    }
}

/// How the gap that opens a new cluster is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterMode {
    /// Gap to the immediately preceding value. A run of small steps can
    /// drift arbitrarily far from the first member of its cluster.
    #[default]
    Chained,
    /// Gap to the first value of the current cluster.
    Anchored,
}

/// Immutable tuning for one extraction run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub size: SizeBounds,
    pub max_same_line_coordinate_gap: f64,
    pub cluster_mode: ClusterMode,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            size: SizeBounds::default(),
            max_same_line_coordinate_gap: MAX_SAME_LINE_COORDINATE_GAP,
            cluster_mode: ClusterMode::default(),
        }
    }
}

impl ExtractionConfig {
    pub fn with_size_bounds(mut self, size: SizeBounds) -> Self {
        self.size = size;
        self
    }

    pub fn with_max_same_line_coordinate_gap(mut self, gap: f64) -> Self {
        self.max_same_line_coordinate_gap = gap;
        self
    }

    pub fn with_cluster_mode(mut self, mode: ClusterMode) -> Self {
        self.cluster_mode = mode;
        self
    }
}
