//! Grouping of coordinate values on one axis into rows or columns.

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;

use crate::config::ClusterMode;

/// Coordinate value to cluster index, for one axis of one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterAssignment {
    indices: BTreeMap<OrderedFloat<f64>, usize>,
    clusters: usize,
}

impl ClusterAssignment {
    /// Cluster index of `value`, if it was part of the input
    pub fn index_of(&self, value: f64) -> Option<usize> {
        self.indices.get(&OrderedFloat(value)).copied()
    }

    /// Number of clusters opened
    pub fn cluster_count(&self) -> usize {
        self.clusters
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Distinct values in ascending order with their cluster index
    pub fn iter(&self) -> impl Iterator<Item = (f64, usize)> + '_ {
        self.indices.iter().map(|(k, v)| (k.into_inner(), *v))
    }
}

/// Assign a cluster index to every value.
///
/// Values are sorted and deduplicated first, so the input order does not
/// matter. Walking upwards, a new cluster opens whenever the gap exceeds
/// `tolerance`; what the gap is measured from depends on `mode`.
pub fn cluster_coordinates(values: &[f64], tolerance: f64, mode: ClusterMode) -> ClusterAssignment {
    let mut sorted: Vec<OrderedFloat<f64>> = values.iter().copied().map(OrderedFloat).collect();
    sorted.sort();
    sorted.dedup();

    let Some((&first, rest)) = sorted.split_first() else {
        return ClusterAssignment::default();
    };

    // (reference value, current cluster index)
    let (_, last_index, indices) = rest.iter().fold(
        (first.into_inner(), 0usize, vec![(first, 0usize)]),
        |(reference, index, mut acc), &value| {
            let gap = value.into_inner() - reference;
            let index = if gap > tolerance { index + 1 } else { index };
            let opened = index != acc.last().map_or(0, |(_, i)| *i);
            let reference = match mode {
                ClusterMode::Chained => value.into_inner(),
                ClusterMode::Anchored if opened => value.into_inner(),
                ClusterMode::Anchored => reference,
            };
            acc.push((value, index));
            (reference, index, acc)
        },
    );

    ClusterAssignment {
        indices: indices.into_iter().collect(),
        clusters: last_index + 1,
    }
}
