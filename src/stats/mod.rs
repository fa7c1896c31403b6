//! Gaze and head-pose groupings for error analysis.
//!
//! Each grouping returns global record indices:
//! - gaze `x` rounded to three decimals,
//! - gaze `y` bucketed into equal steps up to a limit,
//! - exact head-camera distance.

mod report;

pub use report::GazeStatsReport;

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::annotation::AnnotationRecord;
use crate::error::GazeError;

/// Bucketing of gaze `y` values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GazeBinning {
    /// Upper end of the covered range.
    pub limit: f64,
    /// Number of buckets.
    pub bins: usize,
}

impl Default for GazeBinning {
    fn default() -> Self {
        Self {
            limit: 0.349,
            bins: 10,
        }
    }
}

impl GazeBinning {
    /// Bucket upper bounds, built by repeated addition of `limit / bins`.
    fn ceilings(&self) -> Vec<f64> {
        let step = self.limit / self.bins as f64;
        let mut value = 0.0;
        (0..=self.bins)
            .map(|_| {
                value += step;
                value
            })
            .collect()
    }

    /// Bucket of `y`, or `None` past the last bucket.
    ///
    /// Values below the first ceiling (negative ones included) land in bucket 0.
    pub fn bucket(&self, y: f64) -> Option<usize> {
        let bucket = self
            .ceilings()
            .iter()
            .take_while(|ceiling| **ceiling <= y)
            .count();
        (bucket < self.bins).then_some(bucket)
    }
}

/// Records sharing one grouping value.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValueGroup {
    pub value: f64,
    pub indices: Vec<usize>,
}

/// Group records by gaze `x` rounded to three decimals, in ascending order.
pub fn gaze_x_groups(records: &[AnnotationRecord]) -> Result<Vec<ValueGroup>, GazeError> {
    let mut groups: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, record) in records.iter().enumerate() {
        let millis = (record.gaze()?.x * 1000.0).round() as i64;
        groups.entry(millis).or_default().push(idx);
    }

    Ok(groups
        .into_iter()
        .map(|(millis, indices)| ValueGroup {
            value: millis as f64 / 1000.0,
            indices,
        })
        .collect())
}

/// Bucket records by gaze `y`; one entry per bucket, possibly empty.
pub fn gaze_y_bins(
    records: &[AnnotationRecord],
    binning: GazeBinning,
) -> Result<Vec<Vec<usize>>, GazeError> {
    let mut bins = vec![Vec::new(); binning.bins];

    for (idx, record) in records.iter().enumerate() {
        if let Some(bucket) = binning.bucket(record.gaze()?.y) {
            bins[bucket].push(idx);
        }
    }

    Ok(bins)
}

/// Group records by exact head-camera distance, in ascending order.
pub fn head_distance_groups(records: &[AnnotationRecord]) -> Result<Vec<ValueGroup>, GazeError> {
    let mut positions: HashMap<u64, usize> = HashMap::new();
    let mut groups: Vec<ValueGroup> = Vec::new();

    for (idx, record) in records.iter().enumerate() {
        let distance = record.head_distance()?;
        let position = *positions.entry(distance.to_bits()).or_insert_with(|| {
            groups.push(ValueGroup {
                value: distance,
                indices: Vec::new(),
            });
            groups.len() - 1
        });
        groups[position].indices.push(idx);
    }

    groups.sort_by(|a, b| a.value.total_cmp(&b.value));
    Ok(groups)
}
