//! Report wrapper for the gaze groupings.

use std::fmt;

use serde::Serialize;

use super::{gaze_x_groups, gaze_y_bins, head_distance_groups, GazeBinning, ValueGroup};
use crate::annotation::AnnotationRecord;
use crate::error::GazeError;

/// All groupings of a record set.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GazeStatsReport {
    pub records: usize,
    pub binning: GazeBinning,
    pub gaze_x: Vec<ValueGroup>,
    pub gaze_y: Vec<Vec<usize>>,
    /// `None` when at least one record has no head distance.
    pub head_distance: Option<Vec<ValueGroup>>,
}

impl GazeStatsReport {
    pub fn compute(records: &[AnnotationRecord], binning: GazeBinning) -> Result<Self, GazeError> {
        let head_distance = match head_distance_groups(records) {
            Ok(groups) => Some(groups),
            Err(GazeError::MissingField { .. }) => None,
            Err(other) => return Err(other),
        };

        Ok(Self {
            records: records.len(),
            binning,
            gaze_x: gaze_x_groups(records)?,
            gaze_y: gaze_y_bins(records, binning)?,
            head_distance,
        })
    }
}

impl fmt::Display for GazeStatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Gaze statistics over {} record(s)", self.records)?;
        writeln!(f)?;

        writeln!(f, "Gaze x ({} distinct value(s)):", self.gaze_x.len())?;
        for group in &self.gaze_x {
            writeln!(f, "  {:>8.3}: {}", group.value, group.indices.len())?;
        }

        let step = self.binning.limit / self.binning.bins as f64;
        writeln!(f)?;
        writeln!(
            f,
            "Gaze y ({} bucket(s) of {:.4} up to {}):",
            self.binning.bins, step, self.binning.limit
        )?;
        for (bucket, indices) in self.gaze_y.iter().enumerate() {
            writeln!(
                f,
                "  < {:>8.4}: {}",
                step * (bucket + 1) as f64,
                indices.len()
            )?;
        }

        writeln!(f)?;
        match &self.head_distance {
            Some(groups) => {
                writeln!(f, "Head distance ({} distinct value(s)):", groups.len())?;
                for group in groups {
                    writeln!(f, "  {:>8.3}: {}", group.value, group.indices.len())?;
                }
            }
            None => writeln!(f, "Head distance: not available for every record")?,
        }

        Ok(())
    }
}
