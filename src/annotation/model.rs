//! Parsed annotation records.
//!
//! A record mirrors one `<filename>`-opened block of an annotation file.
//! Optional sub-blocks stay `None` when absent; the accessors turn an absent
//! field into [`GazeError::MissingField`] at the point where it is needed.

use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Add;

use crate::error::GazeError;

/// Region name of the face box.
pub const REGION_FACE: &str = "face";
/// Region name of the right eye box.
pub const REGION_RIGHT_EYE: &str = "reye";
/// Region name of the left eye box.
pub const REGION_LEFT_EYE: &str = "leye";

/// A fully specified 2D gaze coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct GazePoint {
    pub x: f64,
    pub y: f64,
}

impl GazePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns the point as an `[x, y]` pair.
    pub fn to_array(self) -> [f64; 2] {
        [self.x, self.y]
    }
}

impl Add for GazePoint {
    type Output = GazePoint;

    fn add(self, rhs: GazePoint) -> GazePoint {
        GazePoint::new(self.x + rhs.x, self.y + rhs.y)
    }
}

/// An `x`/`y` block whose components may each be missing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PartialPoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

impl PartialPoint {
    fn complete(&self, filename: &str, block: &str) -> Result<GazePoint, GazeError> {
        let x = self
            .x
            .ok_or_else(|| GazeError::missing(filename, &format!("{block}.x")))?;
        let y = self
            .y
            .ok_or_else(|| GazeError::missing(filename, &format!("{block}.y")))?;
        Ok(GazePoint::new(x, y))
    }
}

/// Physical screen size block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ScreenSize {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

/// Head pose block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct HeadPose {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// A named bounding box in `[xmin, ymin, xmax, ymax]` pixel order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct RegionBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl RegionBox {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Returns true if both min coordinates are not greater than the max ones.
    pub fn is_ordered(&self) -> bool {
        self.xmin <= self.xmax && self.ymin <= self.ymax
    }
}

/// One annotated image.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AnnotationRecord {
    /// Image stem; the loader appends `.png`.
    pub filename: String,

    /// Declared image width (informational).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    /// Declared image height (informational).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    /// Task grouping key (the `model` tag).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gaze: Option<PartialPoint>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen: Option<ScreenSize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_screen_offset: Option<PartialPoint>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<HeadPose>,

    /// Named boxes keyed by object name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub regions: BTreeMap<String, RegionBox>,
}

impl AnnotationRecord {
    /// Creates an empty record for the given image stem.
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Default::default()
        }
    }

    pub fn task_id(&self) -> Result<&str, GazeError> {
        self.task_id
            .as_deref()
            .ok_or_else(|| GazeError::missing(&self.filename, "model"))
    }

    /// Raw gaze target.
    pub fn gaze(&self) -> Result<GazePoint, GazeError> {
        self.gaze
            .as_ref()
            .ok_or_else(|| GazeError::missing(&self.filename, "gaze_position"))?
            .complete(&self.filename, "gaze_position")
    }

    pub fn camera_screen_offset(&self) -> Result<GazePoint, GazeError> {
        self.camera_screen_offset
            .as_ref()
            .ok_or_else(|| GazeError::missing(&self.filename, "camera_screen_center_offset"))?
            .complete(&self.filename, "camera_screen_center_offset")
    }

    /// Training label: gaze target shifted by the camera/screen offset.
    pub fn label(&self) -> Result<GazePoint, GazeError> {
        Ok(self.gaze()? + self.camera_screen_offset()?)
    }

    pub fn head_distance(&self) -> Result<f64, GazeError> {
        self.head
            .and_then(|head| head.distance)
            .ok_or_else(|| GazeError::missing(&self.filename, "head_camera_distance"))
    }

    pub fn region(&self, name: &str) -> Result<RegionBox, GazeError> {
        self.regions
            .get(name)
            .copied()
            .ok_or_else(|| GazeError::missing(&self.filename, name))
    }
}
