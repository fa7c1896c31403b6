//! Annotation records and the XML reader that produces them.

pub mod io_xml;
mod model;

pub use io_xml::{read_annotation_dir, read_annotation_file};
pub use model::{
    AnnotationRecord, GazePoint, HeadPose, PartialPoint, RegionBox, ScreenSize, REGION_FACE,
    REGION_LEFT_EYE, REGION_RIGHT_EYE,
};
