//! Gaze annotation XML reader.
//!
//! Annotation files follow a VOC-like layout with an extra `<data>` block:
//!
//! ```xml
//! <annotation>
//!   <filename>frame_0001</filename>
//!   <size><width>640</width><height>480</height></size>
//!   <data>
//!     <model>subject_a</model>
//!     <gaze_position><x>0.10</x><y>0.05</y></gaze_position>
//!     <camera_screen_center_offset><x>0.0</x><y>0.01</y></camera_screen_center_offset>
//!   </data>
//!   <object>
//!     <name>face</name>
//!     <bndbox><xmin>10</xmin><ymin>20</ymin><xmax>200</xmax><ymax>240</ymax></bndbox>
//!   </object>
//! </annotation>
//! ```
//!
//! Tags are recognised through suffix lookup tables on the lowercased local
//! name, so exporter-specific prefixes (`ns:filename`, `cam_gaze_position`)
//! resolve to the same fields. Every `<filename>` opens a new record and the
//! fields that follow belong to it. Fields seen before the first `<filename>`
//! of a file are held until that filename names them.

use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::Node;
use tracing::debug;
use walkdir::WalkDir;

use super::model::{AnnotationRecord, HeadPose, PartialPoint, RegionBox, ScreenSize};
use crate::error::GazeError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RecordField {
    Filename,
    Width,
    Height,
    Data,
    Object,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DataField {
    Model,
    Gaze,
    Screen,
    CameraOffset,
    Head,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Extent {
    Width,
    Height,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ObjectField {
    Name,
    BndBox,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Corner {
    XMin,
    YMin,
    XMax,
    YMax,
}

// Longer suffixes first where one suffix ends another.
const RECORD_FIELDS: &[(&str, RecordField)] = &[
    ("filename", RecordField::Filename),
    ("width", RecordField::Width),
    ("height", RecordField::Height),
    ("data", RecordField::Data),
    ("object", RecordField::Object),
];

const DATA_FIELDS: &[(&str, DataField)] = &[
    ("model", DataField::Model),
    ("gaze_position", DataField::Gaze),
    ("screen_size", DataField::Screen),
    ("camera_screen_center_offset", DataField::CameraOffset),
    ("camera_screen_offset", DataField::CameraOffset),
    ("head", DataField::Head),
];

const AXIS_FIELDS: &[(&str, Axis)] = &[("x", Axis::X), ("y", Axis::Y)];

const EXTENT_FIELDS: &[(&str, Extent)] =
    &[("width", Extent::Width), ("height", Extent::Height)];

const HEAD_FIELDS: &[(&str, ())] = &[("distance", ())];

const OBJECT_FIELDS: &[(&str, ObjectField)] = &[
    ("name", ObjectField::Name),
    ("bndbox", ObjectField::BndBox),
];

const CORNER_FIELDS: &[(&str, Corner)] = &[
    ("xmin", Corner::XMin),
    ("ymin", Corner::YMin),
    ("xmax", Corner::XMax),
    ("ymax", Corner::YMax),
];

/// Read every annotation file of a directory, in directory listing order.
///
/// Every regular file is parsed whatever its extension; subdirectories are
/// not entered. Each file may contribute one or more records. Any malformed
/// file aborts the whole read.
pub fn read_annotation_dir(dir: &Path) -> Result<Vec<AnnotationRecord>, GazeError> {
    let files = collect_annotation_files(dir)?;
    let total = files.len();

    let mut records = Vec::with_capacity(total);
    for (idx, path) in files.iter().enumerate() {
        debug!(
            file = %path.display(),
            "loading annotations: {:.1} %",
            idx as f64 / total as f64 * 100.0
        );
        records.extend(read_annotation_file(path)?);
    }

    Ok(records)
}

/// Read the records of a single annotation file.
pub fn read_annotation_file(path: &Path) -> Result<Vec<AnnotationRecord>, GazeError> {
    let xml = fs::read_to_string(path).map_err(GazeError::Io)?;
    parse_annotation_str(&xml, path)
}

/// Parse annotation XML from a UTF-8 string.
pub fn from_annotation_str(xml: &str) -> Result<Vec<AnnotationRecord>, GazeError> {
    parse_annotation_str(xml, Path::new("<memory>"))
}

/// Parse annotation XML from bytes.
///
/// The input must be valid UTF-8.
pub fn from_annotation_slice(bytes: &[u8]) -> Result<Vec<AnnotationRecord>, GazeError> {
    let xml = std::str::from_utf8(bytes).map_err(|source| GazeError::AnnotationParse {
        path: PathBuf::from("<memory>"),
        message: format!("input is not valid UTF-8: {source}"),
    })?;
    from_annotation_str(xml)
}

fn collect_annotation_files(dir: &Path) -> Result<Vec<PathBuf>, GazeError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| GazeError::AnnotationParse {
            path: dir.to_path_buf(),
            message: format!("failed while listing annotation directory: {source}"),
        })?;

        if entry.file_type().is_file() {
            files.push(entry.into_path());
        } else {
            debug!(path = %entry.path().display(), "skipping non-file entry");
        }
    }

    Ok(files)
}

fn parse_annotation_str(xml: &str, path: &Path) -> Result<Vec<AnnotationRecord>, GazeError> {
    let document = roxmltree::Document::parse(xml).map_err(|source| parse_error(path, source))?;

    let mut records = RecordBuilder::default();
    visit(document.root_element(), path, &mut records)?;
    records.finish(path)
}

/// Records of one file, with the record still receiving fields kept open.
///
/// An open record with an empty filename has not seen its `<filename>` yet;
/// `required_text` never yields an empty name.
#[derive(Default)]
struct RecordBuilder {
    done: Vec<AnnotationRecord>,
    open: Option<AnnotationRecord>,
}

impl RecordBuilder {
    fn start(&mut self, filename: String) {
        if let Some(record) = self.open.as_mut().filter(|r| r.filename.is_empty()) {
            record.filename = filename;
            return;
        }
        if let Some(previous) = self.open.replace(AnnotationRecord::new(filename)) {
            self.done.push(previous);
        }
    }

    fn current(&mut self) -> &mut AnnotationRecord {
        self.open.get_or_insert_with(|| AnnotationRecord::new(String::new()))
    }

    fn finish(mut self, path: &Path) -> Result<Vec<AnnotationRecord>, GazeError> {
        if let Some(record) = self.open {
            if record.filename.is_empty() {
                return Err(GazeError::AnnotationParse {
                    path: path.to_path_buf(),
                    message: "annotation fields found but no <filename>".to_string(),
                });
            }
            self.done.push(record);
        }
        Ok(self.done)
    }
}

fn visit(node: Node<'_, '_>, path: &Path, records: &mut RecordBuilder) -> Result<(), GazeError> {
    match lookup(RECORD_FIELDS, node) {
        Some(RecordField::Filename) => records.start(required_text(node, path)?),
        Some(RecordField::Width) => {
            records.current().width = Some(parse_dimension(node, path)?);
        }
        Some(RecordField::Height) => {
            records.current().height = Some(parse_dimension(node, path)?);
        }
        Some(RecordField::Data) => read_data(node, records.current(), path)?,
        Some(RecordField::Object) => read_object(node, records.current(), path)?,
        None => {
            for child in node.children().filter(Node::is_element) {
                visit(child, path, records)?;
            }
        }
    }

    Ok(())
}

fn read_data(
    data: Node<'_, '_>,
    record: &mut AnnotationRecord,
    path: &Path,
) -> Result<(), GazeError> {
    for child in data.children().filter(Node::is_element) {
        match lookup(DATA_FIELDS, child) {
            Some(DataField::Model) => record.task_id = optional_text(child),
            Some(DataField::Gaze) => record.gaze = Some(read_point(child, path)?),
            Some(DataField::Screen) => record.screen = Some(read_screen(child, path)?),
            Some(DataField::CameraOffset) => {
                record.camera_screen_offset = Some(read_point(child, path)?)
            }
            Some(DataField::Head) => record.head = Some(read_head(child, path)?),
            None => {}
        }
    }

    Ok(())
}

fn read_point(node: Node<'_, '_>, path: &Path) -> Result<PartialPoint, GazeError> {
    let mut point = PartialPoint::default();
    for child in node.children().filter(Node::is_element) {
        match lookup(AXIS_FIELDS, child) {
            Some(Axis::X) => point.x = Some(parse_f64(child, path)?),
            Some(Axis::Y) => point.y = Some(parse_f64(child, path)?),
            None => {}
        }
    }
    Ok(point)
}

fn read_screen(node: Node<'_, '_>, path: &Path) -> Result<ScreenSize, GazeError> {
    let mut screen = ScreenSize::default();
    for child in node.children().filter(Node::is_element) {
        match lookup(EXTENT_FIELDS, child) {
            Some(Extent::Width) => screen.width = Some(parse_f64(child, path)?),
            Some(Extent::Height) => screen.height = Some(parse_f64(child, path)?),
            None => {}
        }
    }
    Ok(screen)
}

fn read_head(node: Node<'_, '_>, path: &Path) -> Result<HeadPose, GazeError> {
    let mut head = HeadPose::default();
    for child in node.children().filter(Node::is_element) {
        if lookup(HEAD_FIELDS, child).is_some() {
            head.distance = Some(parse_f64(child, path)?);
        }
    }
    Ok(head)
}

/// Objects without a name are dropped; a missing `<bndbox>` or corner reads as 0.
fn read_object(
    object: Node<'_, '_>,
    record: &mut AnnotationRecord,
    path: &Path,
) -> Result<(), GazeError> {
    let mut name = None;
    let mut bbox = RegionBox::default();

    for child in object.children().filter(Node::is_element) {
        match lookup(OBJECT_FIELDS, child) {
            Some(ObjectField::Name) => name = optional_text(child),
            Some(ObjectField::BndBox) => {
                for corner in child.children().filter(Node::is_element) {
                    match lookup(CORNER_FIELDS, corner) {
                        Some(Corner::XMin) => bbox.xmin = parse_f64(corner, path)?,
                        Some(Corner::YMin) => bbox.ymin = parse_f64(corner, path)?,
                        Some(Corner::XMax) => bbox.xmax = parse_f64(corner, path)?,
                        Some(Corner::YMax) => bbox.ymax = parse_f64(corner, path)?,
                        None => {}
                    }
                }
            }
            None => {}
        }
    }

    if let Some(name) = name {
        record.regions.insert(name, bbox);
    }

    Ok(())
}

fn lookup<T: Copy>(table: &[(&str, T)], node: Node<'_, '_>) -> Option<T> {
    let tag = node.tag_name().name().to_ascii_lowercase();
    table
        .iter()
        .find(|(suffix, _)| tag.ends_with(suffix))
        .map(|(_, field)| *field)
}

fn optional_text(node: Node<'_, '_>) -> Option<String> {
    node.text()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
}

fn required_text(node: Node<'_, '_>, path: &Path) -> Result<String, GazeError> {
    optional_text(node).ok_or_else(|| GazeError::AnnotationParse {
        path: path.to_path_buf(),
        message: format!("empty <{}>", node.tag_name().name()),
    })
}

/// `NaN` and infinities parse as `f64` but are rejected.
fn parse_f64(node: Node<'_, '_>, path: &Path) -> Result<f64, GazeError> {
    let raw = required_text(node, path)?;
    let value = raw.parse::<f64>().map_err(|_| GazeError::AnnotationParse {
        path: path.to_path_buf(),
        message: format!(
            "invalid <{}> value '{raw}'; expected floating-point number",
            node.tag_name().name()
        ),
    })?;
    if !value.is_finite() {
        return Err(GazeError::AnnotationParse {
            path: path.to_path_buf(),
            message: format!("non-finite <{}> value '{raw}'", node.tag_name().name()),
        });
    }
    Ok(value)
}

/// Dimensions may be written as floats (`480.0`); the fractional part is dropped.
fn parse_dimension(node: Node<'_, '_>, path: &Path) -> Result<u32, GazeError> {
    let value = parse_f64(node, path)?;
    if value < 0.0 || value > u32::MAX as f64 {
        return Err(GazeError::AnnotationParse {
            path: path.to_path_buf(),
            message: format!(
                "invalid <{}> value '{value}'; expected a non-negative size",
                node.tag_name().name()
            ),
        });
    }
    Ok(value.trunc() as u32)
}

fn parse_error(path: &Path, source: roxmltree::Error) -> GazeError {
    GazeError::AnnotationParse {
        path: path.to_path_buf(),
        message: source.to_string(),
    }
}
