#![allow(dead_code)]

use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};

pub const BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);
pub const SKIN: Rgb<u8> = Rgb([200, 150, 120]);

/// One annotated frame of a fixture dataset.
#[derive(Clone, Debug)]
pub struct Frame {
    pub filename: String,
    pub task: String,
    pub gaze: (f64, f64),
    pub offset: (f64, f64),
    pub head_distance: f64,
}

impl Frame {
    pub fn new(filename: &str, task: &str, gaze: (f64, f64)) -> Self {
        Self {
            filename: filename.to_string(),
            task: task.to_string(),
            gaze,
            offset: (0.0, 0.0),
            head_distance: 0.5,
        }
    }

    pub fn with_offset(mut self, offset: (f64, f64)) -> Self {
        self.offset = offset;
        self
    }
}

/// `<annotation>` block for `frame`, with face and eye regions for a 32x32 image.
pub fn annotation_xml(frame: &Frame) -> String {
    format!(
        r#"<annotation>
  <filename>{filename}</filename>
  <size><width>32</width><height>32</height></size>
  <data>
    <model>{task}</model>
    <gaze_position><x>{gx}</x><y>{gy}</y></gaze_position>
    <camera_screen_center_offset><x>{ox}</x><y>{oy}</y></camera_screen_center_offset>
    <head><distance>{distance}</distance></head>
  </data>
  <object><name>face</name><bndbox><xmin>4</xmin><ymin>4</ymin><xmax>28</xmax><ymax>28</ymax></bndbox></object>
  <object><name>reye</name><bndbox><xmin>8</xmin><ymin>10</ymin><xmax>14</xmax><ymax>14</ymax></bndbox></object>
  <object><name>leye</name><bndbox><xmin>18</xmin><ymin>10</ymin><xmax>24</xmax><ymax>14</ymax></bndbox></object>
</annotation>
"#,
        filename = &frame.filename,
        task = &frame.task,
        gx = frame.gaze.0,
        gy = frame.gaze.1,
        ox = frame.offset.0,
        oy = frame.offset.1,
        distance = frame.head_distance,
    )
}

/// Write one annotation file per frame into `dir`, named after the frame.
pub fn write_annotations(dir: &Path, frames: &[Frame]) {
    fs::create_dir_all(dir).expect("create annotation dir");
    for frame in frames {
        let path = dir.join(format!("{}.xml", frame.filename));
        fs::write(path, annotation_xml(frame)).expect("write annotation");
    }
}

/// 32x32 face-like image: flat background with a filled square in the middle.
pub fn face_image() -> RgbImage {
    RgbImage::from_fn(32, 32, |x, y| {
        if (4..28).contains(&x) && (4..28).contains(&y) {
            SKIN
        } else {
            BACKGROUND
        }
    })
}

pub fn write_png(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    face_image().save(path).expect("write png file");
}

/// Write a decodable PNG for every frame into `dir`.
pub fn write_images(dir: &Path, frames: &[Frame]) {
    for frame in frames {
        write_png(&dir.join(format!("{}.png", frame.filename)));
    }
}

/// Write a `.png` file that no decoder accepts.
pub fn write_corrupt_png(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, b"not a png at all").expect("write corrupt file");
}

/// The two-task layout used across tests: `A -> {a0, a1}`, `B -> {b0}`.
pub fn two_task_frames() -> Vec<Frame> {
    vec![
        Frame::new("a0", "A", (0.1, 0.2)).with_offset((0.5, -0.25)),
        Frame::new("a1", "A", (0.3, 0.4)),
        Frame::new("b0", "B", (-0.6, 0.7)).with_offset((0.125, 0.0)),
    ]
}

/// `count` frames of `task` named `<task>_<i>`, with gaze `(i, -i)`.
pub fn task_frames(task: &str, count: usize) -> Vec<Frame> {
    (0..count)
        .map(|i| Frame::new(&format!("{task}_{i}"), task, (i as f64, -(i as f64))))
        .collect()
}
