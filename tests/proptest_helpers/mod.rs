#![allow(dead_code)]

use gazeshot::annotation::{AnnotationRecord, PartialPoint};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// A complete record of task `task` with the given gaze.
pub fn record(idx: usize, task: usize, gaze: (f64, f64)) -> AnnotationRecord {
    let mut record = AnnotationRecord::new(format!("img_{idx:04}"));
    record.task_id = Some(format!("task_{task}"));
    record.gaze = Some(PartialPoint {
        x: Some(gaze.0),
        y: Some(gaze.1),
    });
    record.camera_screen_offset = Some(PartialPoint {
        x: Some(0.0),
        y: Some(0.0),
    });
    record
}

/// Records whose task ids are drawn from `0..max_tasks`, interleaved freely.
pub fn arb_records(max_tasks: usize, max_records: usize) -> BoxedStrategy<Vec<AnnotationRecord>> {
    prop::collection::vec(0..max_tasks, 1..=max_records)
        .prop_map(|tasks| {
            tasks
                .into_iter()
                .enumerate()
                .map(|(idx, task)| record(idx, task, (0.0, 0.0)))
                .collect()
        })
        .boxed()
}

/// Finite gaze coordinates in a screen-sized range.
pub fn arb_coordinate() -> impl Strategy<Value = f64> {
    -1.0e3f64..1.0e3
}
