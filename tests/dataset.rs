use std::path::Path;

use gazeshot::annotation::{read_annotation_dir, read_annotation_file, AnnotationRecord};
use gazeshot::loader::BASE_CHANNELS;
use gazeshot::{DatasetConfig, GazeDataset, GazeError, TensorPipeline};
use rand::{rngs::StdRng, SeedableRng};

mod common;

use common::{two_task_frames, write_annotations, write_corrupt_png, write_images};

/// Records of the two-task layout, read file by file in a fixed order.
fn ordered_records(annotation_dir: &Path) -> Vec<AnnotationRecord> {
    ["a0", "a1", "b0"]
        .iter()
        .flat_map(|name| {
            read_annotation_file(&annotation_dir.join(format!("{name}.xml")))
                .expect("read annotation")
        })
        .collect()
}

fn fixture(config: impl FnOnce(&mut DatasetConfig)) -> (tempfile::TempDir, GazeDataset) {
    let temp = tempfile::tempdir().expect("create temp dir");
    let images = temp.path().join("images");
    let annotations = temp.path().join("annotations");
    let frames = two_task_frames();
    write_annotations(&annotations, &frames);
    write_images(&images, &frames);

    let mut cfg = DatasetConfig::new(&images, &annotations);
    cfg.width = 16;
    cfg.height = 12;
    config(&mut cfg);

    let records = ordered_records(&annotations);
    let dataset =
        GazeDataset::from_records(cfg, records, TensorPipeline::plain()).expect("build dataset");
    (temp, dataset)
}

#[test]
fn two_task_split_reserves_the_last_task() {
    let (_temp, dataset) = fixture(|_| {});
    let index = dataset.index();

    assert_eq!(index.task_count(), 2);
    assert_eq!(index.task_id(0).expect("task 0"), "A");
    assert_eq!(index.task(0).expect("task 0").indices, vec![0, 1]);
    assert_eq!(index.task(1).expect("task 1").indices, vec![2]);
    assert_eq!(index.test_len(), 1);
    assert_eq!(index.train_len(), 2);
    assert_eq!(index.offset(), 2);
    assert_eq!(dataset.len(), 2);
}

#[test]
fn get_maps_indices_per_mode() {
    let (_temp, mut dataset) = fixture(|_| {});
    let mut rng = StdRng::seed_from_u64(7);

    let train = dataset.get(0, &mut rng).expect("train sample");
    assert_eq!(train.index, 0);
    assert_eq!(train.label, [0.1 + 0.5, 0.2 + -0.25]);
    assert_eq!(train.image.shape(), &[BASE_CHANNELS, 12, 16]);

    dataset.set_testing(true);
    assert_eq!(dataset.len(), 1);
    let test = dataset.get(0, &mut rng).expect("test sample");
    assert_eq!(test.index, 2);
    assert_eq!(test.label, [-0.6 + 0.125, 0.7 + 0.0]);

    let wrapped = dataset.get(1, &mut rng).expect("wrapped test sample");
    assert_eq!(wrapped.index, 2);
}

#[test]
fn pixel_values_are_scaled_into_unit_range() {
    let (_temp, dataset) = fixture(|_| {});
    let sample = dataset
        .get(1, &mut StdRng::seed_from_u64(8))
        .expect("sample");
    assert!(sample.image.iter().all(|v| (0.0..=1.0).contains(v)));
}

#[test]
fn stacking_triples_channel_depth() {
    let (_temp, dataset) = fixture(|cfg| cfg.stacking = true);
    let sample = dataset
        .get(0, &mut StdRng::seed_from_u64(9))
        .expect("stacked sample");
    assert_eq!(sample.image.shape(), &[3 * BASE_CHANNELS, 12, 16]);
}

#[test]
fn stacking_with_halved_regions_and_face_anchor() {
    let (_temp, dataset) = fixture(|cfg| {
        cfg.stacking = true;
        cfg.halve_regions = true;
        cfg.random_crop = false;
        cfg.stack_anchor = gazeshot::StackAnchor::Face;
    });
    let sample = dataset
        .get(1, &mut StdRng::seed_from_u64(10))
        .expect("stacked sample");
    assert_eq!(sample.image.shape(), &[3 * BASE_CHANNELS, 12, 16]);
}

#[test]
fn corrupt_image_probes_to_the_next_record() {
    let (temp, dataset) = fixture(|_| {});
    write_corrupt_png(&temp.path().join("images").join("a0.png"));

    let sample = dataset
        .get(0, &mut StdRng::seed_from_u64(11))
        .expect("probed sample");
    assert_eq!(sample.index, 1);
    assert_eq!(sample.label, [0.3, 0.4]);
}

#[test]
fn exhausted_probe_is_reported() {
    let (temp, dataset) = fixture(|_| {});
    std::fs::remove_file(temp.path().join("images").join("b0.png")).expect("remove image");

    let err = dataset
        .get_record(2, &mut StdRng::seed_from_u64(12))
        .expect_err("no image left to probe");
    assert!(matches!(
        err,
        GazeError::ImageUnavailable {
            index: 2,
            attempts: 1
        }
    ));
}

#[test]
fn seeded_loads_are_reproducible() {
    let (_temp, dataset) = fixture(|cfg| cfg.stacking = true);
    let first = dataset
        .get(0, &mut StdRng::seed_from_u64(13))
        .expect("first load");
    let second = dataset
        .get(0, &mut StdRng::seed_from_u64(13))
        .expect("second load");
    assert_eq!(first, second);
}

#[test]
fn open_reads_the_annotation_directory() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let frames = two_task_frames();
    write_annotations(&temp.path().join("annotations"), &frames);
    write_images(&temp.path().join("images"), &frames);

    let config = DatasetConfig::new(temp.path().join("images"), temp.path().join("annotations"));
    let dataset = GazeDataset::open(config, TensorPipeline::plain()).expect("open dataset");

    assert_eq!(dataset.records().len(), 3);
    assert_eq!(dataset.index().task_count(), 2);
    assert_eq!(
        read_annotation_dir(&temp.path().join("annotations"))
            .expect("read dir")
            .len(),
        3
    );
}

#[test]
fn testing_mode_without_reserved_tasks_fails() {
    let (_temp, mut dataset) = fixture(|cfg| cfg.reserved_test_tasks = 0);
    dataset.set_testing(true);
    assert!(matches!(
        dataset.get(0, &mut StdRng::seed_from_u64(14)),
        Err(GazeError::EmptyTestPartition)
    ));
}

#[test]
fn empty_train_partition_falls_back_behind_flag() {
    let (_temp, dataset) = fixture(|cfg| cfg.reserved_test_tasks = 2);
    assert_eq!(dataset.index().train_len(), 0);
    assert_eq!(dataset.len(), 3);

    let (_temp, strict) = fixture(|cfg| {
        cfg.reserved_test_tasks = 2;
        cfg.empty_train_fallback = false;
    });
    assert_eq!(strict.len(), 0);
    assert!(strict.is_empty());
}
