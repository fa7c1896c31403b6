//! Fuzz target for gaze annotation XML parsing.
//!
//! This fuzzer feeds arbitrary byte sequences to the annotation parser,
//! checking for panics, crashes, or hangs. Parsed records are also pushed
//! through task indexing and label access.

#![no_main]

use gazeshot::annotation::io_xml::from_annotation_slice;
use gazeshot::index::DatasetIndex;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Cap input size to avoid excessive memory usage.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(records) = from_annotation_slice(data) {
        for record in &records {
            let _ = record.label();
        }
        let _ = DatasetIndex::build(&records, 1);
    }
});
