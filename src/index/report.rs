//! Human- and machine-readable summary of a dataset index.

use std::fmt;

use serde::Serialize;

use super::{DatasetIndex, Split};

/// Summary of one task group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub position: usize,
    pub task_id: String,
    pub samples: usize,
    /// True if the task belongs to the test partition.
    pub reserved: bool,
}

/// Task table plus split sizes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub records: usize,
    pub tasks: Vec<TaskSummary>,
    pub split: Split,
}

impl IndexReport {
    pub fn from_index(index: &DatasetIndex) -> Self {
        let split = index.split();
        let first_reserved = index.task_count() - split.reserved_tasks;

        let tasks = index
            .tasks()
            .iter()
            .enumerate()
            .map(|(position, group)| TaskSummary {
                position,
                task_id: group.task_id.clone(),
                samples: group.len(),
                reserved: position >= first_reserved,
            })
            .collect();

        Self {
            records: index.total(),
            tasks,
            split,
        }
    }
}

impl fmt::Display for IndexReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} record(s) in {} task(s)",
            self.records,
            self.tasks.len()
        )?;
        writeln!(f)?;

        for task in &self.tasks {
            let marker = if task.reserved { " [test]" } else { "" };
            writeln!(
                f,
                "  {:>3}  {}: {} sample(s){}",
                task.position, task.task_id, task.samples, marker
            )?;
        }

        writeln!(f)?;
        writeln!(
            f,
            "Split: train {} / test {} (offset {}, {} reserved task(s))",
            self.split.train_len, self.split.test_len, self.split.offset, self.split.reserved_tasks
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationRecord;

    #[test]
    fn marks_reserved_tasks() {
        let records: Vec<_> = ["a", "a", "b"]
            .iter()
            .map(|task| {
                let mut record = AnnotationRecord::new("img");
                record.task_id = Some(task.to_string());
                record
            })
            .collect();
        let index = DatasetIndex::build(&records, 1).expect("build");
        let report = IndexReport::from_index(&index);

        assert!(!report.tasks[0].reserved);
        assert!(report.tasks[1].reserved);

        let text = report.to_string();
        assert!(text.contains("3 record(s) in 2 task(s)"));
        assert!(text.contains("b: 1 sample(s) [test]"));
        assert!(text.contains("Split: train 2 / test 1"));
    }
}
