//! Task grouping and the train/test split.
//!
//! Records are grouped by their task id in a single forward pass. Task
//! positions follow first-seen order, and each group keeps its records in
//! discovery order. The trailing `K` groups form the test partition.

mod report;

pub use report::{IndexReport, TaskSummary};

use std::collections::HashMap;

use serde::Serialize;

use crate::annotation::AnnotationRecord;
use crate::error::GazeError;

/// The records of one task, as global record indices.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TaskGroup {
    pub task_id: String,
    pub indices: Vec<usize>,
}

impl TaskGroup {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Sizes of the train and test partitions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Split {
    /// Number of task groups held out (clamped to the task count).
    pub reserved_tasks: usize,
    pub train_len: usize,
    pub test_len: usize,
    /// First global index of the test range, `total - test_len`.
    pub offset: usize,
}

impl Split {
    fn compute(groups: &[TaskGroup], total: usize, reserved_tasks: usize) -> Self {
        let reserved_tasks = reserved_tasks.min(groups.len());
        let test_len: usize = groups[groups.len() - reserved_tasks..]
            .iter()
            .map(TaskGroup::len)
            .sum();

        Split {
            reserved_tasks,
            train_len: total - test_len,
            test_len,
            offset: total - test_len,
        }
    }

    /// Train length as reported to callers.
    ///
    /// With `fallback` set, an empty train partition reports the test length
    /// instead, so iteration still covers the reserved tasks.
    pub fn effective_train_len(&self, fallback: bool) -> usize {
        if fallback && self.train_len == 0 {
            self.test_len
        } else {
            self.train_len
        }
    }

    /// Map a test-relative index onto its global record index.
    pub fn remap_test(&self, index: usize) -> Result<usize, GazeError> {
        if self.test_len == 0 {
            return Err(GazeError::EmptyTestPartition);
        }
        Ok(index % self.test_len + self.offset)
    }
}

/// Immutable task lookup built once from parsed records.
#[derive(Clone, Debug, Default)]
pub struct DatasetIndex {
    groups: Vec<TaskGroup>,
    positions: HashMap<String, usize>,
    total: usize,
    split: Split,
}

impl DatasetIndex {
    /// Group `records` by task id and reserve the last `reserved_test_tasks`
    /// groups for testing.
    ///
    /// Every record must carry a task id.
    pub fn build(
        records: &[AnnotationRecord],
        reserved_test_tasks: usize,
    ) -> Result<Self, GazeError> {
        let mut groups: Vec<TaskGroup> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for (idx, record) in records.iter().enumerate() {
            let task_id = record.task_id()?;
            let position = match positions.get(task_id) {
                Some(position) => *position,
                None => {
                    groups.push(TaskGroup {
                        task_id: task_id.to_string(),
                        indices: Vec::new(),
                    });
                    positions.insert(task_id.to_string(), groups.len() - 1);
                    groups.len() - 1
                }
            };
            groups[position].indices.push(idx);
        }

        let split = Split::compute(&groups, records.len(), reserved_test_tasks);

        Ok(Self {
            groups,
            positions,
            total: records.len(),
            split,
        })
    }

    /// Number of distinct tasks.
    pub fn task_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of records of the task at `task`.
    pub fn sample_count(&self, task: usize) -> Result<usize, GazeError> {
        self.task(task).map(TaskGroup::len)
    }

    pub fn task(&self, task: usize) -> Result<&TaskGroup, GazeError> {
        self.groups.get(task).ok_or(GazeError::TaskOutOfRange {
            index: task,
            count: self.groups.len(),
        })
    }

    pub fn task_id(&self, task: usize) -> Result<&str, GazeError> {
        self.task(task).map(|group| group.task_id.as_str())
    }

    /// Position of a task id in discovery order.
    pub fn position_of(&self, task_id: &str) -> Option<usize> {
        self.positions.get(task_id).copied()
    }

    /// Task groups in discovery order.
    pub fn tasks(&self) -> &[TaskGroup] {
        &self.groups
    }

    /// Total number of indexed records.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn split(&self) -> Split {
        self.split
    }

    pub fn train_len(&self) -> usize {
        self.split.train_len
    }

    pub fn test_len(&self) -> usize {
        self.split.test_len
    }

    pub fn offset(&self) -> usize {
        self.split.offset
    }
}
