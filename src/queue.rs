//! The ordered sequence of `(task, env)` pairs a pipeline walks.

use std::collections::HashSet;
use std::sync::Arc;

use crate::env::EnvDefinition;
use crate::error::QueueError;
use crate::task::BuildTask;

/// A task scheduled to run under one environment.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub task: Arc<BuildTask>,
    pub env: EnvDefinition,
}

/// Tasks in execution order.
///
/// The order is decided by an external scheduler, which places every task
/// after the tasks it depends on. The pipeline trusts this order and never
/// reorders entries.
#[derive(Debug, Clone, Default)]
pub struct TaskQueue {
    entries: Vec<QueueEntry>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: Arc<BuildTask>, env: EnvDefinition) {
        self.entries.push(QueueEntry { task, env });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueueEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    /// Checks the order produced by the scheduler: no `(task, env)` pair is
    /// queued twice, and within an environment no task is queued before a
    /// task it depends on.
    pub fn validate(&self) -> Result<(), QueueError> {
        let mut seen = HashSet::new();

        for (index, entry) in self.entries.iter().enumerate() {
            if !seen.insert((entry.task.id(), entry.env.id.as_str())) {
                return Err(QueueError::Duplicate {
                    task: entry.task.id().clone(),
                    env: entry.env.id.clone(),
                });
            }

            let later = self.entries[index + 1..]
                .iter()
                .filter(|other| other.env.id == entry.env.id);

            for other in later {
                if entry
                    .task
                    .dependencies()
                    .iter()
                    .any(|selector| selector.matches(other.task.id()))
                {
                    return Err(QueueError::DependencyOrder {
                        task: entry.task.id().clone(),
                        dependency: other.task.id().clone(),
                        env: entry.env.id.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

impl<'a> IntoIterator for &'a TaskQueue {
    type Item = &'a QueueEntry;
    type IntoIter = std::slice::Iter<'a, QueueEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<(Arc<BuildTask>, EnvDefinition)> for TaskQueue {
    fn from_iter<T: IntoIterator<Item = (Arc<BuildTask>, EnvDefinition)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(task, env)| QueueEntry { task, env })
                .collect(),
        }
    }
}
