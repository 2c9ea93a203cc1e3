//! Task outcomes and the queryable ledger of a pipeline run.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt::{Display, Write};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use serde_json::Value;

use crate::artifact::{ArtifactList, ArtifactMap};
use crate::component::ComponentId;
use crate::env::EnvDefinition;
use crate::error::PipelineError;
use crate::queue::{QueueEntry, TaskQueue};
use crate::report::Reporter;
use crate::task::{BuildTask, TaskId};

/// Outcome of one task for one component.
///
/// A component with at least one error is considered failed for that task.
#[derive(Debug)]
pub struct ComponentResult {
    pub component: ComponentId,
    pub errors: Vec<anyhow::Error>,
    pub warnings: Vec<String>,
    /// Arbitrary data the task wants to persist for the component.
    pub metadata: Option<Value>,
    pub start_time: Option<SystemTime>,
    pub end_time: Option<SystemTime>,
}

impl ComponentResult {
    pub fn new(component: ComponentId) -> Self {
        Self {
            component,
            errors: Vec::new(),
            warnings: Vec::new(),
            metadata: None,
            start_time: None,
            end_time: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<anyhow::Error>) -> Self {
        self.errors.push(error.into());
        self
    }

    pub fn with_error_message<M>(mut self, message: M) -> Self
    where
        M: Display + std::fmt::Debug + Send + Sync + 'static,
    {
        self.errors.push(anyhow::Error::msg(message));
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_timing(mut self, start: SystemTime, end: SystemTime) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Outcome of one `(task, env)` execution.
///
/// Created once when the task completes, never mutated afterwards. The
/// artifacts are present exactly when no component reported an error.
#[derive(Debug)]
pub struct TaskResults {
    pub task: Arc<BuildTask>,
    pub env: EnvDefinition,
    pub components_results: Vec<ComponentResult>,
    pub artifacts: Option<ArtifactMap>,
    pub start_time: SystemTime,
    pub end_time: SystemTime,
}

impl TaskResults {
    pub fn task_id(&self) -> &TaskId {
        self.task.id()
    }

    pub fn is_failed(&self) -> bool {
        self.components_results
            .iter()
            .any(ComponentResult::has_errors)
    }

    pub fn failed_components(&self) -> impl Iterator<Item = &ComponentResult> {
        self.components_results
            .iter()
            .filter(|result| result.has_errors())
    }

    pub fn component(&self, id: &ComponentId) -> Option<&ComponentResult> {
        self.components_results
            .iter()
            .find(|result| result.component == *id)
    }

    pub fn duration(&self) -> Duration {
        self.end_time
            .duration_since(self.start_time)
            .unwrap_or_default()
    }
}

/// One line of a component's build history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub task_id: String,
    pub task_name: String,
    pub task_description: Option<String>,
    pub env_id: String,
    /// Milliseconds since the Unix epoch.
    pub start_time: u64,
    pub end_time: u64,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

fn epoch_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|since| since.as_millis() as u64)
        .unwrap_or_default()
}

/// Read-only view over every result of a run, in queue order.
///
/// Tasks that were skipped in this run have no entry; looking them up yields
/// `None`, even when a chained previous run produced a result for them.
pub struct TaskResultsList {
    queue: TaskQueue,
    results: Vec<Arc<TaskResults>>,
    /// Indices into `queue` of the entries skipped in this run.
    skipped: Vec<usize>,
    capsule_root_dir: Option<Utf8PathBuf>,
    reporter: Arc<dyn Reporter>,
}

impl TaskResultsList {
    pub fn new(
        queue: TaskQueue,
        results: Vec<Arc<TaskResults>>,
        skipped: Vec<usize>,
        capsule_root_dir: Option<Utf8PathBuf>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            queue,
            results,
            skipped,
            capsule_root_dir,
            reporter,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskResults> {
        self.results.iter().map(|result| &**result)
    }

    /// The shared results, ready to be chained into another run.
    pub fn tasks_results(&self) -> &[Arc<TaskResults>] {
        &self.results
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn capsule_root_dir(&self) -> Option<&Utf8Path> {
        self.capsule_root_dir.as_deref()
    }

    /// The latest result of `task` under `env_id`, or `None` when the task
    /// was skipped in this run.
    pub fn get(&self, task: &TaskId, env_id: &str) -> Option<&TaskResults> {
        if self.is_skipped(task, env_id) {
            return None;
        }

        self.results
            .iter()
            .rev()
            .find(|result| result.task_id() == task && result.env.id == env_id)
            .map(|result| &**result)
    }

    pub fn by_task<'a>(&'a self, task: &'a TaskId) -> impl Iterator<Item = &'a TaskResults> {
        self.iter().filter(move |result| result.task_id() == task)
    }

    pub fn by_env<'a>(&'a self, env_id: &'a str) -> impl Iterator<Item = &'a TaskResults> {
        self.iter().filter(move |result| result.env.id == env_id)
    }

    /// Queue entries skipped in this run, in queue order.
    pub fn skipped(&self) -> impl Iterator<Item = &QueueEntry> {
        self.skipped
            .iter()
            .filter_map(|&index| self.queue.entries().get(index))
    }

    pub fn is_skipped(&self, task: &TaskId, env_id: &str) -> bool {
        self.skipped()
            .any(|entry| entry.task.id() == task && entry.env.id == env_id)
    }

    pub fn has_errors(&self) -> bool {
        self.iter().any(TaskResults::is_failed)
    }

    /// Every failed component result together with the task it belongs to.
    pub fn errors(&self) -> impl Iterator<Item = (&TaskResults, &ComponentResult)> {
        self.iter()
            .flat_map(|result| result.failed_components().map(move |c| (result, c)))
    }

    pub fn error_message_formatted(&self) -> Option<String> {
        let mut message = String::new();

        for (index, result) in self.iter().filter(|r| r.is_failed()).enumerate() {
            writeln!(
                message,
                "Failed task {}: \"{}\" of env \"{}\"",
                index + 1,
                result.task_id(),
                result.env.id
            )
            .unwrap();

            for component in result.failed_components() {
                writeln!(message, "  component: {}", component.component).unwrap();
                for error in &component.errors {
                    for line in format!("{error:#}").lines() {
                        writeln!(message, "    {line}").unwrap();
                    }
                }
            }
        }

        (!message.is_empty()).then_some(message)
    }

    /// Turns recorded component errors into a hard failure.
    pub fn throw_errors_if_exist(&self) -> Result<(), PipelineError> {
        let Some(message) = self.error_message_formatted() else {
            return Ok(());
        };

        for result in self.iter().filter(|r| r.is_failed()) {
            let count = result.failed_components().count();
            self.reporter.failure(&format!(
                "env: {}, task \"{}\" has failed for {} component(s)",
                result.env.id,
                result.task_id(),
                count
            ));
        }

        Err(PipelineError::TasksFailed(message))
    }

    /// All artifacts produced for the component, across every task.
    pub fn artifacts_of(&self, component: &ComponentId) -> ArtifactList {
        self.iter()
            .filter_map(|result| result.artifacts.as_ref()?.get(component))
            .flat_map(|list| list.iter().cloned())
            .collect()
    }

    /// Metadata the tasks recorded for the component, keyed by aspect id.
    /// Objects written by several tasks of one aspect are merged.
    pub fn metadata_of(&self, component: &ComponentId) -> BTreeMap<String, Value> {
        let mut merged = BTreeMap::new();

        for result in self.iter() {
            let Some(metadata) = result
                .component(component)
                .and_then(|c| c.metadata.as_ref())
            else {
                continue;
            };

            match merged.entry(result.task.aspect_id().to_string()) {
                Entry::Occupied(mut slot) => match (slot.get_mut(), metadata) {
                    (Value::Object(existing), Value::Object(new)) => {
                        existing.extend(new.iter().map(|(k, v)| (k.clone(), v.clone())));
                    }
                    (existing, _) => *existing = metadata.clone(),
                },
                Entry::Vacant(slot) => {
                    slot.insert(metadata.clone());
                }
            }
        }

        merged
    }

    /// The build history of one component, in execution order.
    pub fn pipeline_report_of(&self, component: &ComponentId) -> Vec<PipelineReport> {
        self.iter()
            .filter_map(|result| {
                let component = result.component(component)?;

                Some(PipelineReport {
                    task_id: result.task_id().to_string(),
                    task_name: result.task.name().to_string(),
                    task_description: result.task.description().map(String::from),
                    env_id: result.env.id.clone(),
                    start_time: epoch_millis(component.start_time.unwrap_or(result.start_time)),
                    end_time: epoch_millis(component.end_time.unwrap_or(result.end_time)),
                    errors: component.errors.iter().map(|e| format!("{e:#}")).collect(),
                    warnings: component.warnings.clone(),
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for TaskResultsList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskResultsList")
            .field("queue", &self.queue.len())
            .field("results", &self.results)
            .field("capsule_root_dir", &self.capsule_root_dir)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemoryReporter;
    use crate::task::BuiltTaskResult;

    fn id(name: &str) -> ComponentId {
        format!("acme/{name}").parse().unwrap()
    }

    fn task(aspect: &str, name: &str) -> Arc<BuildTask> {
        Arc::new(BuildTask::define(aspect, name).run(|_| Ok(BuiltTaskResult::default())))
    }

    fn result(
        task: &Arc<BuildTask>,
        env: &str,
        components: Vec<ComponentResult>,
    ) -> Arc<TaskResults> {
        let failed = components.iter().any(ComponentResult::has_errors);
        let now = SystemTime::now();
        Arc::new(TaskResults {
            task: task.clone(),
            env: EnvDefinition::new(env),
            components_results: components,
            artifacts: (!failed).then(ArtifactMap::new),
            start_time: now,
            end_time: now,
        })
    }

    fn list() -> (TaskResultsList, Arc<MemoryReporter>) {
        let compile = task("acme.build/compiler", "Compile");
        let lint = task("acme.build/linter", "Lint");
        let test = task("acme.build/tester", "Test");

        let mut queue = TaskQueue::new();
        queue.push(compile.clone(), EnvDefinition::new("acme.envs/node"));
        queue.push(lint.clone(), EnvDefinition::new("acme.envs/node"));
        queue.push(test.clone(), EnvDefinition::new("acme.envs/node"));

        let results = vec![
            result(
                &compile,
                "acme.envs/node",
                vec![
                    ComponentResult::new(id("button"))
                        .with_metadata(serde_json::json!({ "compiled": true })),
                ],
            ),
            result(
                &lint,
                "acme.envs/node",
                vec![
                    ComponentResult::new(id("button"))
                        .with_error_message("unused variable `x`")
                        .with_warning("missing docs"),
                ],
            ),
        ];

        let reporter = Arc::new(MemoryReporter::new());
        let list = TaskResultsList::new(
            queue,
            results,
            vec![2],
            Some("/capsules".into()),
            reporter.clone(),
        );
        (list, reporter)
    }

    #[test]
    fn test_lookup_and_skipped() {
        let (list, _) = list();

        assert_eq!(list.len(), 2);
        let compile = TaskId::new("acme.build/compiler", "Compile");
        assert!(list.get(&compile, "acme.envs/node").is_some());
        assert!(list.get(&compile, "acme.envs/react").is_none());

        let test = TaskId::new("acme.build/tester", "Test");
        assert!(list.get(&test, "acme.envs/node").is_none());
        let skipped: Vec<_> = list.skipped().map(|e| e.task.id().clone()).collect();
        assert_eq!(skipped, [test]);
        assert_eq!(list.capsule_root_dir(), Some(Utf8Path::new("/capsules")));
    }

    #[test]
    fn test_skipped_hides_earlier_result() {
        let compile = task("acme.build/compiler", "Compile");
        let mut queue = TaskQueue::new();
        queue.push(compile.clone(), EnvDefinition::new("acme.envs/node"));

        let button = ComponentResult::new(id("button"));
        let earlier = result(&compile, "acme.envs/node", vec![button]);
        let list = TaskResultsList::new(
            queue,
            vec![earlier],
            vec![0],
            None,
            Arc::new(MemoryReporter::new()),
        );

        let id = TaskId::new("acme.build/compiler", "Compile");
        assert_eq!(list.len(), 1);
        assert!(list.is_skipped(&id, "acme.envs/node"));
        assert!(list.get(&id, "acme.envs/node").is_none());
        assert_eq!(list.skipped().count(), 1);
    }

    #[test]
    fn test_errors() {
        let (list, reporter) = list();

        assert!(list.has_errors());
        assert_eq!(list.errors().count(), 1);

        let message = list.error_message_formatted().unwrap();
        assert!(message.contains(
            r#"Failed task 1: "acme.build/linter:Lint" of env "acme.envs/node""#
        ));
        assert!(message.contains("component: acme/button"));
        assert!(message.contains("unused variable `x`"));

        let err = list.throw_errors_if_exist().unwrap_err();
        assert!(matches!(err, PipelineError::TasksFailed(_)));
        assert!(reporter.contains("has failed for 1 component(s)"));
    }

    #[test]
    fn test_component_queries() {
        let (list, _) = list();
        let button = id("button");

        let metadata = list.metadata_of(&button);
        assert_eq!(metadata["acme.build/compiler"], serde_json::json!({ "compiled": true }));

        let report = list.pipeline_report_of(&button);
        assert_eq!(report.len(), 2);
        assert_eq!(report[1].task_name, "Lint");
        assert_eq!(report[1].errors, ["unused variable `x`"]);
        assert_eq!(report[1].warnings, ["missing docs"]);

        assert!(list.artifacts_of(&button).is_empty());
        assert!(list.pipeline_report_of(&id("theme")).is_empty());
    }
}
