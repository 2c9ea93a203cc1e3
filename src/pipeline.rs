//! The pipeline executor.
//!
//! A run walks the [`TaskQueue`] three times, strictly in queue order and one
//! task at a time:
//!
//! 1. **Pre-build**: every declared `pre_build` hook runs. Any error aborts
//!    the run.
//! 2. **Main**: every task either executes or is skipped. Component errors
//!    mark the task as failed and suppress its artifacts, they never abort
//!    the run. Errors returned by `execute` (or by artifact cataloguing) do.
//! 3. **Post-build**: every declared `post_build` hook runs with the complete
//!    [`TaskResultsList`].
//!
//! ## Skipping
//!
//! Before a task runs, the run's failed tasks are matched against the task's
//! declared dependencies. The first failed task matching one of them is the
//! reason for skipping it. Tasks which do not depend on anything that failed
//! still run. With [`PipeOptions::exit_on_first_failed_task`] every task after
//! the first failure is skipped, regardless of its dependencies.
//!
//! A skipped task leaves no [`TaskResults`] behind.

use std::sync::Arc;
use std::time::{Instant, SystemTime};

use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactFactory;
use crate::context::{BuildContext, EnvsBuildContext};
use crate::env::{EnvDefinition, EnvNameResolver, pretty_env_name};
use crate::error::PipelineError;
use crate::queue::{QueueEntry, TaskQueue};
use crate::report::{LongProcess, Reporter, TracingReporter};
use crate::results::{ComponentResult, TaskResults, TaskResultsList};
use crate::task::{BuildTask, TaskId};
use crate::utils::format_duration;

/// Options controlling a single pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipeOptions {
    /// Skip every task once any task has failed. By default only tasks
    /// depending on a failed task are skipped.
    pub exit_on_first_failed_task: bool,
    /// Prefix progress lines with the environment name.
    pub show_env_name_in_output: bool,
    /// Append the environment version to the name shown in progress lines.
    pub show_env_version_in_output: bool,
}

impl PipeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exit_on_first_failed_task(mut self, value: bool) -> Self {
        self.exit_on_first_failed_task = value;
        self
    }

    pub fn show_env_name_in_output(mut self, value: bool) -> Self {
        self.show_env_name_in_output = value;
        self
    }

    pub fn show_env_version_in_output(mut self, value: bool) -> Self {
        self.show_env_version_in_output = value;
        self
    }
}

/// State accumulated by one call to [`PipelineExecutor::execute`].
#[derive(Debug, Default)]
struct RunState {
    /// Tasks with at least one failed component, in failure order.
    failed_tasks: Vec<TaskId>,
    /// The first failed task ever found among some task's dependencies.
    /// Set once, never cleared.
    first_failed_dependency: Option<TaskId>,
    /// Results produced by this run, in queue order.
    results: Vec<Arc<TaskResults>>,
    /// Queue indices of the entries skipped by this run.
    skipped: Vec<usize>,
}

impl RunState {
    /// Finds the first failed task matching one of the task's declared
    /// dependencies and remembers it as the run's first failed dependency.
    fn update_failed_dependency(&mut self, task: &BuildTask) -> Option<TaskId> {
        let failed = self
            .failed_tasks
            .iter()
            .find(|failed| {
                task.dependencies()
                    .iter()
                    .any(|dependency| dependency.matches(failed))
            })?
            .clone();

        self.first_failed_dependency.get_or_insert_with(|| failed.clone());

        Some(failed)
    }

    /// The failed task responsible for skipping the current one, if any.
    fn skip_reason(
        &self,
        failed_dependency: Option<TaskId>,
        options: &PipeOptions,
    ) -> Option<TaskId> {
        if options.exit_on_first_failed_task
            && let Some(first) = self.failed_tasks.first()
        {
            return Some(first.clone());
        }

        failed_dependency
    }
}

/// Points the context's cumulative results at everything produced so far and
/// hands it out.
fn refresh_context<'a>(
    contexts: &'a mut EnvsBuildContext,
    previous: &[Arc<TaskResults>],
    current: &[Arc<TaskResults>],
    env_id: &str,
) -> Result<&'a BuildContext, PipelineError> {
    let context = contexts
        .get_mut(env_id)
        .ok_or_else(|| PipelineError::MissingContext(env_id.to_string()))?;

    context.previous_tasks_results = previous.iter().chain(current).cloned().collect();

    Ok(context)
}

/// Runs a [`TaskQueue`] against per-environment [`BuildContext`]s.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use buildpipe::*;
///
/// let env = EnvDefinition::new("acme.envs/node@1.0.0");
/// let network = CapsuleNetwork::new("/tmp/capsules");
///
/// let mut contexts = EnvsBuildContext::new();
/// let context = BuildContext::new(env.clone(), network, "/tmp/artifacts");
/// contexts.insert(env.id.clone(), context);
///
/// let mut queue = TaskQueue::new();
/// let task = BuildTask::define("acme.build/linter", "Lint")
///     .run(|_| Ok(BuiltTaskResult::default()));
/// queue.push(Arc::new(task), env);
///
/// let results = PipelineExecutor::new(queue, contexts, FsArtifactFactory::new())
///     .reporter(Arc::new(MemoryReporter::new()))
///     .execute()
///     .unwrap();
///
/// assert_eq!(results.len(), 1);
/// ```
pub struct PipelineExecutor {
    queue: TaskQueue,
    contexts: EnvsBuildContext,
    factory: Arc<dyn ArtifactFactory>,
    reporter: Arc<dyn Reporter>,
    previous_results: Vec<Arc<TaskResults>>,
    options: PipeOptions,
    env_names: EnvNameResolver,
}

impl PipelineExecutor {
    pub fn new(
        queue: TaskQueue,
        contexts: EnvsBuildContext,
        factory: impl ArtifactFactory + 'static,
    ) -> Self {
        Self {
            queue,
            contexts,
            factory: Arc::new(factory),
            reporter: Arc::new(TracingReporter::new()),
            previous_results: Vec::new(),
            options: PipeOptions::default(),
            env_names: Arc::new(pretty_env_name),
        }
    }

    pub fn reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Results of an earlier run this one continues from.
    pub fn previous_results(
        mut self,
        results: impl IntoIterator<Item = Arc<TaskResults>>,
    ) -> Self {
        self.previous_results = results.into_iter().collect();
        self
    }

    pub fn options(mut self, options: PipeOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the resolver turning env ids into display names.
    pub fn env_names<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&str, bool) -> String + Send + Sync + 'static,
    {
        self.env_names = Arc::new(resolver);
        self
    }

    pub fn contexts(&self) -> &EnvsBuildContext {
        &self.contexts
    }

    pub fn into_contexts(self) -> EnvsBuildContext {
        self.contexts
    }

    /// Executes the pipeline and returns the results of this run together
    /// with the previous ones.
    pub fn execute(&mut self) -> Result<TaskResultsList, PipelineError> {
        let mut state = RunState::default();
        let queue = self.queue.clone();
        let reporter = Arc::clone(&self.reporter);

        self.execute_pre_build(&state)?;

        let mut process = LongProcess::start(&*reporter, "running tasks", Some(queue.len()));
        for (index, entry) in queue.iter().enumerate() {
            self.execute_task(&mut state, &mut process, index, entry)?;
        }
        process.end();

        if !state.skipped.is_empty() {
            let cause = state
                .first_failed_dependency
                .as_ref()
                .or(state.failed_tasks.first());

            if let Some(cause) = cause {
                reporter.warn(&format!(
                    "{} task(s) skipped, first failure to block a task: \"{}\"",
                    state.skipped.len(),
                    cause
                ));
            }
        }

        let capsule_root_dir = self
            .contexts
            .values()
            .next()
            .map(|context| context.capsule_network.capsules_root_dir.clone());

        let all_results = self
            .previous_results
            .iter()
            .chain(&state.results)
            .cloned()
            .collect();

        let results = TaskResultsList::new(
            queue,
            all_results,
            state.skipped.clone(),
            capsule_root_dir,
            reporter,
        );

        self.execute_post_build(&state, &results)?;

        Ok(results)
    }

    fn execute_pre_build(&mut self, state: &RunState) -> Result<(), PipelineError> {
        self.reporter.status("executing pre-build for all tasks");
        let reporter = Arc::clone(&self.reporter);
        let process = LongProcess::start(&*reporter, "running pre-build for all tasks", None);

        for entry in self.queue.iter() {
            if !entry.task.has_pre_build() {
                continue;
            }

            let context = refresh_context(
                &mut self.contexts,
                &self.previous_results,
                &state.results,
                &entry.env.id,
            )?;

            if let Some(Err(source)) = entry.task.pre_build(context) {
                reporter.failure(&format!(
                    "env: {}, task \"{}\" failed in pre-build",
                    entry.env.id,
                    entry.task.id()
                ));
                return Err(PipelineError::PreBuild {
                    task: entry.task.id().clone(),
                    env: entry.env.id.clone(),
                    source,
                });
            }
        }

        process.end();
        Ok(())
    }

    fn execute_post_build(
        &mut self,
        state: &RunState,
        results: &TaskResultsList,
    ) -> Result<(), PipelineError> {
        let reporter = Arc::clone(&self.reporter);
        let process = LongProcess::start(&*reporter, "running post-build for all tasks", None);
        reporter.status("executing post-build for all tasks");

        for entry in self.queue.iter() {
            if !entry.task.has_post_build() {
                continue;
            }

            let context = refresh_context(
                &mut self.contexts,
                &self.previous_results,
                &state.results,
                &entry.env.id,
            )?;

            if let Some(Err(source)) = entry.task.post_build(context, results) {
                reporter.failure(&format!(
                    "env: {}, task \"{}\" failed in post-build",
                    entry.env.id,
                    entry.task.id()
                ));
                return Err(PipelineError::PostBuild {
                    task: entry.task.id().clone(),
                    env: entry.env.id.clone(),
                    source,
                });
            }
        }

        process.end();
        Ok(())
    }

    /// `[dependency] (env) [Pretty Aspect: task]`
    fn task_label(&self, task: &BuildTask, env: &EnvDefinition, has_seeders: bool) -> String {
        let dependency = if has_seeders { "" } else { "[dependency] " };

        let env_name = if self.options.show_env_name_in_output {
            let name = (self.env_names)(&env.id, self.options.show_env_version_in_output);
            format!("({name}) ")
        } else {
            String::new()
        };

        format!(
            "{dependency}{env_name}[{}: {}]",
            task.id().pretty_aspect_name(),
            task.name()
        )
    }

    fn execute_task(
        &mut self,
        state: &mut RunState,
        process: &mut LongProcess<'_>,
        index: usize,
        entry: &QueueEntry,
    ) -> Result<(), PipelineError> {
        let QueueEntry { task, env } = entry;

        let span = tracing::info_span!("task", task = %task.id(), env = %env.id);
        let _enter = span.enter();

        let has_seeders = self
            .contexts
            .get(&env.id)
            .ok_or_else(|| PipelineError::MissingContext(env.id.clone()))?
            .capsule_network
            .has_original_seeders();

        let label = self.task_label(task, env, has_seeders);
        match task.description() {
            Some(description) => process.log_progress(&format!("{label} {description}")),
            None => process.log_progress(&label),
        }

        let failed_dependency = state.update_failed_dependency(task);
        if let Some(reason) = state.skip_reason(failed_dependency, &self.options) {
            self.reporter.warn(&format!(
                "env: {}, task \"{}\" has skipped due to \"{}\" failure",
                env.id,
                task.id(),
                reason
            ));
            state.skipped.push(index);
            return Ok(());
        }

        let context = refresh_context(
            &mut self.contexts,
            &self.previous_results,
            &state.results,
            &env.id,
        )?;

        let started = Instant::now();
        let start_time = SystemTime::now();

        let built = match task.execute(context) {
            Ok(built) => built,
            Err(source) => {
                self.reporter.failure(&format!(
                    "env: {}, task \"{}\" threw an error",
                    env.id,
                    task.id()
                ));
                return Err(PipelineError::Execute {
                    task: task.id().clone(),
                    env: env.id.clone(),
                    source,
                });
            }
        };

        let end_time = SystemTime::now();
        let duration = format_duration(started.elapsed());

        let failed = built
            .components_results
            .iter()
            .any(ComponentResult::has_errors);

        let artifacts = if failed {
            self.reporter.failure(&format!(
                "{} env: {}, task \"{}\" has failed in {}",
                process.progress(),
                env.id,
                task.id(),
                duration
            ));
            state.failed_tasks.push(task.id().clone());
            None
        } else {
            self.reporter.success(&format!(
                "{} {} Completed successfully in {}",
                process.progress(),
                label,
                duration
            ));

            let artifacts = self
                .factory
                .generate(context, &built.artifacts, task)
                .map_err(|source| {
                    self.reporter.failure(&format!(
                        "env: {}, task \"{}\" failed to generate artifacts",
                        env.id,
                        task.id()
                    ));
                    PipelineError::Artifacts {
                        task: task.id().clone(),
                        env: env.id.clone(),
                        source,
                    }
                })?;

            Some(artifacts)
        };

        state.results.push(Arc::new(TaskResults {
            task: Arc::clone(task),
            env: env.clone(),
            components_results: built.components_results,
            artifacts,
            start_time,
            end_time,
        }));

        Ok(())
    }
}

impl std::fmt::Debug for PipelineExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineExecutor")
            .field("queue", &self.queue)
            .field("contexts", &self.contexts.keys().collect::<Vec<_>>())
            .field("previous_results", &self.previous_results.len())
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{BuiltTaskResult, TaskSelector};

    fn task(aspect: &str, name: &str, deps: &[TaskSelector]) -> BuildTask {
        let mut def = BuildTask::define(aspect, name);
        for dep in deps {
            def = def.depends_on(dep.clone());
        }
        def.run(|_| Ok(BuiltTaskResult::default()))
    }

    #[test]
    fn test_no_failures_no_skip() {
        let mut state = RunState::default();
        let options = PipeOptions::default();
        let b = task("acme/b", "B", &[TaskSelector::aspect("acme/a")]);

        let failed = state.update_failed_dependency(&b);
        assert_eq!(state.skip_reason(failed, &options), None);
    }

    #[test]
    fn test_wildcard_dependency_matches_failure() {
        let mut state = RunState::default();
        state.failed_tasks.push(TaskId::new("acme/a", "A"));

        let b = task("acme/b", "B", &[TaskSelector::aspect("acme/a")]);
        let failed = state.update_failed_dependency(&b);
        assert_eq!(failed, Some(TaskId::new("acme/a", "A")));
        assert_eq!(state.first_failed_dependency, Some(TaskId::new("acme/a", "A")));
    }

    #[test]
    fn test_named_dependency_must_match_name() {
        let mut state = RunState::default();
        state.failed_tasks.push(TaskId::new("acme/a", "Other"));

        let b = task("acme/b", "B", &[TaskSelector::task("acme/a", "A")]);
        let failed = state.update_failed_dependency(&b);
        assert_eq!(state.skip_reason(failed, &PipeOptions::default()), None);
    }

    #[test]
    fn test_first_failed_dependency_is_kept() {
        let mut state = RunState::default();
        state.failed_tasks.push(TaskId::new("acme/a", "A"));
        state.failed_tasks.push(TaskId::new("acme/x", "X"));

        let b = task("acme/b", "B", &[TaskSelector::aspect("acme/a")]);
        let y = task("acme/y", "Y", &[TaskSelector::aspect("acme/x")]);

        state.update_failed_dependency(&b);
        let reason = state.update_failed_dependency(&y);

        assert_eq!(reason, Some(TaskId::new("acme/x", "X")));
        assert_eq!(state.first_failed_dependency, Some(TaskId::new("acme/a", "A")));
    }

    #[test]
    fn test_exit_on_first_failure() {
        let mut state = RunState::default();
        state.failed_tasks.push(TaskId::new("acme/a", "A"));
        state.failed_tasks.push(TaskId::new("acme/c", "C"));

        let options = PipeOptions::new().exit_on_first_failed_task(true);
        let d = task("acme/d", "D", &[]);
        let failed = state.update_failed_dependency(&d);

        assert_eq!(state.skip_reason(failed, &options), Some(TaskId::new("acme/a", "A")));
    }

    #[test]
    fn test_options_from_json() {
        let options: PipeOptions =
            serde_json::from_str(r#"{ "exitOnFirstFailedTask": true }"#).unwrap();
        assert_eq!(options, PipeOptions::new().exit_on_first_failed_task(true));
    }
}
