//! Build tasks and the identities used to refer to them.
//!
//! A [`BuildTask`] is a fixed-shape record: a required `execute` callback and
//! two optional lifecycle hooks, `pre_build` and `post_build`. Tasks are
//! defined through the [`TaskDef`] builder:
//!
//! ```rust
//! use buildpipe::{BuildTask, BuiltTaskResult, TaskSelector};
//!
//! let task = BuildTask::define("teambit.compilation/compiler", "TSCompiler")
//!     .description("compile components")
//!     .depends_on(TaskSelector::aspect("teambit.dependencies/install"))
//!     .run(|_ctx| Ok(BuiltTaskResult::default()));
//!
//! assert_eq!(task.id().to_string(), "teambit.compilation/compiler:TSCompiler");
//! ```

use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactDefinition;
use crate::component::ComponentId;
use crate::context::BuildContext;
use crate::error::IdError;
use crate::results::{ComponentResult, TaskResultsList};

/// Identity of a task: the owning aspect plus the task name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskId {
    pub aspect_id: String,
    pub name: String,
}

impl TaskId {
    pub fn new(aspect_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            aspect_id: aspect_id.into(),
            name: name.into(),
        }
    }

    /// Human readable aspect name: the last segment of the aspect id, split
    /// on hyphens, each token capitalized.
    ///
    /// `teambit.compilation/typescript-compiler` becomes `Typescript Compiler`.
    pub fn pretty_aspect_name(&self) -> String {
        let name = match self.aspect_id.parse::<ComponentId>() {
            Ok(id) => id.name().to_string(),
            Err(_) => self.aspect_id.clone(),
        };

        name.split('-')
            .map(crate::utils::capitalize)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.aspect_id, self.name)
    }
}

impl FromStr for TaskId {
    type Err = IdError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let selector: TaskSelector = input.parse()?;
        match selector.name {
            Some(name) => Ok(TaskId::new(selector.aspect_id, name)),
            None => Err(IdError::MissingTaskName(input.to_string())),
        }
    }
}

/// A declared dependency on other tasks.
///
/// Matches a task when the aspect ids are equal and either no name is given,
/// meaning any task of that aspect, or the names are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSelector {
    pub aspect_id: String,
    pub name: Option<String>,
}

impl TaskSelector {
    /// Any task owned by the aspect.
    pub fn aspect(aspect_id: impl Into<String>) -> Self {
        Self {
            aspect_id: aspect_id.into(),
            name: None,
        }
    }

    /// One specific task.
    pub fn task(aspect_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            aspect_id: aspect_id.into(),
            name: Some(name.into()),
        }
    }

    pub fn matches(&self, task: &TaskId) -> bool {
        if self.aspect_id != task.aspect_id {
            return false;
        }

        match &self.name {
            Some(name) => *name == task.name,
            None => true,
        }
    }
}

impl Display for TaskSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}:{}", self.aspect_id, name),
            None => f.write_str(&self.aspect_id),
        }
    }
}

/// Parses `aspect:name`, `aspect:` and `aspect`; the last two select every
/// task of the aspect.
impl FromStr for TaskSelector {
    type Err = IdError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        let (aspect_id, name) = match input.split_once(':') {
            Some((aspect_id, name)) => (aspect_id, name),
            None => (input, ""),
        };

        if aspect_id.is_empty() {
            return Err(IdError::Empty);
        }

        Ok(Self {
            aspect_id: aspect_id.to_string(),
            name: (!name.is_empty()).then(|| name.to_string()),
        })
    }
}

impl From<TaskId> for TaskSelector {
    fn from(id: TaskId) -> Self {
        Self {
            aspect_id: id.aspect_id,
            name: Some(id.name),
        }
    }
}

impl From<&TaskId> for TaskSelector {
    fn from(id: &TaskId) -> Self {
        id.clone().into()
    }
}

/// What a task's `execute` returns.
#[derive(Debug, Default)]
pub struct BuiltTaskResult {
    /// Outcome for each component the task handled.
    pub components_results: Vec<ComponentResult>,
    /// Outputs to catalogue when every component succeeded.
    pub artifacts: Vec<ArtifactDefinition>,
}

impl BuiltTaskResult {
    pub fn new(components_results: Vec<ComponentResult>) -> Self {
        Self {
            components_results,
            artifacts: Vec::new(),
        }
    }

    pub fn with_artifacts(
        mut self,
        artifacts: impl IntoIterator<Item = ArtifactDefinition>,
    ) -> Self {
        self.artifacts.extend(artifacts);
        self
    }
}

type ExecuteFn = Box<dyn Fn(&BuildContext) -> anyhow::Result<BuiltTaskResult> + Send + Sync>;
type PreBuildFn = Box<dyn Fn(&BuildContext) -> anyhow::Result<()> + Send + Sync>;
type PostBuildFn =
    Box<dyn Fn(&BuildContext, &TaskResultsList) -> anyhow::Result<()> + Send + Sync>;

/// A named unit of build work.
pub struct BuildTask {
    id: TaskId,
    description: Option<String>,
    dependencies: Vec<TaskSelector>,
    pre_build: Option<PreBuildFn>,
    execute: ExecuteFn,
    post_build: Option<PostBuildFn>,
}

impl BuildTask {
    /// Starts defining a task owned by `aspect_id`.
    pub fn define(aspect_id: impl Into<String>, name: impl Into<String>) -> TaskDef {
        TaskDef {
            id: TaskId::new(aspect_id, name),
            description: None,
            dependencies: Vec::new(),
            pre_build: None,
            post_build: None,
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn aspect_id(&self) -> &str {
        &self.id.aspect_id
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn dependencies(&self) -> &[TaskSelector] {
        &self.dependencies
    }

    pub fn has_pre_build(&self) -> bool {
        self.pre_build.is_some()
    }

    pub fn has_post_build(&self) -> bool {
        self.post_build.is_some()
    }

    /// Runs the pre-build hook, if the task declares one.
    pub(crate) fn pre_build(&self, context: &BuildContext) -> Option<anyhow::Result<()>> {
        self.pre_build.as_ref().map(|hook| hook(context))
    }

    pub(crate) fn execute(&self, context: &BuildContext) -> anyhow::Result<BuiltTaskResult> {
        (self.execute)(context)
    }

    /// Runs the post-build hook, if the task declares one.
    pub(crate) fn post_build(
        &self,
        context: &BuildContext,
        results: &TaskResultsList,
    ) -> Option<anyhow::Result<()>> {
        self.post_build.as_ref().map(|hook| hook(context, results))
    }
}

impl Debug for BuildTask {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildTask")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("dependencies", &self.dependencies)
            .field("pre_build", &self.pre_build.is_some())
            .field("post_build", &self.post_build.is_some())
            .finish()
    }
}

/// Builder for [`BuildTask`], finished by [`TaskDef::run`].
pub struct TaskDef {
    id: TaskId,
    description: Option<String>,
    dependencies: Vec<TaskSelector>,
    pre_build: Option<PreBuildFn>,
    post_build: Option<PostBuildFn>,
}

impl TaskDef {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn depends_on(mut self, dependency: impl Into<TaskSelector>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    pub fn pre_build<F>(mut self, hook: F) -> Self
    where
        F: Fn(&BuildContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.pre_build = Some(Box::new(hook));
        self
    }

    pub fn post_build<F>(mut self, hook: F) -> Self
    where
        F: Fn(&BuildContext, &TaskResultsList) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.post_build = Some(Box::new(hook));
        self
    }

    pub fn run<F>(self, execute: F) -> BuildTask
    where
        F: Fn(&BuildContext) -> anyhow::Result<BuiltTaskResult> + Send + Sync + 'static,
    {
        BuildTask {
            id: self.id,
            description: self.description,
            dependencies: self.dependencies,
            pre_build: self.pre_build,
            execute: Box::new(execute),
            post_build: self.post_build,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_matches() {
        let compile = TaskId::new("teambit.compilation/compiler", "TSCompiler");
        let other = TaskId::new("teambit.compilation/compiler", "BabelCompiler");

        let any = TaskSelector::aspect("teambit.compilation/compiler");
        assert!(any.matches(&compile));
        assert!(any.matches(&other));

        let exact = TaskSelector::task("teambit.compilation/compiler", "TSCompiler");
        assert!(exact.matches(&compile));
        assert!(!exact.matches(&other));

        let foreign = TaskSelector::aspect("teambit.defender/tester");
        assert!(!foreign.matches(&compile));
    }

    #[test]
    fn test_selector_parse() {
        let any: TaskSelector = "teambit.defender/tester".parse().unwrap();
        assert_eq!(any, TaskSelector::aspect("teambit.defender/tester"));

        let empty: TaskSelector = "teambit.defender/tester:".parse().unwrap();
        assert_eq!(empty.name, None);

        let named: TaskSelector = "teambit.defender/tester:JestTest".parse().unwrap();
        assert_eq!(named.name.as_deref(), Some("JestTest"));
        assert_eq!(named.to_string(), "teambit.defender/tester:JestTest");

        assert!(":JestTest".parse::<TaskSelector>().is_err());
    }

    #[test]
    fn test_task_id_roundtrip() {
        let id: TaskId = "teambit.defender/tester:JestTest".parse().unwrap();
        assert_eq!(id, TaskId::new("teambit.defender/tester", "JestTest"));
        assert!(matches!(
            "teambit.defender/tester".parse::<TaskId>(),
            Err(IdError::MissingTaskName(_))
        ));
    }

    #[test]
    fn test_pretty_aspect_name() {
        let id = TaskId::new("teambit.compilation/typescript-compiler@1.0.0", "TSCompiler");
        assert_eq!(id.pretty_aspect_name(), "Typescript Compiler");

        let id = TaskId::new("teambit.defender/tester", "JestTest");
        assert_eq!(id.pretty_aspect_name(), "Tester");
    }

    #[test]
    fn test_optional_hooks() {
        let bare = BuildTask::define("acme/lint", "Lint").run(|_| Ok(BuiltTaskResult::default()));
        assert!(!bare.has_pre_build());
        assert!(!bare.has_post_build());

        let hooked = BuildTask::define("acme/lint", "Lint")
            .pre_build(|_| Ok(()))
            .post_build(|_, _| Ok(()))
            .run(|_| Ok(BuiltTaskResult::default()));
        assert!(hooked.has_pre_build());
        assert!(hooked.has_post_build());
    }
}
