use camino::Utf8PathBuf;
use thiserror::Error;

use crate::task::TaskId;

#[derive(Debug, Error)]
pub enum IdError {
    #[error("Identifier is empty")]
    Empty,

    #[error("Identifier '{0}' has an empty version")]
    EmptyVersion(String),

    #[error("Identifier '{0}' is malformed")]
    Malformed(String),

    #[error("Task id '{0}' is missing a task name")]
    MissingTaskName(String),
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Artifact '{0}' declares no glob patterns")]
    NoGlob(String),

    #[error("Artifact '{artifact}': root directory '{path}' does not exist")]
    MissingRoot { artifact: String, path: Utf8PathBuf },

    #[error("Couldn't compile glob pattern.\n{0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Couldn't run glob.\n{0}")]
    Glob(#[from] glob::GlobError),

    #[error("Couldn't convert path to UTF-8.\n{0}")]
    PathFormat(#[from] camino::FromPathBufError),

    #[error("Couldn't read artifact file.\n{0}")]
    FileSystem(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Task '{task}' is queued more than once for env '{env}'")]
    Duplicate { task: TaskId, env: String },

    #[error("Task '{task}' runs before its dependency '{dependency}' in env '{env}'")]
    DependencyOrder {
        task: TaskId,
        dependency: TaskId,
        env: String,
    },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unable to find build context for env '{0}'")]
    MissingContext(String),

    #[error("Env '{env}', task '{task}' failed in pre-build:\n{source}")]
    PreBuild {
        task: TaskId,
        env: String,
        source: anyhow::Error,
    },

    #[error("Env '{env}', task '{task}' threw an error:\n{source}")]
    Execute {
        task: TaskId,
        env: String,
        source: anyhow::Error,
    },

    #[error("Env '{env}', task '{task}' failed to generate artifacts:\n{source}")]
    Artifacts {
        task: TaskId,
        env: String,
        source: ArtifactError,
    },

    #[error("Env '{env}', task '{task}' failed in post-build:\n{source}")]
    PostBuild {
        task: TaskId,
        env: String,
        source: anyhow::Error,
    },

    #[error("The following errors were found:\n{0}")]
    TasksFailed(String),
}

impl PipelineError {
    /// The task and environment the error originated from, if any.
    pub fn origin(&self) -> Option<(&TaskId, &str)> {
        match self {
            Self::PreBuild { task, env, .. }
            | Self::Execute { task, env, .. }
            | Self::Artifacts { task, env, .. }
            | Self::PostBuild { task, env, .. } => Some((task, env)),
            Self::MissingContext(_) | Self::TasksFailed(_) => None,
        }
    }
}
