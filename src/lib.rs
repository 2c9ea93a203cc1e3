#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

pub mod artifact;
mod component;
mod context;
mod dependency;
mod diagnostics;
mod env;
mod error;
mod hash;
mod pipeline;
mod queue;
mod report;
mod results;
mod task;
mod utils;

pub use crate::artifact::{
    Artifact, ArtifactContext, ArtifactDefinition, ArtifactFactory, ArtifactFile, ArtifactList,
    ArtifactMap, FsArtifactFactory,
};
pub use crate::component::{Component, ComponentId};
pub use crate::context::{BuildContext, Capsule, CapsuleNetwork, EnvsBuildContext};
pub use crate::dependency::{Dependency, DependencyLifecycle, DependencyManifest, DependencySource};
pub use crate::diagnostics::Diagnostics;
pub use crate::env::{EnvDefinition, EnvNameResolver, pretty_env_name};
pub use crate::error::*;
pub use crate::hash::Hash32;
pub use crate::pipeline::{PipeOptions, PipelineExecutor};
pub use crate::queue::{QueueEntry, TaskQueue};
pub use crate::report::{
    LongProcess, MemoryReporter, ReportKind, ReportLine, Reporter, TracingReporter,
};
pub use crate::results::{ComponentResult, PipelineReport, TaskResults, TaskResultsList};
pub use crate::task::{BuildTask, BuiltTaskResult, TaskDef, TaskId, TaskSelector};
#[cfg(feature = "logging")]
pub use crate::utils::init_logging;
