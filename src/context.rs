//! Per-environment execution contexts.

use std::collections::BTreeMap;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};

use crate::component::{Component, ComponentId};
use crate::env::EnvDefinition;
use crate::results::TaskResults;

/// An isolated workspace in which one component is built.
#[derive(Debug, Clone)]
pub struct Capsule {
    pub component: Component,
    pub path: Utf8PathBuf,
}

impl Capsule {
    pub fn new(component: Component, path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            component,
            path: path.into(),
        }
    }
}

/// The set of capsules built together under one environment.
///
/// Seeders are the components explicitly requested for the build, other
/// capsules are present only because a seeder depends on them.
#[derive(Debug, Clone, Default)]
pub struct CapsuleNetwork {
    pub capsules_root_dir: Utf8PathBuf,
    pub seeders: Vec<ComponentId>,
    pub capsules: Vec<Capsule>,
}

impl CapsuleNetwork {
    pub fn new(capsules_root_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            capsules_root_dir: capsules_root_dir.into(),
            ..Self::default()
        }
    }

    /// Adds a capsule for a component requested for the build.
    pub fn with_seeder(mut self, capsule: Capsule) -> Self {
        self.seeders.push(capsule.component.id.clone());
        self.capsules.push(capsule);
        self
    }

    /// Adds a capsule pulled in only as a dependency.
    pub fn with_dependency(mut self, capsule: Capsule) -> Self {
        self.capsules.push(capsule);
        self
    }

    /// Whether any component in the network was requested directly. A
    /// network without seeders is built only on behalf of other components.
    pub fn has_original_seeders(&self) -> bool {
        !self.seeders.is_empty()
    }

    pub fn is_seeder(&self, id: &ComponentId) -> bool {
        self.seeders.contains(id)
    }

    pub fn seeders_capsules(&self) -> impl Iterator<Item = &Capsule> {
        self.capsules
            .iter()
            .filter(|capsule| self.is_seeder(&capsule.component.id))
    }

    pub fn capsule(&self, id: &ComponentId) -> Option<&Capsule> {
        self.capsules
            .iter()
            .find(|capsule| capsule.component.id == *id)
    }
}

/// Everything a task sees while running under one environment.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub env: EnvDefinition,
    pub capsule_network: CapsuleNetwork,
    pub artifacts_dir: Utf8PathBuf,
    /// Results of every task completed so far, including those of a chained
    /// previous run. Refreshed by the pipeline right before each call into a
    /// task.
    pub previous_tasks_results: Vec<Arc<TaskResults>>,
}

impl BuildContext {
    pub fn new(
        env: EnvDefinition,
        capsule_network: CapsuleNetwork,
        artifacts_dir: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            env,
            capsule_network,
            artifacts_dir: artifacts_dir.into(),
            previous_tasks_results: Vec::new(),
        }
    }

    pub fn artifacts_dir(&self) -> &Utf8Path {
        &self.artifacts_dir
    }

    /// Every component in the network, seeders and dependencies alike.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.capsule_network
            .capsules
            .iter()
            .map(|capsule| &capsule.component)
    }

    /// Components explicitly requested for this build.
    pub fn seeders(&self) -> impl Iterator<Item = &Component> {
        self.capsule_network
            .seeders_capsules()
            .map(|capsule| &capsule.component)
    }
}

/// Build contexts keyed by environment id.
pub type EnvsBuildContext = BTreeMap<String, BuildContext>;
