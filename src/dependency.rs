//! Resolved dependency edges between components and packages.
//!
//! The pipeline never resolves dependencies itself. These values are produced
//! upstream and travel with each [`Component`](crate::Component) into the
//! build contexts, where tasks may inspect them.

use serde::{Deserialize, Serialize};

/// How a dependency is consumed by its dependent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyLifecycle {
    Runtime,
    Dev,
    Peer,
}

/// Where the dependency declaration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencySource {
    /// Detected from the component's source files.
    Auto,
    /// Contributed by the environment.
    Env,
    /// A dependency of the environment component itself.
    EnvOwn,
    /// Registered by an aspect through a slot.
    Slots,
    /// Set explicitly in configuration.
    Config,
}

/// The `package.json` entry a dependency produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyManifest {
    pub package_name: String,
    pub version: String,
}

/// A resolved dependency edge.
///
/// The serialized form is the persisted one: `type` is written as `__type`
/// and unset flags are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_range: Option<String>,
    #[serde(rename = "__type")]
    pub kind: String,
    pub lifecycle: DependencyLifecycle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<DependencySource>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
}

impl Dependency {
    pub fn new(
        id: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
        lifecycle: DependencyLifecycle,
    ) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            version_range: None,
            kind: kind.into(),
            lifecycle,
            source: None,
            hidden: false,
            optional: false,
            package_name: None,
        }
    }

    /// The id with a trailing `@version` removed. A leading `@` belongs to
    /// the package scope and is kept.
    pub fn id_without_version(&self) -> &str {
        match self.id.rfind('@') {
            Some(index) if index > 0 => &self.id[..index],
            _ => &self.id,
        }
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    /// Explicit package name, falling back to the id without its version.
    pub fn package_name(&self) -> &str {
        self.package_name
            .as_deref()
            .unwrap_or_else(|| self.id_without_version())
    }

    pub fn to_manifest(&self) -> DependencyManifest {
        DependencyManifest {
            package_name: self.package_name().to_string(),
            version: self.version.clone(),
        }
    }
}
