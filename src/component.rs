//! Component identities.
//!
//! Every component, aspect and environment in a workspace is addressed by a
//! [`ComponentId`] of the shape `scope/namespace/name@version`, where both the
//! scope and the version are optional.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dependency::{Dependency, DependencyLifecycle};
use crate::error::IdError;

/// A parsed `scope/namespace/name@version` identifier.
///
/// The first path segment is treated as the scope when the id has more than
/// one segment, the remainder is the full name. The last segment of the full
/// name is the short [`name`](ComponentId::name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ComponentId {
    scope: Option<String>,
    full_name: String,
    version: Option<String>,
}

impl ComponentId {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            scope: None,
            full_name: full_name.into(),
            version: None,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Everything after the scope, without the version.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Final path segment of the full name.
    pub fn name(&self) -> &str {
        self.full_name
            .rsplit('/')
            .next()
            .unwrap_or(&self.full_name)
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// The same identity with the version stripped.
    pub fn without_version(&self) -> Self {
        Self {
            version: None,
            ..self.clone()
        }
    }

    /// Compares two ids ignoring their versions.
    pub fn is_equal_without_version(&self, other: &ComponentId) -> bool {
        self.scope == other.scope && self.full_name == other.full_name
    }
}

impl Display for ComponentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(scope) = &self.scope {
            write!(f, "{scope}/")?;
        }
        f.write_str(&self.full_name)?;
        if let Some(version) = &self.version {
            write!(f, "@{version}")?;
        }
        Ok(())
    }
}

impl FromStr for ComponentId {
    type Err = IdError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if input.is_empty() {
            return Err(IdError::Empty);
        }

        let (path, version) = match input.rsplit_once('@') {
            Some((_, "")) => return Err(IdError::EmptyVersion(input.to_string())),
            Some((path, version)) => (path, Some(version.to_string())),
            None => (input, None),
        };

        let (scope, full_name) = match path.split_once('/') {
            Some((scope, rest)) if !scope.is_empty() && !rest.is_empty() => {
                (Some(scope.to_string()), rest.to_string())
            }
            Some(_) => return Err(IdError::Malformed(input.to_string())),
            None => (None, path.to_string()),
        };

        if full_name.is_empty() {
            return Err(IdError::Empty);
        }

        Ok(Self {
            scope,
            full_name,
            version,
        })
    }
}

impl TryFrom<String> for ComponentId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ComponentId> for String {
    fn from(value: ComponentId) -> Self {
        value.to_string()
    }
}

/// A component as seen by the build: its identity and resolved dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub id: ComponentId,
    pub dependencies: Vec<Dependency>,
}

impl Component {
    pub fn new(id: ComponentId) -> Self {
        Self {
            id,
            dependencies: Vec::new(),
        }
    }

    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = Dependency>) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    /// Dependencies of the given lifecycle, in declaration order.
    pub fn dependencies_of(
        &self,
        lifecycle: DependencyLifecycle,
    ) -> impl Iterator<Item = &Dependency> {
        self.dependencies
            .iter()
            .filter(move |dependency| dependency.lifecycle == lifecycle)
    }
}
