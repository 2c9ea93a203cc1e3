//! Build environments.

use std::sync::Arc;

use crate::component::ComponentId;

/// One build configuration, e.g. a language or framework target, under
/// which tasks run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvDefinition {
    /// Component id of the environment, e.g. `teambit.react/react@1.0.0`.
    pub id: String,
    /// Free-form description of the environment.
    pub description: Option<String>,
}

impl EnvDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Resolves an environment id into the name shown in progress output.
pub type EnvNameResolver = Arc<dyn Fn(&str, bool) -> String + Send + Sync>;

/// The default env name resolver: the env's full name without its scope,
/// followed by `@version` when requested. Ids that fail to parse are shown
/// as-is.
pub fn pretty_env_name(env_id: &str, show_version: bool) -> String {
    let Ok(id) = env_id.parse::<ComponentId>() else {
        return env_id.to_string();
    };

    match (show_version, id.version()) {
        (true, Some(version)) => format!("{}@{}", id.full_name(), version),
        _ => id.full_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_env_name() {
        assert_eq!(pretty_env_name("teambit.react/react@1.0.4", false), "react");
        assert_eq!(pretty_env_name("teambit.react/react@1.0.4", true), "react@1.0.4");
        assert_eq!(pretty_env_name("teambit.react/react", true), "react");
        assert_eq!(pretty_env_name("", true), "");
    }
}
