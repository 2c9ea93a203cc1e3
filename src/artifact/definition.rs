use serde::{Deserialize, Serialize};

/// Where the globs of an [`ArtifactDefinition`] are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactContext {
    /// Inside each seeder's capsule.
    #[default]
    Component,
    /// Once, inside the build context's artifacts directory, and attributed
    /// to every seeder.
    Env,
}

/// Declares a set of output files a task produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub glob_patterns: Vec<String>,
    /// Directory, relative to the capsule, the globs are resolved from. When
    /// set it must exist.
    #[serde(default)]
    pub root_dir: Option<String>,
    #[serde(default)]
    pub context: ArtifactContext,
    /// Overrides the producer recorded on the artifact, defaults to the
    /// aspect owning the task.
    #[serde(default)]
    pub generated_by: Option<String>,
}

impl ArtifactDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            glob_patterns: Vec::new(),
            root_dir: None,
            context: ArtifactContext::default(),
            generated_by: None,
        }
    }

    pub fn glob(mut self, pattern: impl Into<String>) -> Self {
        self.glob_patterns.push(pattern.into());
        self
    }

    pub fn root_dir(mut self, dir: impl Into<String>) -> Self {
        self.root_dir = Some(dir.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn context(mut self, context: ArtifactContext) -> Self {
        self.context = context;
        self
    }

    pub fn generated_by(mut self, generated_by: impl Into<String>) -> Self {
        self.generated_by = Some(generated_by.into());
        self
    }
}
