use camino::Utf8PathBuf;
use serde::Serialize;

use crate::Hash32;
use crate::artifact::ArtifactContext;
use crate::task::TaskId;

/// One catalogued file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactFile {
    /// Path relative to the artifact's root.
    pub relative_path: Utf8PathBuf,
    pub checksum: Hash32,
    pub size: u64,
}

/// A realized [`ArtifactDefinition`](crate::ArtifactDefinition).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub name: String,
    pub description: Option<String>,
    /// The aspect (or explicit producer) that generated the files.
    pub generated_by: String,
    /// The task which declared the artifact.
    pub task: TaskId,
    pub context: ArtifactContext,
    /// Absolute directory the files were collected from.
    pub root: Utf8PathBuf,
    pub files: Vec<ArtifactFile>,
}

impl Artifact {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Absolute paths of the catalogued files.
    pub fn paths(&self) -> impl Iterator<Item = Utf8PathBuf> + '_ {
        self.files
            .iter()
            .map(|file| self.root.join(&file.relative_path))
    }
}

/// Artifacts of a single component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ArtifactList {
    artifacts: Vec<Artifact>,
}

impl ArtifactList {
    pub fn new(artifacts: Vec<Artifact>) -> Self {
        Self { artifacts }
    }

    pub fn push(&mut self, artifact: Artifact) {
        self.artifacts.push(artifact);
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Artifact> {
        self.artifacts.iter()
    }

    pub fn by_name(&self, name: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|artifact| artifact.name == name)
    }

    pub fn by_task<'a>(&'a self, task: &'a TaskId) -> impl Iterator<Item = &'a Artifact> {
        self.artifacts
            .iter()
            .filter(move |artifact| artifact.task == *task)
    }

    pub fn file_count(&self) -> usize {
        self.artifacts.iter().map(|artifact| artifact.files.len()).sum()
    }
}

impl<'a> IntoIterator for &'a ArtifactList {
    type Item = &'a Artifact;
    type IntoIter = std::slice::Iter<'a, Artifact>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Extend<Artifact> for ArtifactList {
    fn extend<T: IntoIterator<Item = Artifact>>(&mut self, iter: T) {
        self.artifacts.extend(iter);
    }
}

impl FromIterator<Artifact> for ArtifactList {
    fn from_iter<T: IntoIterator<Item = Artifact>>(iter: T) -> Self {
        Self {
            artifacts: iter.into_iter().collect(),
        }
    }
}
