use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use glob::Pattern;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::Hash32;
use crate::artifact::{Artifact, ArtifactContext, ArtifactDefinition, ArtifactFile, ArtifactList};
use crate::component::ComponentId;
use crate::context::BuildContext;
use crate::error::ArtifactError;
use crate::task::BuildTask;

/// Artifacts of one task, keyed by component.
pub type ArtifactMap = BTreeMap<ComponentId, ArtifactList>;

/// Catalogues the artifacts declared by a successful task.
///
/// Implementations must be deterministic for the same context, definitions
/// and task. They never decide whether the task succeeded; an `Err` aborts the
/// pipeline just like a failing `execute`.
pub trait ArtifactFactory: Send + Sync {
    fn generate(
        &self,
        context: &BuildContext,
        definitions: &[ArtifactDefinition],
        task: &BuildTask,
    ) -> Result<ArtifactMap, ArtifactError>;
}

/// Catalogues artifacts straight from the capsule directories on disk.
///
/// Every seeder of the context gets an entry in the resulting map, even when
/// no definition produced files for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsArtifactFactory;

impl FsArtifactFactory {
    pub fn new() -> Self {
        Self
    }

    /// Resolves the definition's globs below `base`, returning the root the
    /// files were collected from and the hashed files in path order.
    fn collect(
        &self,
        definition: &ArtifactDefinition,
        base: &Utf8Path,
    ) -> Result<(Utf8PathBuf, Vec<ArtifactFile>), ArtifactError> {
        let root = match &definition.root_dir {
            Some(dir) => {
                let root = base.join(dir);
                if !root.is_dir() {
                    return Err(ArtifactError::MissingRoot {
                        artifact: definition.name.clone(),
                        path: root,
                    });
                }
                root
            }
            None => base.to_path_buf(),
        };

        let escaped = Pattern::escape(root.as_str());
        let mut paths = Vec::new();
        for pattern in &definition.glob_patterns {
            let pattern = format!("{}/{}", escaped, pattern.trim_start_matches('/'));
            for entry in glob::glob(&pattern)? {
                let path = Utf8PathBuf::try_from(entry?)?;
                if path.is_file() {
                    paths.push(path);
                }
            }
        }

        paths.sort();
        paths.dedup();

        let files = paths
            .into_par_iter()
            .map(|path| -> Result<_, ArtifactError> {
                let size = fs::metadata(&path)?.len();
                let checksum = Hash32::hash_file(&path)?;
                let relative_path = match path.strip_prefix(&root) {
                    Ok(relative) => relative.to_path_buf(),
                    Err(_) => path.clone(),
                };

                Ok(ArtifactFile {
                    relative_path,
                    checksum,
                    size,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok((root, files))
    }

    fn realize(
        &self,
        definition: &ArtifactDefinition,
        task: &BuildTask,
        root: Utf8PathBuf,
        files: Vec<ArtifactFile>,
    ) -> Artifact {
        Artifact {
            name: definition.name.clone(),
            description: definition.description.clone(),
            generated_by: definition
                .generated_by
                .clone()
                .unwrap_or_else(|| task.aspect_id().to_string()),
            task: task.id().clone(),
            context: definition.context,
            root,
            files,
        }
    }
}

impl ArtifactFactory for FsArtifactFactory {
    fn generate(
        &self,
        context: &BuildContext,
        definitions: &[ArtifactDefinition],
        task: &BuildTask,
    ) -> Result<ArtifactMap, ArtifactError> {
        let mut map: ArtifactMap = context
            .seeders()
            .map(|component| (component.id.clone(), ArtifactList::default()))
            .collect();

        for definition in definitions {
            if definition.glob_patterns.is_empty() {
                return Err(ArtifactError::NoGlob(definition.name.clone()));
            }

            match definition.context {
                ArtifactContext::Component => {
                    for capsule in context.capsule_network.seeders_capsules() {
                        let (root, files) = self.collect(definition, &capsule.path)?;
                        let artifact = self.realize(definition, task, root, files);
                        map.entry(capsule.component.id.clone())
                            .or_default()
                            .push(artifact);
                    }
                }
                ArtifactContext::Env => {
                    let (root, files) = self.collect(definition, context.artifacts_dir())?;
                    let artifact = self.realize(definition, task, root, files);
                    for list in map.values_mut() {
                        list.push(artifact.clone());
                    }
                }
            }
        }

        tracing::debug!(
            task = %task.id(),
            env = %context.env.id,
            components = map.len(),
            "catalogued artifacts"
        );

        Ok(map)
    }
}
