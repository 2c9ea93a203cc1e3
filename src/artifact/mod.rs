//! Build artifacts: what a task declares it produces, and the catalogued
//! files that actually ended up on disk.
//!
//! * [`ArtifactDefinition`]: declared by a task's result, a name plus glob
//!   patterns relative to a capsule (or the env's artifacts directory).
//! * [`Artifact`]: a realized definition, the matched files with their
//!   checksums.
//! * [`ArtifactList`]: every artifact of one component for one task.
//! * [`ArtifactFactory`]: turns definitions into an [`ArtifactMap`].

mod definition;
mod factory;
mod list;

pub use definition::{ArtifactContext, ArtifactDefinition};
pub use factory::{ArtifactFactory, ArtifactMap, FsArtifactFactory};
pub use list::{Artifact, ArtifactFile, ArtifactList};
