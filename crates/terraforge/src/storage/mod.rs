pub mod artifacts;

pub use artifacts::{ArtifactPaths, ArtifactStore};
