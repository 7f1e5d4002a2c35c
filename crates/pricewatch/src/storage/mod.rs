pub mod artifact;
pub mod layout;
pub mod resolver;

pub use artifact::{read_artifact, FileArtifact, FileTarget};
pub use layout::{ArtifactCategory, Layout};
pub use resolver::PathResolver;
