//! Locates readable artifacts across deployment layouts.
//!
//! The worker and the serving process do not always agree on where output
//! lands (build output vs. runtime directories), so every read goes through
//! [`PathResolver::resolve`]: the primary path first, then each fallback
//! directory of the artifact's category, in order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::debug;

use crate::config::PricewatchConfig;
use crate::storage::layout::{ArtifactCategory, Layout};

#[derive(Debug, Clone)]
pub struct PathResolver {
    layout: Layout,
    fallbacks: HashMap<ArtifactCategory, Vec<PathBuf>>,
}

impl PathResolver {
    /// Resolver with no fallback directories.
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            fallbacks: HashMap::new(),
        }
    }

    /// Builds the resolver from config, using built-in fallbacks for every
    /// category the config leaves unset.
    pub fn from_config(config: &PricewatchConfig) -> Self {
        let layout = Layout::new(&config.module_root);
        let root = layout.root().to_path_buf();
        let mut resolver = Self::new(layout);

        for category in ArtifactCategory::ALL {
            let configured = match category {
                ArtifactCategory::Outputs => &config.fallback_dirs.outputs,
                ArtifactCategory::Archive => &config.fallback_dirs.archive,
                ArtifactCategory::Logs => &config.fallback_dirs.logs,
            };
            let dirs = match configured {
                Some(dirs) => dirs.iter().map(|d| root.join(d)).collect(),
                None => default_fallbacks(&root, category),
            };
            resolver = resolver.with_fallbacks(category, dirs);
        }

        resolver
    }

    pub fn with_fallbacks(mut self, category: ArtifactCategory, dirs: Vec<PathBuf>) -> Self {
        self.fallbacks.insert(category, dirs);
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn fallback_dirs(&self, category: ArtifactCategory) -> &[PathBuf] {
        self.fallbacks
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Primary directory of `category` followed by its fallbacks, without
    /// duplicates.
    pub fn search_dirs(&self, category: ArtifactCategory) -> Vec<PathBuf> {
        let mut dirs = vec![self.layout.dir(category)];
        for dir in self.fallback_dirs(category) {
            if !dirs.contains(dir) {
                dirs.push(dir.clone());
            }
        }
        dirs
    }

    /// Returns the first readable location of `primary`, or `None`.
    pub fn resolve(&self, category: ArtifactCategory, primary: &Path) -> Option<PathBuf> {
        if primary.is_file() {
            return Some(primary.to_path_buf());
        }

        let file_name = primary.file_name()?;
        for dir in self.fallback_dirs(category) {
            let candidate = dir.join(file_name);
            if candidate.is_file() {
                debug!(
                    "Resolved {} via {} fallback {}",
                    primary.display(),
                    category,
                    candidate.display()
                );
                return Some(candidate);
            }
        }

        debug!(
            "{} not found in primary location or {} {} fallback dir(s)",
            primary.display(),
            self.fallback_dirs(category).len(),
            category
        );
        None
    }
}

fn default_fallbacks(root: &Path, category: ArtifactCategory) -> Vec<PathBuf> {
    vec![
        root.join("runtime").join(category.dir_name()),
        root.join("data-acquisition")
            .join("runtime")
            .join(category.dir_name()),
    ]
}
