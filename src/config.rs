pub mod project;

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub use project::ProjectConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub project: ProjectConfig,
    pub project_root: PathBuf,
}

impl Config {
    pub fn load_from_directory(project_root: &Path) -> Result<Self> {
        let project_file = project_root.join("project.yml");
        let source = fs::read_to_string(&project_file)
            .with_context(|| format!("Failed to read {}", project_file.display()))?;

        let project: ProjectConfig = serde_yml::from_str(&source)
            .with_context(|| format!("Failed to parse {}", project_file.display()))?;

        Ok(Self {
            project,
            project_root: project_root.to_path_buf(),
        })
    }
}
