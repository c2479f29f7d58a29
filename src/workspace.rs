use anyhow::{Context, Result};
use std::cell::RefCell;
use std::path::{Path, PathBuf};

thread_local! {
    static PROJECT_DIR_OVERRIDE: RefCell<Option<PathBuf>> = const { RefCell::new(None) };
}

#[cfg(test)]
pub fn set_project_dir_override(path: PathBuf) {
    PROJECT_DIR_OVERRIDE.with(|p| {
        *p.borrow_mut() = Some(path);
    });
}

#[cfg(test)]
pub fn clear_project_dir_override() {
    PROJECT_DIR_OVERRIDE.with(|p| {
        *p.borrow_mut() = None;
    });
}

pub fn project_dir() -> Result<PathBuf> {
    if let Some(path) = PROJECT_DIR_OVERRIDE.with(|p| p.borrow().clone()) {
        return Ok(path);
    }

    if let Ok(path) = std::env::var("LEADFLOW_PROJECT_DIRECTORY") {
        return Ok(PathBuf::from(path));
    }
    Ok(std::env::current_dir()?)
}

pub fn find_project_root(start_dir: Option<&Path>) -> Result<PathBuf> {
    let project_dir = match start_dir {
        Some(dir) => dir.to_path_buf(),
        None => project_dir()?,
    };

    let project_file = project_dir.join("project.yml");
    if project_file.exists() {
        return Ok(project_dir);
    }

    Err(anyhow::anyhow!("Not in a LeadFlow project directory"))
}

pub fn ensure_project_directory(start_dir: Option<&Path>) -> Result<PathBuf> {
    find_project_root(start_dir).context("This command must be run inside a LeadFlow project")
}
