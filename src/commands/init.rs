use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::commands::validate_name;
use crate::secret::SecretManager;

pub fn execute_init(project_name: &str, current_dir: &Path) -> Result<()> {
    validate_name(project_name)?;

    let project_path = current_dir.join(project_name);

    if project_path.exists() {
        return Err(anyhow::anyhow!(
            "Directory '{}' already exists",
            project_name
        ));
    }

    fs::create_dir_all(&project_path)
        .with_context(|| format!("Failed to create project directory '{project_name}'"))?;
    fs::create_dir_all(project_path.join("imports"))
        .context("Failed to create imports directory")?;

    create_project_yml(&project_path, project_name)?;
    ensure_secret_key(&project_path)?;

    println!(
        "LeadFlow project '{}' initialized at {}",
        project_name,
        project_path.display()
    );
    println!("Next: 'lflow event new <name>' and drop lead files under imports/");
    Ok(())
}

fn create_project_yml(project_path: &Path, project_name: &str) -> Result<()> {
    let project_yml_content = format!(
        r#"name: {project_name}

database:
  type: sqlite
  path: ./leadflow.db

functions:
  base_url: https://functions.example.com/leadflow
  # api_key: ${{secret.functions_api_key}}
  timeout: 30

server:
  host: 127.0.0.1
  port: 4800

polling:
  interval: 3
"#
    );

    fs::write(project_path.join("project.yml"), project_yml_content)
        .context("Failed to write project.yml")?;

    Ok(())
}

fn ensure_secret_key(project_path: &Path) -> Result<()> {
    let manager = SecretManager::new(project_path)?;
    if !manager.key_exists() {
        manager.generate_key()?;
    }
    Ok(())
}
