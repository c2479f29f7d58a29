use anyhow::Result;
use sea_orm_migration::MigratorTrait;
use std::path::Path;

use crate::config::Config;
use crate::database::connect_app_db;
use crate::database::migration::Migrator;
use crate::workspace::ensure_project_directory;

pub async fn execute_migrate_up(project_path: &Path) -> Result<()> {
    let project_root = ensure_project_directory(Some(project_path))?;
    let config = Config::load_from_directory(&project_root)?;

    let db = connect_app_db(&config.project).await?;
    Migrator::up(&db, None).await?;

    println!("Database is up to date.");
    Ok(())
}

pub async fn execute_migrate_status(project_path: &Path) -> Result<()> {
    let project_root = ensure_project_directory(Some(project_path))?;
    let config = Config::load_from_directory(&project_root)?;

    let db = connect_app_db(&config.project).await?;
    let pending = Migrator::get_pending_migrations(&db).await?;

    if pending.is_empty() {
        println!("No pending migrations.");
    } else {
        println!("Pending migrations:");
        for migration in pending {
            println!("  {}", migration.name());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::check_migration_status;
    use std::fs;

    fn write_minimal_project(project_path: &Path) -> Result<()> {
        let db_path = project_path.join("leadflow.db");
        fs::write(
            project_path.join("project.yml"),
            format!(
                r#"name: test

database:
  type: sqlite
  path: {}

functions:
  base_url: http://127.0.0.1:1
"#,
                db_path.to_string_lossy()
            ),
        )?;
        Ok(())
    }

    #[tokio::test]
    async fn test_migrate_up_applies_all_migrations() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        write_minimal_project(temp_dir.path())?;

        execute_migrate_up(temp_dir.path()).await?;

        let config = Config::load_from_directory(temp_dir.path())?;
        let db = connect_app_db(&config.project).await?;
        assert!(check_migration_status(&db).await.is_ok());

        Ok(())
    }

    #[tokio::test]
    async fn test_migrate_status_runs_before_and_after() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        write_minimal_project(temp_dir.path())?;

        execute_migrate_status(temp_dir.path()).await?;
        execute_migrate_up(temp_dir.path()).await?;
        execute_migrate_status(temp_dir.path()).await?;

        Ok(())
    }
}
