pub mod event;
pub mod init;
pub mod leads;
pub mod migrate;
pub mod pipeline;
pub mod secret;
pub mod serve;

use crate::config::Config;
use crate::database::{check_migration_status, connect_app_db};
use crate::workspace::ensure_project_directory;
use anyhow::Result;
use sea_orm::DatabaseConnection;
use std::path::Path;

pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(anyhow::anyhow!("Name cannot be empty"));
    }

    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return Err(anyhow::anyhow!(
            "Name can only contain alphanumeric characters, underscores, and hyphens"
        ));
    }

    Ok(())
}

/// Opens the surrounding project: config plus a migrated app database.
/// Everything except `init` and `migrate` goes through here.
pub async fn open_project(project_path: &Path) -> Result<(Config, DatabaseConnection)> {
    let project_root = ensure_project_directory(Some(project_path))?;
    let config = Config::load_from_directory(&project_root)?;

    let db = connect_app_db(&config.project).await?;
    check_migration_status(&db).await?;

    Ok((config, db))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name_accepts_common_forms() {
        assert!(validate_name("spring-webinar").is_ok());
        assert!(validate_name("expo_2026").is_ok());
        assert!(validate_name("q3").is_ok());
    }

    #[test]
    fn test_validate_name_rejects_bad_input() {
        assert!(validate_name("").is_err());
        assert!(validate_name("has space").is_err());
        assert!(validate_name("slash/name").is_err());
    }
}
