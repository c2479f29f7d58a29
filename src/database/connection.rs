use crate::config::project::{DatabaseType, ProjectConfig};
use crate::database::migration::Migrator;
use anyhow::Result;
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::prelude::*;

pub async fn connect_app_db(project_config: &ProjectConfig) -> Result<DatabaseConnection> {
    let db_url = match &project_config.database.ty {
        DatabaseType::Sqlite => {
            let path = &project_config.database.path;
            if let Some(parent) = std::path::Path::new(path).parent() {
                std::fs::create_dir_all(parent)?;
            }
            format!("sqlite://{path}?mode=rwc")
        }
    };

    let db = Database::connect(&db_url).await?;
    Ok(db)
}

pub async fn check_migration_status(db: &DatabaseConnection) -> Result<()> {
    let pending = Migrator::get_pending_migrations(db).await?;
    if !pending.is_empty() {
        let pending_names: Vec<String> = pending.iter().map(|m| m.name().to_string()).collect();
        return Err(anyhow::anyhow!(
            "There are pending migrations. Please run 'lflow migrate up' first.\nPending: {}",
            pending_names.join(", ")
        ));
    }
    Ok(())
}
