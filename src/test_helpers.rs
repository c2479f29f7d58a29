#[cfg(test)]
use crate::config::project::{
    DatabaseConfig, DatabaseType, FunctionsConfig, PollingConfig, ProjectConfig, ServerConfig,
};
#[cfg(test)]
use crate::database::connection::connect_app_db;
#[cfg(test)]
use crate::database::entities::{events, pipeline_jobs};
#[cfg(test)]
use crate::database::migration::Migrator;
#[cfg(test)]
use crate::pipeline::stage::StageKey;
#[cfg(test)]
use anyhow::Result;
#[cfg(test)]
use sea_orm::{ActiveModelTrait, DatabaseConnection, NotSet, Set};
#[cfg(test)]
use sea_orm_migration::MigratorTrait;
#[cfg(test)]
use std::path::Path;
#[cfg(test)]
use typed_builder::TypedBuilder;

#[cfg(test)]
pub fn project_config_for_db_path(db_path: &Path) -> ProjectConfig {
    ProjectConfig {
        name: "test".to_string(),
        database: DatabaseConfig {
            ty: DatabaseType::Sqlite,
            path: db_path.to_string_lossy().to_string(),
        },
        functions: FunctionsConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: None,
            timeout: 1,
        },
        server: ServerConfig::default(),
        polling: PollingConfig::default(),
    }
}

/// Writes a loadable project.yml into the directory and migrates its app
/// database, so command-level tests can run against a real project layout.
#[cfg(test)]
pub async fn write_test_project(project_path: &Path) -> Result<()> {
    let db_path = project_path.join("leadflow.db");
    std::fs::write(
        project_path.join("project.yml"),
        format!(
            r#"name: test

database:
  type: sqlite
  path: {}

functions:
  base_url: http://127.0.0.1:1
  timeout: 1
"#,
            db_path.to_string_lossy()
        ),
    )?;

    let config = crate::config::Config::load_from_directory(project_path)?;
    let db = connect_app_db(&config.project).await?;
    Migrator::up(&db, None).await?;

    Ok(())
}

#[cfg(test)]
pub async fn setup_test_db_connection() -> Result<DatabaseConnection> {
    let temp_dir = tempfile::tempdir()?;
    let db_path = temp_dir.path().join("test.db");

    let project_config = project_config_for_db_path(&db_path);

    let db = connect_app_db(&project_config).await?;
    Migrator::up(&db, None).await?;
    std::mem::forget(temp_dir);
    Ok(db)
}

#[cfg(test)]
pub async fn insert_event(
    db: &DatabaseConnection,
    name: &str,
    lead_count: i32,
) -> Result<events::Model> {
    let now = chrono::Utc::now().naive_utc();
    let event = events::ActiveModel {
        id: NotSet,
        name: Set(name.to_string()),
        description: Set(None),
        lead_count: Set(lead_count),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(event.insert(db).await?)
}

#[cfg(test)]
#[derive(TypedBuilder)]
pub struct JobSeed {
    pub event_id: i32,
    pub stage: StageKey,
    #[builder(default = "pending".to_string(), setter(into))]
    pub status: String,
    #[builder(default = 0)]
    pub total: i32,
    #[builder(default = 0)]
    pub processed: i32,
    #[builder(default = 0)]
    pub failed: i32,
    #[builder(default)]
    pub error_message: Option<String>,
    #[builder(default = chrono::Utc::now().naive_utc())]
    pub created_at: chrono::NaiveDateTime,
    #[builder(default = uuid::Uuid::new_v4().to_string(), setter(into))]
    pub run_id: String,
}

#[cfg(test)]
pub async fn insert_job(db: &DatabaseConnection, seed: JobSeed) -> Result<pipeline_jobs::Model> {
    let job = pipeline_jobs::ActiveModel {
        id: NotSet,
        event_id: Set(seed.event_id),
        run_id: Set(seed.run_id),
        stage: Set(seed.stage.as_str().to_string()),
        status: Set(seed.status),
        total_leads: Set(seed.total),
        processed_leads: Set(seed.processed),
        failed_leads: Set(seed.failed),
        error_message: Set(seed.error_message),
        created_at: Set(seed.created_at),
        started_at: Set(None),
        completed_at: Set(None),
        updated_at: Set(seed.created_at),
    };
    Ok(job.insert(db).await?)
}
