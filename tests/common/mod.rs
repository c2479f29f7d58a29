use anyhow::Result;
use leadflow::api::jobs::{JobReport, ReportOutcome, apply_report};
use leadflow::config::Config;
use leadflow::database::connect_app_db;
use leadflow::database::entities::pipeline_jobs;
use leadflow::database::migration::Migrator;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use std::fs;
use std::path::Path;

pub async fn setup_project(project_path: &Path) -> Result<(Config, DatabaseConnection)> {
    let db_path = project_path.join("leadflow.db");
    fs::write(
        project_path.join("project.yml"),
        format!(
            r#"name: integration

database:
  type: sqlite
  path: {}

functions:
  base_url: http://127.0.0.1:1
  timeout: 1

polling:
  interval: 1
"#,
            db_path.to_string_lossy()
        ),
    )?;

    let config = Config::load_from_directory(project_path)?;
    let db = connect_app_db(&config.project).await?;
    Migrator::up(&db, None).await?;

    Ok((config, db))
}

pub fn report(
    run_id: &str,
    event_id: i32,
    stage: &str,
    status: &str,
    total: i32,
    processed: i32,
    failed: i32,
) -> JobReport {
    JobReport {
        run_id: run_id.to_string(),
        event_id,
        stage: stage.to_string(),
        status: status.to_string(),
        total_leads: total,
        processed_leads: processed,
        failed_leads: failed,
        error_message: None,
    }
}

pub async fn report_applied(
    db: &DatabaseConnection,
    job_report: JobReport,
) -> Result<pipeline_jobs::Model> {
    match apply_report(db, job_report).await? {
        ReportOutcome::Applied(model) => Ok(model),
        ReportOutcome::Rejected { reason, .. } => {
            Err(anyhow::anyhow!("report unexpectedly rejected: {reason}"))
        }
    }
}
