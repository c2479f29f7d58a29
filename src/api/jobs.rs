use crate::api::{ApiContext, AppError, app_error};
use crate::database::entities::{events, pipeline_jobs};
use crate::pipeline::stage::StageKey;
use crate::pipeline::status::JobStatus;
use anyhow::Result;
use axum::http::StatusCode;
use axum::response::Json;
use axum::{Extension, Router, routing::post};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, NotSet,
    QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Progress report from a stage worker. This endpoint is the only write
/// path for job rows; the console itself never touches them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub run_id: String,
    pub event_id: i32,
    pub stage: String,
    pub status: String,
    #[serde(default)]
    pub total_leads: i32,
    #[serde(default)]
    pub processed_leads: i32,
    #[serde(default)]
    pub failed_leads: i32,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug)]
pub enum ReportOutcome {
    Applied(pipeline_jobs::Model),
    Rejected { status: StatusCode, reason: String },
}

fn transition_allowed(from: JobStatus, to: JobStatus) -> bool {
    match (from, to) {
        (a, b) if a == b => true,
        (JobStatus::Pending, _) => true,
        (JobStatus::Processing, JobStatus::Completed | JobStatus::Failed) => true,
        _ => false,
    }
}

fn rejected(status: StatusCode, reason: impl Into<String>) -> ReportOutcome {
    ReportOutcome::Rejected {
        status,
        reason: reason.into(),
    }
}

/// Applies a worker report: the first report for a run id inserts the job
/// row, later ones update it. A status may only move forward; a re-run has
/// to arrive under a fresh run id.
pub async fn apply_report(db: &DatabaseConnection, report: JobReport) -> Result<ReportOutcome> {
    let Ok(stage) = report.stage.parse::<StageKey>() else {
        return Ok(rejected(
            StatusCode::BAD_REQUEST,
            format!("unknown stage '{}'", report.stage),
        ));
    };

    if events::Entity::find_by_id(report.event_id)
        .one(db)
        .await?
        .is_none()
    {
        return Ok(rejected(
            StatusCode::NOT_FOUND,
            format!("event {} does not exist", report.event_id),
        ));
    }

    if report.total_leads < 0 || report.processed_leads < 0 || report.failed_leads < 0 {
        return Ok(rejected(
            StatusCode::UNPROCESSABLE_ENTITY,
            "lead counts must not be negative",
        ));
    }
    if report.total_leads > 0 && report.processed_leads + report.failed_leads > report.total_leads {
        return Ok(rejected(
            StatusCode::UNPROCESSABLE_ENTITY,
            "processed + failed exceeds total",
        ));
    }

    let status = JobStatus::from(report.status.as_str());
    let now = chrono::Utc::now().naive_utc();

    let existing = pipeline_jobs::Entity::find()
        .filter(pipeline_jobs::Column::RunId.eq(&report.run_id))
        .one(db)
        .await?;

    let model = match existing {
        None => {
            let job = pipeline_jobs::ActiveModel {
                id: NotSet,
                event_id: Set(report.event_id),
                run_id: Set(report.run_id),
                stage: Set(stage.as_str().to_string()),
                status: Set(status.as_str().to_string()),
                total_leads: Set(report.total_leads),
                processed_leads: Set(report.processed_leads),
                failed_leads: Set(report.failed_leads),
                error_message: Set(report.error_message),
                created_at: Set(now),
                started_at: Set((status != JobStatus::Pending).then_some(now)),
                completed_at: Set(status.is_terminal().then_some(now)),
                updated_at: Set(now),
            };
            job.insert(db).await?
        }
        Some(row) => {
            if row.event_id != report.event_id || row.stage != stage.as_str() {
                return Ok(rejected(
                    StatusCode::CONFLICT,
                    format!("run '{}' belongs to a different stage", row.run_id),
                ));
            }

            let current = JobStatus::from(row.status.as_str());
            if !transition_allowed(current, status) {
                return Ok(rejected(
                    StatusCode::CONFLICT,
                    format!(
                        "job cannot move from '{current}' to '{status}'; re-runs use a new run id"
                    ),
                ));
            }

            let started_at = row.started_at;
            let completed_at = row.completed_at;
            let mut active = row.into_active_model();
            active.status = Set(status.as_str().to_string());
            active.total_leads = Set(report.total_leads);
            active.processed_leads = Set(report.processed_leads);
            active.failed_leads = Set(report.failed_leads);
            active.error_message = Set(report.error_message);
            if started_at.is_none() && status != JobStatus::Pending {
                active.started_at = Set(Some(now));
            }
            if completed_at.is_none() && status.is_terminal() {
                active.completed_at = Set(Some(now));
            }
            active.updated_at = Set(now);
            active.update(db).await?
        }
    };

    Ok(ReportOutcome::Applied(model))
}

pub fn routes() -> Router {
    Router::new().route("/jobs/report", post(report_job))
}

async fn report_job(
    Extension(context): Extension<Arc<ApiContext>>,
    Json(report): Json<JobReport>,
) -> Result<StatusCode, AppError> {
    match apply_report(&context.db, report).await? {
        ReportOutcome::Applied(_) => Ok(StatusCode::OK),
        ReportOutcome::Rejected { status, reason } => {
            warn!(%reason, "job report rejected");
            app_error(status)
        }
    }
}
