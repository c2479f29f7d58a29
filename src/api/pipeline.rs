use crate::api::{ApiContext, AppError, app_error};
use crate::events::EventStore;
use crate::pipeline::reader::JobReader;
use crate::pipeline::stage::StageKey;
use crate::pipeline::trigger::TriggerOutcome;
use crate::pipeline::view::PipelineView;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::Json;
use axum::{Extension, Router, routing::get, routing::post};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::error;

#[derive(Serialize, Deserialize)]
pub struct RunResponse {
    pub success: bool,
    pub message: String,
}

pub fn routes() -> Router {
    Router::new()
        .route("/events/{id}/pipeline", get(get_pipeline))
        .route("/events/{id}/pipeline/{stage}/run", post(run_stage))
}

async fn get_pipeline(
    Extension(context): Extension<Arc<ApiContext>>,
    Path(id): Path<i32>,
) -> Result<Json<PipelineView>, AppError> {
    let store = EventStore::new(context.db.clone());
    let Some(event) = store.find_by_id(id).await? else {
        return app_error(StatusCode::NOT_FOUND);
    };

    let reader = JobReader::new(context.db.clone());
    let latest = reader.latest_jobs(event.id).await?;

    // An in-flight trigger is cleared the moment its run's row shows up;
    // from then on the row itself drives the presentation.
    let mut in_flight = context.in_flight.lock().await;
    in_flight.retain(|(event_id, stage), run_id| {
        *event_id != event.id
            || latest
                .get(stage)
                .map(|job| job.run_id != *run_id)
                .unwrap_or(true)
    });
    let triggering: HashSet<StageKey> = in_flight
        .keys()
        .filter(|(event_id, _)| *event_id == event.id)
        .map(|(_, stage)| *stage)
        .collect();
    drop(in_flight);

    Ok(Json(PipelineView::build(&event, &latest, &triggering)))
}

async fn run_stage(
    Extension(context): Extension<Arc<ApiContext>>,
    Path((id, stage)): Path<(i32, String)>,
) -> Result<Json<RunResponse>, AppError> {
    let Ok(stage) = stage.parse::<StageKey>() else {
        return app_error(StatusCode::NOT_FOUND);
    };

    let store = EventStore::new(context.db.clone());
    let Some(event) = store.find_by_id(id).await? else {
        return app_error(StatusCode::NOT_FOUND);
    };

    // Claim the (event, stage) slot before awaiting anything, so a double
    // click cannot fire the function twice.
    {
        let mut in_flight = context.in_flight.lock().await;
        if in_flight.contains_key(&(event.id, stage)) {
            return Ok(Json(RunResponse {
                success: false,
                message: format!("Stage '{stage}' is already being started"),
            }));
        }
        in_flight.insert((event.id, stage), String::new());
    }

    let outcome = context.trigger.run_stage(&event, stage, false).await;

    let mut in_flight = context.in_flight.lock().await;
    match outcome {
        Ok(TriggerOutcome::Refused { reason }) => {
            in_flight.remove(&(event.id, stage));
            Ok(Json(RunResponse {
                success: false,
                message: reason,
            }))
        }
        Ok(TriggerOutcome::Invoked { run_id, response }) => {
            if response.success {
                in_flight.insert((event.id, stage), run_id);
            } else {
                in_flight.remove(&(event.id, stage));
            }
            Ok(Json(RunResponse {
                success: response.success,
                message: response.message,
            }))
        }
        Err(err) => {
            in_flight.remove(&(event.id, stage));
            error!(event_id = event.id, stage = %stage, error = ?err, "stage invocation failed");
            Ok(Json(RunResponse {
                success: false,
                message: format!("Failed to start stage '{stage}': {err}"),
            }))
        }
    }
}
