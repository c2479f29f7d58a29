use crate::config::Config;
use crate::pipeline::stage::StageKey;
use crate::pipeline::trigger::{FunctionClient, StageTrigger};
use anyhow::Result;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Router};
use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

pub mod events;
pub mod jobs;
pub mod pipeline;

#[derive(Debug)]
pub enum AppError {
    StatusCode(StatusCode),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::StatusCode(code) => code.into_response(),
            AppError::Internal(err) => {
                error!(error = ?err, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

pub fn app_error<T>(code: StatusCode) -> Result<T, AppError> {
    Err(AppError::StatusCode(code))
}

/// Shared state behind every API handler. `in_flight` tracks triggers that
/// have been fired but whose job row has not been observed yet, keyed by
/// (event, stage) with the run id the worker will report under.
pub struct ApiContext {
    pub db: DatabaseConnection,
    pub config: Config,
    pub trigger: StageTrigger,
    pub in_flight: Mutex<HashMap<(i32, StageKey), String>>,
}

impl ApiContext {
    pub fn new(config: Config, db: DatabaseConnection) -> Result<Self> {
        let functions = FunctionClient::from_config(&config)?;
        let report_url = config.project.server.report_url();
        let trigger = StageTrigger::new(db.clone(), functions, report_url);

        Ok(Self {
            db,
            config,
            trigger,
            in_flight: Mutex::new(HashMap::new()),
        })
    }
}

pub fn router(context: Arc<ApiContext>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .merge(events::routes())
        .merge(pipeline::routes())
        .merge(jobs::routes());

    Router::new()
        .nest("/api", api_routes)
        .layer(Extension(context))
        .layer(cors)
}

pub async fn serve(config: Config, db: DatabaseConnection) -> Result<()> {
    let host = config.project.server.host.clone();
    let port = config.project.server.port;

    let context = Arc::new(ApiContext::new(config, db)?);
    let app = router(context);

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    println!("API server listening on http://{host}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
