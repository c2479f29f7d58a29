use crate::api::{ApiContext, AppError, app_error};
use crate::events::EventStore;
use crate::leads::{ImportSummary, LeadImporter, LeadRecord};
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::Json;
use axum::{Extension, Router, routing::get};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Serialize, Deserialize)]
pub struct EventSummary {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub lead_count: i32,
}

#[derive(Deserialize)]
pub struct CreateEventRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct ImportLeadsRequest {
    pub leads: Vec<LeadRecord>,
}

#[derive(Serialize, Deserialize)]
pub struct LeadSummary {
    pub id: i32,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
}

pub fn routes() -> Router {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/{id}", get(get_event).delete(delete_event))
        .route(
            "/events/{id}/leads",
            get(list_leads).post(import_leads).delete(clear_leads),
        )
}

fn summarize(event: crate::database::entities::events::Model) -> EventSummary {
    EventSummary {
        id: event.id,
        name: event.name,
        description: event.description,
        lead_count: event.lead_count,
    }
}

async fn list_events(
    Extension(context): Extension<Arc<ApiContext>>,
) -> Result<Json<Vec<EventSummary>>, AppError> {
    let store = EventStore::new(context.db.clone());
    let events = store.list().await?.into_iter().map(summarize).collect();
    Ok(Json(events))
}

async fn create_event(
    Extension(context): Extension<Arc<ApiContext>>,
    Json(req): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventSummary>), AppError> {
    if req.name.trim().is_empty() {
        return app_error(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let store = EventStore::new(context.db.clone());
    if store.find_by_name(&req.name).await?.is_some() {
        return app_error(StatusCode::CONFLICT);
    }

    let event = store.create(&req.name, req.description.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(summarize(event))))
}

async fn get_event(
    Extension(context): Extension<Arc<ApiContext>>,
    Path(id): Path<i32>,
) -> Result<Json<EventSummary>, AppError> {
    let store = EventStore::new(context.db.clone());
    match store.find_by_id(id).await? {
        Some(event) => Ok(Json(summarize(event))),
        None => app_error(StatusCode::NOT_FOUND),
    }
}

async fn delete_event(
    Extension(context): Extension<Arc<ApiContext>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let store = EventStore::new(context.db.clone());
    match store.find_by_id(id).await? {
        Some(event) => {
            store.delete(event).await?;
            Ok(StatusCode::NO_CONTENT)
        }
        None => app_error(StatusCode::NOT_FOUND),
    }
}

async fn list_leads(
    Extension(context): Extension<Arc<ApiContext>>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<LeadSummary>>, AppError> {
    let store = EventStore::new(context.db.clone());
    if store.find_by_id(id).await?.is_none() {
        return app_error(StatusCode::NOT_FOUND);
    }

    let importer = LeadImporter::new(context.db.clone());
    let leads = importer
        .list(id)
        .await?
        .into_iter()
        .map(|lead| LeadSummary {
            id: lead.id,
            email: lead.email,
            first_name: lead.first_name,
            last_name: lead.last_name,
            company: lead.company,
        })
        .collect();

    Ok(Json(leads))
}

async fn clear_leads(
    Extension(context): Extension<Arc<ApiContext>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let store = EventStore::new(context.db.clone());
    if store.find_by_id(id).await?.is_none() {
        return app_error(StatusCode::NOT_FOUND);
    }

    let importer = LeadImporter::new(context.db.clone());
    importer.clear(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn import_leads(
    Extension(context): Extension<Arc<ApiContext>>,
    Path(id): Path<i32>,
    Json(req): Json<ImportLeadsRequest>,
) -> Result<Json<ImportSummary>, AppError> {
    let store = EventStore::new(context.db.clone());
    if store.find_by_id(id).await?.is_none() {
        return app_error(StatusCode::NOT_FOUND);
    }

    let importer = LeadImporter::new(context.db.clone());
    let summary = importer.import(id, req.leads).await?;
    Ok(Json(summary))
}
