use crate::database::entities::{events, pipeline_jobs};
use crate::pipeline::stage::{STAGES, StageKey};
use crate::pipeline::status::JobStatus;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Presentation status of one stage card. Distinct from [`JobStatus`]: it
/// also covers stages that have never run and the optimistic window between
/// a trigger click and the first job row reflecting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageViewStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCard {
    pub key: StageKey,
    pub title: String,
    pub description: String,
    pub status: StageViewStatus,
    pub available: bool,
    pub progress: Option<u8>,
    pub stats: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineView {
    pub event_id: i32,
    pub event_name: String,
    pub lead_count: i32,
    pub stages: Vec<StageCard>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedStage {
    pub status: StageViewStatus,
    pub progress: Option<u8>,
    pub stats: Option<String>,
    pub error_message: Option<String>,
}

/// Maps a stage's latest job row plus the local in-flight trigger flag into
/// presentation state. Pure; the only inputs are the arguments.
pub fn derive_stage(job: Option<&pipeline_jobs::Model>, triggering: bool) -> DerivedStage {
    let raw = job.map(|j| JobStatus::from(j.status.as_str()));

    // A click is shown as in-progress immediately; the stale row underneath
    // (or no row at all) would otherwise leave the button looking inert
    // until the worker's first report lands.
    if triggering && !matches!(raw, Some(JobStatus::Processing)) {
        return DerivedStage {
            status: StageViewStatus::InProgress,
            progress: None,
            stats: None,
            error_message: None,
        };
    }

    let (Some(job), Some(status)) = (job, raw) else {
        return DerivedStage {
            status: StageViewStatus::Pending,
            progress: None,
            stats: None,
            error_message: None,
        };
    };

    DerivedStage {
        status: match status {
            JobStatus::Pending => StageViewStatus::Pending,
            JobStatus::Processing => StageViewStatus::InProgress,
            JobStatus::Completed => StageViewStatus::Completed,
            JobStatus::Failed => StageViewStatus::Failed,
        },
        progress: progress_percent(job, status),
        stats: stats_text(job, status),
        error_message: match status {
            JobStatus::Failed => job.error_message.clone(),
            _ => None,
        },
    }
}

/// A completed run always reads 100% even when some leads failed; partial
/// failure is a terminal success, not a stalled bar.
fn progress_percent(job: &pipeline_jobs::Model, status: JobStatus) -> Option<u8> {
    if job.total_leads <= 0 {
        return None;
    }

    match status {
        JobStatus::Pending => None,
        JobStatus::Completed => Some(100),
        JobStatus::Processing | JobStatus::Failed => {
            let percent = (job.processed_leads as f64 / job.total_leads as f64) * 100.0;
            Some(percent.round().clamp(0.0, 100.0) as u8)
        }
    }
}

fn stats_text(job: &pipeline_jobs::Model, status: JobStatus) -> Option<String> {
    match status {
        JobStatus::Pending => None,
        JobStatus::Processing => Some(format!(
            "{}/{} processed",
            job.processed_leads, job.total_leads
        )),
        JobStatus::Completed | JobStatus::Failed => Some(format!(
            "{} processed, {} failed",
            job.processed_leads, job.failed_leads
        )),
    }
}

/// Gating reads the persisted rows only. An optimistic in-flight re-run of a
/// completed stage must not flip the stages after it back to disabled; they
/// close only once the new attempt's row actually lands.
pub fn stage_available(stage: StageKey, latest: &HashMap<StageKey, pipeline_jobs::Model>) -> bool {
    match stage.predecessor() {
        None => true,
        Some(predecessor) => latest
            .get(&predecessor)
            .map(|job| JobStatus::from(job.status.as_str()) == JobStatus::Completed)
            .unwrap_or(false),
    }
}

impl PipelineView {
    pub fn build(
        event: &events::Model,
        latest: &HashMap<StageKey, pipeline_jobs::Model>,
        in_flight: &HashSet<StageKey>,
    ) -> Self {
        let stages = STAGES
            .iter()
            .map(|definition| {
                let derived = derive_stage(
                    latest.get(&definition.key),
                    in_flight.contains(&definition.key),
                );
                StageCard {
                    key: definition.key,
                    title: definition.title.to_string(),
                    description: definition.description.to_string(),
                    status: derived.status,
                    available: stage_available(definition.key, latest),
                    progress: derived.progress,
                    stats: derived.stats,
                    error_message: derived.error_message,
                }
            })
            .collect();

        PipelineView {
            event_id: event.id,
            event_name: event.name.clone(),
            lead_count: event.lead_count,
            stages,
        }
    }
}
