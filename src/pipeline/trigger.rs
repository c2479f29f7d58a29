use crate::config::Config;
use crate::database::entities::{events, pipeline_jobs};
use crate::pipeline::reader::JobReader;
use crate::pipeline::stage::StageKey;
use crate::pipeline::status::JobStatus;
use anyhow::{Context, Result};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeRequest {
    pub event_id: i32,
    pub run_id: String,
    pub report_url: String,
}

/// Acknowledgment from the stage worker. Processing itself happens
/// out-of-band afterward; job rows arrive through the report endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug)]
pub enum TriggerOutcome {
    /// A local precondition failed; nothing was sent to the worker.
    Refused { reason: String },
    /// The worker acknowledged the invocation (which may still be a
    /// rejection when `success` is false).
    Invoked {
        run_id: String,
        response: InvokeResponse,
    },
}

/// HTTP client for the remote stage-execution functions.
pub struct FunctionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl FunctionClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let functions = &config.project.functions;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(functions.timeout))
            .build()
            .context("Failed to build HTTP client for stage functions")?;

        Ok(Self {
            http,
            base_url: functions.base_url.trim_end_matches('/').to_string(),
            api_key: functions.resolved_api_key(&config.project_root)?,
        })
    }

    pub async fn invoke(
        &self,
        stage: StageKey,
        event_id: i32,
        run_id: &str,
        report_url: &str,
    ) -> Result<InvokeResponse> {
        let url = format!("{}/{}", self.base_url, stage.as_str());

        let mut request = self.http.post(&url).json(&InvokeRequest {
            event_id,
            run_id: run_id.to_string(),
            report_url: report_url.to_string(),
        });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to reach stage function '{stage}'"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "Stage function '{}' returned HTTP {}",
                stage,
                status
            ));
        }

        response
            .json::<InvokeResponse>()
            .await
            .with_context(|| format!("Stage function '{stage}' returned an unreadable response"))
    }
}

/// Local preconditions for starting a stage. Returns a user-facing reason
/// when the stage must not be triggered right now.
pub fn refusal_reason(
    event: &events::Model,
    stage: StageKey,
    latest: &HashMap<StageKey, pipeline_jobs::Model>,
    in_flight: bool,
) -> Option<String> {
    if in_flight {
        return Some(format!("Stage '{stage}' is already being started"));
    }

    if let Some(job) = latest.get(&stage) {
        if JobStatus::from(job.status.as_str()) == JobStatus::Processing {
            return Some(format!("Stage '{stage}' is still processing"));
        }
    }

    if let Some(predecessor) = stage.predecessor() {
        let predecessor_completed = latest
            .get(&predecessor)
            .map(|job| JobStatus::from(job.status.as_str()) == JobStatus::Completed)
            .unwrap_or(false);
        if !predecessor_completed {
            return Some(format!(
                "Stage '{predecessor}' must complete before '{stage}' can run"
            ));
        }
    } else if event.lead_count == 0 {
        return Some(format!(
            "Event '{}' has no leads to process. Import leads first",
            event.name
        ));
    }

    None
}

/// Fires a stage exactly once per call, after checking preconditions against
/// the latest job rows. Never writes job rows itself; the worker reports
/// them back out-of-band.
pub struct StageTrigger {
    reader: JobReader,
    functions: FunctionClient,
    report_url: String,
}

impl StageTrigger {
    pub fn new(db: DatabaseConnection, functions: FunctionClient, report_url: String) -> Self {
        Self {
            reader: JobReader::new(db),
            functions,
            report_url,
        }
    }

    pub async fn run_stage(
        &self,
        event: &events::Model,
        stage: StageKey,
        in_flight: bool,
    ) -> Result<TriggerOutcome> {
        let latest = self.reader.latest_jobs(event.id).await?;

        if let Some(reason) = refusal_reason(event, stage, &latest, in_flight) {
            return Ok(TriggerOutcome::Refused { reason });
        }

        let run_id = uuid::Uuid::new_v4().to_string();
        let response = self
            .functions
            .invoke(stage, event.id, &run_id, &self.report_url)
            .await?;

        info!(
            event_id = event.id,
            stage = %stage,
            run_id = %run_id,
            success = response.success,
            "stage invocation acknowledged"
        );

        Ok(TriggerOutcome::Invoked { run_id, response })
    }
}
