use anyhow::Result;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::commands::open_project;
use crate::events::EventStore;
use crate::pipeline::poller::StatusPoller;
use crate::pipeline::reader::JobReader;
use crate::pipeline::stage::StageKey;
use crate::pipeline::trigger::{FunctionClient, StageTrigger, TriggerOutcome};
use crate::pipeline::view::{PipelineView, StageCard, StageViewStatus};

pub async fn execute_pipeline_status(event_name: &str, project_path: &Path) -> Result<()> {
    let (_config, db) = open_project(project_path).await?;

    let store = EventStore::new(db.clone());
    let event = store
        .find_by_name(event_name)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Event '{}' not found", event_name))?;

    let reader = JobReader::new(db);
    let latest = reader.latest_jobs(event.id).await?;
    let view = PipelineView::build(&event, &latest, &HashSet::new());

    render_pipeline(&view);
    Ok(())
}

pub async fn execute_pipeline_run(
    event_name: &str,
    stage_name: &str,
    watch: bool,
    project_path: &Path,
) -> Result<()> {
    let stage: StageKey = stage_name.parse()?;

    let (config, db) = open_project(project_path).await?;

    let store = EventStore::new(db.clone());
    let event = store
        .find_by_name(event_name)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Event '{}' not found", event_name))?;

    let functions = FunctionClient::from_config(&config)?;
    let report_url = config.project.server.report_url();
    let trigger = StageTrigger::new(db.clone(), functions, report_url);

    match trigger.run_stage(&event, stage, false).await? {
        TriggerOutcome::Refused { reason } => {
            return Err(anyhow::anyhow!(reason));
        }
        TriggerOutcome::Invoked { response, .. } => {
            if !response.success {
                return Err(anyhow::anyhow!(
                    "Stage '{}' was not started: {}",
                    stage,
                    response.message
                ));
            }
            println!("Stage '{stage}' started: {}", response.message);
        }
    }

    if watch {
        watch_event(&config, &db, event_name).await
    } else {
        // One follow-up read; the worker reports arrive out-of-band.
        execute_pipeline_status(event_name, project_path).await?;
        println!("Follow progress with 'lflow pipeline watch {event_name}'");
        Ok(())
    }
}

pub async fn execute_pipeline_watch(event_name: &str, project_path: &Path) -> Result<()> {
    let (config, db) = open_project(project_path).await?;
    watch_event(&config, &db, event_name).await
}

async fn watch_event(
    config: &crate::config::Config,
    db: &sea_orm::DatabaseConnection,
    event_name: &str,
) -> Result<()> {
    let store = EventStore::new(db.clone());
    let event = store
        .find_by_name(event_name)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Event '{}' not found", event_name))?;

    let interval = Duration::from_secs(config.project.polling.interval.max(1));
    let grace = interval * 3;

    let (poller, mut snapshots) = StatusPoller::spawn(db.clone(), event.id, interval, grace);

    while snapshots.changed().await.is_ok() {
        let snapshot = snapshots.borrow().clone();
        let view = PipelineView::build(&event, &snapshot.stages, &HashSet::new());
        println!();
        render_pipeline(&view);
    }

    poller.join().await?;
    println!("\nAll stages settled.");
    Ok(())
}

pub fn render_pipeline(view: &PipelineView) {
    println!("Pipeline for '{}' ({} leads)", view.event_name, view.lead_count);
    for card in &view.stages {
        println!("{}", format_stage_line(card));
        if let Some(error) = &card.error_message {
            println!("        error: {error}");
        }
    }
}

fn format_stage_line(card: &StageCard) -> String {
    let marker = match card.status {
        StageViewStatus::Completed => "✓",
        StageViewStatus::Failed => "⚠",
        StageViewStatus::InProgress => "›",
        StageViewStatus::Pending => " ",
    };
    let label = match card.status {
        StageViewStatus::Completed => "completed",
        StageViewStatus::Failed => "failed",
        StageViewStatus::InProgress => "in progress",
        StageViewStatus::Pending => "pending",
    };

    let mut line = format!("  [{marker}] {:<18} {:<12}", card.key.to_string(), label);

    if let Some(progress) = card.progress {
        line.push_str(&format!(" {progress:>3}%"));
    }
    if let Some(stats) = &card.stats {
        line.push_str(&format!("  ({stats})"));
    }
    if card.status == StageViewStatus::Pending && !card.available {
        if let Some(predecessor) = card.key.predecessor() {
            line.push_str(&format!("  waiting on {predecessor}"));
        }
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{JobSeed, insert_job, write_test_project};

    #[test]
    fn test_format_stage_line_variants() {
        let card = StageCard {
            key: StageKey::Validate,
            title: "Validate emails".to_string(),
            description: String::new(),
            status: StageViewStatus::InProgress,
            available: true,
            progress: Some(20),
            stats: Some("10/50 processed".to_string()),
            error_message: None,
        };
        let line = format_stage_line(&card);
        assert!(line.contains("validate"));
        assert!(line.contains("in progress"));
        assert!(line.contains("20%"));
        assert!(line.contains("10/50 processed"));

        let blocked = StageCard {
            key: StageKey::Enrich,
            title: "Enrich leads".to_string(),
            description: String::new(),
            status: StageViewStatus::Pending,
            available: false,
            progress: None,
            stats: None,
            error_message: None,
        };
        let line = format_stage_line(&blocked);
        assert!(line.contains("waiting on check_salesforce"));
    }

    #[tokio::test]
    async fn test_pipeline_status_renders_for_existing_event() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        write_test_project(temp_dir.path()).await?;

        let (_config, db) = open_project(temp_dir.path()).await?;
        let store = EventStore::new(db.clone());
        let event = store.create("spring-webinar", None).await?;
        insert_job(
            &db,
            JobSeed::builder()
                .event_id(event.id)
                .stage(StageKey::Validate)
                .status("completed")
                .total(10)
                .processed(10)
                .build(),
        )
        .await?;

        execute_pipeline_status("spring-webinar", temp_dir.path()).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_pipeline_run_rejects_unknown_stage() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        write_test_project(temp_dir.path()).await?;

        let result = execute_pipeline_run("spring-webinar", "notify", false, temp_dir.path()).await;
        assert!(result.is_err());

        Ok(())
    }
}
