use crate::database::entities::pipeline_jobs;
use crate::pipeline::reader::JobReader;
use crate::pipeline::stage::StageKey;
use crate::pipeline::status::JobStatus;
use anyhow::Result;
use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

/// Latest job row per stage, as observed by one poll cycle.
#[derive(Debug, Clone, Default)]
pub struct PipelineSnapshot {
    pub stages: HashMap<StageKey, pipeline_jobs::Model>,
}

impl PipelineSnapshot {
    pub fn all_terminal(&self) -> bool {
        self.stages
            .values()
            .all(|job| JobStatus::from(job.status.as_str()).is_terminal())
    }
}

/// Background task that re-reads job status on a fixed interval and
/// publishes each snapshot over a watch channel. It stops itself once every
/// observed job is terminal; `grace` covers the window right after a trigger
/// where the new attempt's row has not landed yet and the table would
/// otherwise look quiescent.
pub struct StatusPoller {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl StatusPoller {
    pub fn spawn(
        db: DatabaseConnection,
        event_id: i32,
        interval: Duration,
        grace: Duration,
    ) -> (Self, watch::Receiver<PipelineSnapshot>) {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let (snapshot_tx, snapshot_rx) = watch::channel(PipelineSnapshot::default());

        let handle = tokio::spawn(async move {
            let reader = JobReader::new(db);
            let started = Instant::now();
            let mut ticker = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {}
                }

                match reader.latest_jobs(event_id).await {
                    Ok(stages) => {
                        let snapshot = PipelineSnapshot { stages };
                        let done = snapshot.all_terminal() && started.elapsed() >= grace;
                        snapshot_tx.send_replace(snapshot);
                        if done {
                            break;
                        }
                    }
                    Err(err) => {
                        // Transient read failure: keep the last snapshot and
                        // try again on the next tick.
                        warn!(event_id, error = ?err, "job status read failed");
                    }
                }
            }
        });

        (StatusPoller { stop_tx, handle }, snapshot_rx)
    }

    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    pub async fn join(self) -> Result<()> {
        self.handle.await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{JobSeed, insert_event, insert_job, setup_test_db_connection};
    use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};

    #[tokio::test]
    async fn test_poller_finishes_once_all_terminal() -> Result<()> {
        let db = setup_test_db_connection().await?;
        let event = insert_event(&db, "spring-webinar", 10).await?;
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

        let (poller, mut snapshots) = StatusPoller::spawn(
            db,
            event.id,
            Duration::from_millis(10),
            Duration::ZERO,
        );

        tokio::time::timeout(Duration::from_secs(5), poller.join()).await??;

        snapshots.borrow_and_update();
        let snapshot = snapshots.borrow();
        assert!(snapshot.all_terminal());
        assert_eq!(snapshot.stages[&StageKey::Validate].status, "completed");

        Ok(())
    }

    #[tokio::test]
    async fn test_poller_observes_status_transition() -> Result<()> {
        let db = setup_test_db_connection().await?;
        let event = insert_event(&db, "spring-webinar", 10).await?;
        let job = insert_job(
            &db,
            JobSeed::builder()
                .event_id(event.id)
                .stage(StageKey::Validate)
                .status("processing")
                .total(10)
                .processed(2)
                .build(),
        )
        .await?;

        let (poller, mut snapshots) = StatusPoller::spawn(
            db.clone(),
            event.id,
            Duration::from_millis(10),
            Duration::ZERO,
        );

        // Wait until the processing row has been observed.
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                snapshots.changed().await.unwrap();
                let seen = snapshots
                    .borrow()
                    .stages
                    .get(&StageKey::Validate)
                    .map(|j| j.status.clone());
                if seen.as_deref() == Some("processing") {
                    break;
                }
            }
        })
        .await?;

        let mut active = job.into_active_model();
        active.status = Set("completed".to_string());
        active.processed_leads = Set(10);
        active.update(&db).await?;

        tokio::time::timeout(Duration::from_secs(5), poller.join()).await??;

        let snapshot = snapshots.borrow();
        assert_eq!(snapshot.stages[&StageKey::Validate].status, "completed");

        Ok(())
    }

    #[tokio::test]
    async fn test_poller_can_be_stopped_externally() -> Result<()> {
        let db = setup_test_db_connection().await?;
        let event = insert_event(&db, "spring-webinar", 10).await?;
        insert_job(
            &db,
            JobSeed::builder()
                .event_id(event.id)
                .stage(StageKey::Validate)
                .status("processing")
                .build(),
        )
        .await?;

        let (poller, _snapshots) = StatusPoller::spawn(
            db,
            event.id,
            Duration::from_millis(10),
            Duration::ZERO,
        );

        poller.stop();
        tokio::time::timeout(Duration::from_secs(5), poller.join()).await??;

        Ok(())
    }
}
