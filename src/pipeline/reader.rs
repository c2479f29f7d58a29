use crate::database::entities::pipeline_jobs;
use crate::pipeline::stage::StageKey;
use anyhow::Result;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::collections::HashMap;

/// Read side of the jobs table. Re-runs leave multiple historical rows per
/// (event, stage); consumers only ever see the most recent one.
pub struct JobReader {
    db: DatabaseConnection,
}

impl JobReader {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn latest_job(
        &self,
        event_id: i32,
        stage: StageKey,
    ) -> Result<Option<pipeline_jobs::Model>> {
        let job = pipeline_jobs::Entity::find()
            .filter(pipeline_jobs::Column::EventId.eq(event_id))
            .filter(pipeline_jobs::Column::Stage.eq(stage.as_str()))
            .order_by_desc(pipeline_jobs::Column::CreatedAt)
            .order_by_desc(pipeline_jobs::Column::Id)
            .one(&self.db)
            .await?;

        Ok(job)
    }

    /// Latest job per stage in one pass. Rows whose stage key is not part of
    /// the current sequence are ignored.
    pub async fn latest_jobs(
        &self,
        event_id: i32,
    ) -> Result<HashMap<StageKey, pipeline_jobs::Model>> {
        let rows = pipeline_jobs::Entity::find()
            .filter(pipeline_jobs::Column::EventId.eq(event_id))
            .order_by_asc(pipeline_jobs::Column::CreatedAt)
            .order_by_asc(pipeline_jobs::Column::Id)
            .all(&self.db)
            .await?;

        let mut latest = HashMap::new();
        for row in rows {
            if let Ok(stage) = row.stage.parse::<StageKey>() {
                latest.insert(stage, row);
            }
        }

        Ok(latest)
    }
}
