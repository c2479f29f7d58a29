use crate::database::entities::{events, leads, pipeline_jobs};
use anyhow::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, NotSet,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};

/// CRUD over the lists of leads ("events") the pipeline runs against.
pub struct EventStore {
    db: DatabaseConnection,
}

impl EventStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, name: &str, description: Option<&str>) -> Result<events::Model> {
        if self.find_by_name(name).await?.is_some() {
            return Err(anyhow::anyhow!("Event '{}' already exists", name));
        }

        let now = chrono::Utc::now().naive_utc();
        let event = events::ActiveModel {
            id: NotSet,
            name: Set(name.to_string()),
            description: Set(description.map(|s| s.to_string())),
            lead_count: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(event.insert(&self.db).await?)
    }

    pub async fn list(&self) -> Result<Vec<events::Model>> {
        Ok(events::Entity::find()
            .order_by_asc(events::Column::Name)
            .all(&self.db)
            .await?)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<events::Model>> {
        Ok(events::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<events::Model>> {
        Ok(events::Entity::find()
            .filter(events::Column::Name.eq(name))
            .one(&self.db)
            .await?)
    }

    /// Deleting an event takes its leads and job history with it.
    pub async fn delete(&self, event: events::Model) -> Result<()> {
        leads::Entity::delete_many()
            .filter(leads::Column::EventId.eq(event.id))
            .exec(&self.db)
            .await?;
        pipeline_jobs::Entity::delete_many()
            .filter(pipeline_jobs::Column::EventId.eq(event.id))
            .exec(&self.db)
            .await?;
        events::Entity::delete_by_id(event.id).exec(&self.db).await?;

        Ok(())
    }

    /// Recomputes the denormalized lead count from the leads table.
    pub async fn refresh_lead_count(&self, event_id: i32) -> Result<i32> {
        let count = leads::Entity::find()
            .filter(leads::Column::EventId.eq(event_id))
            .count(&self.db)
            .await? as i32;

        let event = self
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Event not found"))?;

        let mut active = event.into_active_model();
        active.lead_count = Set(count);
        active.updated_at = Set(chrono::Utc::now().naive_utc());
        active.update(&self.db).await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stage::StageKey;
    use crate::test_helpers::{JobSeed, insert_job, setup_test_db_connection};

    #[tokio::test]
    async fn test_create_and_find_event() -> Result<()> {
        let db = setup_test_db_connection().await?;
        let store = EventStore::new(db);

        let event = store.create("spring-webinar", Some("Q2 webinar leads")).await?;
        assert_eq!(event.lead_count, 0);

        let found = store.find_by_name("spring-webinar").await?;
        assert_eq!(found.map(|e| e.id), Some(event.id));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_duplicate_name_rejected() -> Result<()> {
        let db = setup_test_db_connection().await?;
        let store = EventStore::new(db);

        store.create("spring-webinar", None).await?;
        let result = store.create("spring-webinar", None).await;

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("already exists"));

        Ok(())
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() -> Result<()> {
        let db = setup_test_db_connection().await?;
        let store = EventStore::new(db);

        store.create("winter-expo", None).await?;
        store.create("autumn-meetup", None).await?;

        let names: Vec<String> = store.list().await?.into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["autumn-meetup", "winter-expo"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_cascades_to_jobs() -> Result<()> {
        let db = setup_test_db_connection().await?;
        let store = EventStore::new(db.clone());

        let event = store.create("spring-webinar", None).await?;
        insert_job(
            &db,
            JobSeed::builder()
                .event_id(event.id)
                .stage(StageKey::Validate)
                .status("completed")
                .build(),
        )
        .await?;

        store.delete(event.clone()).await?;

        assert!(store.find_by_id(event.id).await?.is_none());
        let remaining = pipeline_jobs::Entity::find()
            .filter(pipeline_jobs::Column::EventId.eq(event.id))
            .count(&db)
            .await?;
        assert_eq!(remaining, 0);

        Ok(())
    }
}
