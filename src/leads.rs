use crate::database::entities::leads;
use crate::events::EventStore;
use anyhow::{Context, Result};
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadRecord {
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: Vec<String>,
}

/// Parses a lead import file: a JSON array of lead objects.
pub fn parse_leads_file(content: &str) -> Result<Vec<LeadRecord>> {
    serde_json::from_str(content).context("Lead file must be a JSON array of lead objects")
}

/// Syntactic plausibility check only; real deliverability is the validate
/// stage's job.
pub fn email_looks_valid(email: &str) -> bool {
    let pattern = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern");
    pattern.is_match(email)
}

pub struct LeadImporter {
    db: DatabaseConnection,
}

impl LeadImporter {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts the importable records and refreshes the event's denormalized
    /// lead count. Records with an implausible email, and duplicates (within
    /// the batch or against already-imported leads), are skipped and
    /// reported, not fatal.
    pub async fn import(&self, event_id: i32, records: Vec<LeadRecord>) -> Result<ImportSummary> {
        let existing: HashSet<String> = leads::Entity::find()
            .filter(leads::Column::EventId.eq(event_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|lead| lead.email.to_ascii_lowercase())
            .collect();

        let mut seen = existing;
        let mut imported = 0;
        let mut skipped = Vec::new();

        for record in records {
            let email = record.email.trim().to_string();

            if !email_looks_valid(&email) {
                skipped.push(format!("{email}: invalid email address"));
                continue;
            }
            if !seen.insert(email.to_ascii_lowercase()) {
                skipped.push(format!("{email}: duplicate"));
                continue;
            }

            let lead = leads::ActiveModel {
                id: NotSet,
                event_id: Set(event_id),
                email: Set(email),
                first_name: Set(record.first_name),
                last_name: Set(record.last_name),
                company: Set(record.company),
                created_at: Set(chrono::Utc::now().naive_utc()),
            };
            lead.insert(&self.db).await?;
            imported += 1;
        }

        EventStore::new(self.db.clone())
            .refresh_lead_count(event_id)
            .await?;

        Ok(ImportSummary { imported, skipped })
    }

    pub async fn list(&self, event_id: i32) -> Result<Vec<leads::Model>> {
        Ok(leads::Entity::find()
            .filter(leads::Column::EventId.eq(event_id))
            .order_by_asc(leads::Column::Email)
            .all(&self.db)
            .await?)
    }

    /// Removes every lead of the event and resets its denormalized count.
    pub async fn clear(&self, event_id: i32) -> Result<u64> {
        let deleted = leads::Entity::delete_many()
            .filter(leads::Column::EventId.eq(event_id))
            .exec(&self.db)
            .await?
            .rows_affected;

        EventStore::new(self.db.clone())
            .refresh_lead_count(event_id)
            .await?;

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventStore;
    use crate::test_helpers::setup_test_db_connection;
    use rstest::rstest;

    #[rstest]
    #[case("ada@example.com", true)]
    #[case("ada.lovelace@mail.example.co", true)]
    #[case("no-at-sign.example.com", false)]
    #[case("two@@example.com", false)]
    #[case("spaces in@example.com", false)]
    #[case("missing-tld@example", false)]
    #[case("", false)]
    fn test_email_plausibility(#[case] email: &str, #[case] expected: bool) {
        assert_eq!(email_looks_valid(email), expected);
    }

    #[test]
    fn test_parse_leads_file() -> Result<()> {
        let content = r#"[
            {"email": "ada@example.com", "first_name": "Ada", "company": "Analytical Engines"},
            {"email": "grace@example.com"}
        ]"#;

        let records = parse_leads_file(content)?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].email, "ada@example.com");
        assert_eq!(records[0].company.as_deref(), Some("Analytical Engines"));
        assert_eq!(records[1].first_name, None);

        Ok(())
    }

    #[test]
    fn test_parse_leads_file_rejects_non_array() {
        let result = parse_leads_file(r#"{"email": "ada@example.com"}"#);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_import_skips_invalid_and_duplicates() -> Result<()> {
        let db = setup_test_db_connection().await?;
        let store = EventStore::new(db.clone());
        let event = store.create("spring-webinar", None).await?;

        let importer = LeadImporter::new(db);
        let summary = importer
            .import(
                event.id,
                vec![
                    LeadRecord {
                        email: "ada@example.com".to_string(),
                        first_name: Some("Ada".to_string()),
                        last_name: None,
                        company: None,
                    },
                    LeadRecord {
                        email: "not-an-email".to_string(),
                        first_name: None,
                        last_name: None,
                        company: None,
                    },
                    LeadRecord {
                        email: "Ada@example.com".to_string(),
                        first_name: None,
                        last_name: None,
                        company: None,
                    },
                ],
            )
            .await?;

        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped.len(), 2);

        let event = store.find_by_id(event.id).await?.unwrap();
        assert_eq!(event.lead_count, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_clear_resets_lead_count() -> Result<()> {
        let db = setup_test_db_connection().await?;
        let store = EventStore::new(db.clone());
        let event = store.create("spring-webinar", None).await?;

        let importer = LeadImporter::new(db);
        importer
            .import(
                event.id,
                vec![
                    LeadRecord {
                        email: "ada@example.com".to_string(),
                        first_name: None,
                        last_name: None,
                        company: None,
                    },
                    LeadRecord {
                        email: "grace@example.com".to_string(),
                        first_name: None,
                        last_name: None,
                        company: None,
                    },
                ],
            )
            .await?;

        let deleted = importer.clear(event.id).await?;
        assert_eq!(deleted, 2);
        assert!(importer.list(event.id).await?.is_empty());

        let event = store.find_by_id(event.id).await?.unwrap();
        assert_eq!(event.lead_count, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_import_against_existing_leads() -> Result<()> {
        let db = setup_test_db_connection().await?;
        let store = EventStore::new(db.clone());
        let event = store.create("spring-webinar", None).await?;

        let importer = LeadImporter::new(db);
        let record = LeadRecord {
            email: "ada@example.com".to_string(),
            first_name: None,
            last_name: None,
            company: None,
        };

        let first = importer.import(event.id, vec![record.clone()]).await?;
        assert_eq!(first.imported, 1);

        let second = importer.import(event.id, vec![record]).await?;
        assert_eq!(second.imported, 0);
        assert_eq!(second.skipped.len(), 1);

        let event = store.find_by_id(event.id).await?.unwrap();
        assert_eq!(event.lead_count, 1);

        Ok(())
    }
}
