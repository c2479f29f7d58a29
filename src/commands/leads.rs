use anyhow::{Context, Result};
use inquire::Confirm;
use std::fs;
use std::path::Path;

use crate::commands::open_project;
use crate::events::EventStore;
use crate::leads::{LeadImporter, parse_leads_file};

pub async fn execute_leads_import(
    event_name: &str,
    file: &Path,
    project_path: &Path,
) -> Result<()> {
    let (_config, db) = open_project(project_path).await?;

    let store = EventStore::new(db.clone());
    let event = store
        .find_by_name(event_name)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Event '{}' not found", event_name))?;

    let content = fs::read_to_string(file)
        .with_context(|| format!("Failed to read lead file: {}", file.display()))?;
    let records = parse_leads_file(&content)?;

    let importer = LeadImporter::new(db);
    let summary = importer.import(event.id, records).await?;

    println!(
        "Imported {} leads into '{}'",
        summary.imported, event.name
    );
    if !summary.skipped.is_empty() {
        println!("Skipped {}:", summary.skipped.len());
        for reason in &summary.skipped {
            println!("  {reason}");
        }
    }
    Ok(())
}

pub async fn execute_leads_list(event_name: &str, project_path: &Path) -> Result<()> {
    let (_config, db) = open_project(project_path).await?;

    let store = EventStore::new(db.clone());
    let event = store
        .find_by_name(event_name)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Event '{}' not found", event_name))?;

    let importer = LeadImporter::new(db);
    let leads = importer.list(event.id).await?;

    if leads.is_empty() {
        println!("No leads imported for '{event_name}' yet.");
        return Ok(());
    }

    for lead in leads {
        let name = match (&lead.first_name, &lead.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => "-".to_string(),
        };
        let company = lead.company.as_deref().unwrap_or("-");
        println!("{:<32} {:<24} {}", lead.email, name, company);
    }
    Ok(())
}

pub async fn execute_leads_clear(
    event_name: &str,
    skip_confirm: bool,
    project_path: &Path,
) -> Result<()> {
    let (_config, db) = open_project(project_path).await?;

    let store = EventStore::new(db.clone());
    let event = store
        .find_by_name(event_name)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Event '{}' not found", event_name))?;

    if !skip_confirm {
        let confirmed = Confirm::new(&format!(
            "Remove all {} leads from '{}'?",
            event.lead_count, event.name
        ))
        .with_default(false)
        .prompt()?;

        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let importer = LeadImporter::new(db);
    let deleted = importer.clear(event.id).await?;
    println!("Removed {deleted} leads from '{event_name}'");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::write_test_project;

    #[tokio::test]
    async fn test_leads_import_from_file() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        write_test_project(temp_dir.path()).await?;

        let (_config, db) = open_project(temp_dir.path()).await?;
        let store = EventStore::new(db);
        store.create("spring-webinar", None).await?;

        let lead_file = temp_dir.path().join("imports").join("leads.json");
        fs::create_dir_all(lead_file.parent().unwrap())?;
        fs::write(
            &lead_file,
            r#"[{"email": "ada@example.com"}, {"email": "bad"}]"#,
        )?;

        execute_leads_import("spring-webinar", &lead_file, temp_dir.path()).await?;

        let (_config, db) = open_project(temp_dir.path()).await?;
        let event = EventStore::new(db)
            .find_by_name("spring-webinar")
            .await?
            .unwrap();
        assert_eq!(event.lead_count, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_leads_clear() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        write_test_project(temp_dir.path()).await?;

        let (_config, db) = open_project(temp_dir.path()).await?;
        let store = EventStore::new(db);
        store.create("spring-webinar", None).await?;

        let lead_file = temp_dir.path().join("leads.json");
        fs::write(&lead_file, r#"[{"email": "ada@example.com"}]"#)?;
        execute_leads_import("spring-webinar", &lead_file, temp_dir.path()).await?;

        execute_leads_clear("spring-webinar", true, temp_dir.path()).await?;

        let (_config, db) = open_project(temp_dir.path()).await?;
        let event = EventStore::new(db)
            .find_by_name("spring-webinar")
            .await?
            .unwrap();
        assert_eq!(event.lead_count, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_leads_import_unknown_event() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        write_test_project(temp_dir.path()).await?;

        let lead_file = temp_dir.path().join("leads.json");
        fs::write(&lead_file, "[]")?;

        let result = execute_leads_import("missing", &lead_file, temp_dir.path()).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not found"));

        Ok(())
    }
}
