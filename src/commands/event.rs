use anyhow::Result;
use inquire::Confirm;
use std::path::Path;

use crate::commands::{open_project, validate_name};
use crate::events::EventStore;

pub async fn execute_event_new(
    name: &str,
    description: Option<&str>,
    project_path: &Path,
) -> Result<()> {
    validate_name(name)?;

    let (_config, db) = open_project(project_path).await?;
    let store = EventStore::new(db);

    let event = store.create(name, description).await?;
    println!("Created event '{}' (id {})", event.name, event.id);
    Ok(())
}

pub async fn execute_event_list(project_path: &Path) -> Result<()> {
    let (_config, db) = open_project(project_path).await?;
    let store = EventStore::new(db);

    let events = store.list().await?;
    if events.is_empty() {
        println!("No events yet. Create one with 'lflow event new <name>'");
        return Ok(());
    }

    for event in events {
        let description = event.description.as_deref().unwrap_or("-");
        println!(
            "{:<4} {:<24} {:>6} leads  {}",
            event.id, event.name, event.lead_count, description
        );
    }
    Ok(())
}

pub async fn execute_event_show(name: &str, project_path: &Path) -> Result<()> {
    let (_config, db) = open_project(project_path).await?;
    let store = EventStore::new(db);

    let event = store
        .find_by_name(name)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Event '{}' not found", name))?;

    println!("Event:       {}", event.name);
    println!("Id:          {}", event.id);
    if let Some(description) = &event.description {
        println!("Description: {description}");
    }
    println!("Leads:       {}", event.lead_count);
    println!("Created:     {}", event.created_at);
    Ok(())
}

pub async fn execute_event_delete(name: &str, skip_confirm: bool, project_path: &Path) -> Result<()> {
    let (_config, db) = open_project(project_path).await?;
    let store = EventStore::new(db);

    let event = store
        .find_by_name(name)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Event '{}' not found", name))?;

    if !skip_confirm {
        let confirmed = Confirm::new(&format!(
            "Delete event '{}' with {} leads and its job history?",
            event.name, event.lead_count
        ))
        .with_default(false)
        .prompt()?;

        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store.delete(event).await?;
    println!("Deleted event '{name}'");
    Ok(())
}
