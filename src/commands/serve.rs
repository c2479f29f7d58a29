use anyhow::Result;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use crate::api;
use crate::commands::open_project;

pub async fn execute_serve(project_path: &Path) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let (config, db) = open_project(project_path).await?;

    api::serve(config, db).await
}
