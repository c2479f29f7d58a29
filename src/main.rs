use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use leadflow::commands;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new LeadFlow project
    Init {
        /// Project name
        name: String,
    },
    /// Manage events (lead lists)
    Event {
        #[command(subcommand)]
        action: EventAction,
    },
    /// Manage an event's leads
    Leads {
        #[command(subcommand)]
        action: LeadsAction,
    },
    /// Inspect and run the lead-processing pipeline
    Pipeline {
        #[command(subcommand)]
        action: PipelineAction,
    },
    /// Manage encrypted project secrets
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },
    /// Manage app database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Start the API server
    Serve,
}

#[derive(Subcommand)]
enum EventAction {
    /// Create a new event
    New {
        /// Event name
        name: String,
        /// Optional description
        #[arg(long)]
        description: Option<String>,
    },
    /// List all events
    List,
    /// Show one event
    Show {
        /// Event name
        name: String,
    },
    /// Delete an event, its leads and its job history
    Delete {
        /// Event name
        name: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum LeadsAction {
    /// Import leads from a JSON file
    Import {
        /// Event name
        event: String,
        /// Path to a JSON array of lead objects
        file: PathBuf,
    },
    /// List an event's leads
    List {
        /// Event name
        event: String,
    },
    /// Remove all of an event's leads
    Clear {
        /// Event name
        event: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum PipelineAction {
    /// Show the pipeline status for an event
    Status {
        /// Event name
        event: String,
        /// Keep watching job status until all stages settle
        #[arg(long)]
        watch: bool,
    },
    /// Start a pipeline stage
    Run {
        /// Event name
        event: String,
        /// Stage: validate, check_salesforce, enrich or sync
        stage: String,
        /// Keep watching job status until all stages settle
        #[arg(long)]
        watch: bool,
    },
    /// Watch job status until all stages settle
    Watch {
        /// Event name
        event: String,
    },
}

#[derive(Subcommand)]
enum SecretAction {
    /// Generate the project's encryption key
    GenKey,
    /// Store a secret (value is prompted)
    Set {
        /// Secret name
        key: String,
    },
    /// List stored secret names
    List,
    /// Remove a secret
    Remove {
        /// Secret name
        key: String,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply pending migrations
    Up,
    /// Show pending migrations
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let current_dir = std::env::current_dir()?;

    let result = match &cli.command {
        Commands::Init { name } => commands::init::execute_init(name, &current_dir),
        Commands::Event { action } => match action {
            EventAction::New { name, description } => {
                commands::event::execute_event_new(name, description.as_deref(), &current_dir)
                    .await
            }
            EventAction::List => commands::event::execute_event_list(&current_dir).await,
            EventAction::Show { name } => {
                commands::event::execute_event_show(name, &current_dir).await
            }
            EventAction::Delete { name, yes } => {
                commands::event::execute_event_delete(name, *yes, &current_dir).await
            }
        },
        Commands::Leads { action } => match action {
            LeadsAction::Import { event, file } => {
                commands::leads::execute_leads_import(event, file, &current_dir).await
            }
            LeadsAction::List { event } => {
                commands::leads::execute_leads_list(event, &current_dir).await
            }
            LeadsAction::Clear { event, yes } => {
                commands::leads::execute_leads_clear(event, *yes, &current_dir).await
            }
        },
        Commands::Pipeline { action } => match action {
            PipelineAction::Status { event, watch } => {
                if *watch {
                    commands::pipeline::execute_pipeline_watch(event, &current_dir).await
                } else {
                    commands::pipeline::execute_pipeline_status(event, &current_dir).await
                }
            }
            PipelineAction::Run {
                event,
                stage,
                watch,
            } => commands::pipeline::execute_pipeline_run(event, stage, *watch, &current_dir).await,
            PipelineAction::Watch { event } => {
                commands::pipeline::execute_pipeline_watch(event, &current_dir).await
            }
        },
        Commands::Secret { action } => match action {
            SecretAction::GenKey => commands::secret::execute_secret_gen_key(&current_dir),
            SecretAction::Set { key } => commands::secret::execute_secret_set(key, &current_dir),
            SecretAction::List => commands::secret::execute_secret_list(&current_dir),
            SecretAction::Remove { key } => {
                commands::secret::execute_secret_remove(key, &current_dir)
            }
        },
        Commands::Migrate { action } => match action {
            MigrateAction::Up => commands::migrate::execute_migrate_up(&current_dir).await,
            MigrateAction::Status => commands::migrate::execute_migrate_status(&current_dir).await,
        },
        Commands::Serve => commands::serve::execute_serve(&current_dir).await,
    };

    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }

    Ok(())
}
