//! wick-autosave - CLI tool to inspect and maintain the autosave store
//!
//! This tool provides commands for:
//! - Listing autosaved projects, newest first
//! - Showing a summary of one snapshot
//! - Deleting an autosave
//! - Repairing an index left inconsistent by an interrupted write
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/wick/autosave.db (~/.local/share/wick/autosave.db)
//! - Logs: $XDG_STATE_HOME/wick/ (~/.local/state/wick/)
//! - Config: $XDG_CONFIG_HOME/wick/config.toml (~/.config/wick/config.toml)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use wick_core::{AutoSave, Config, ObjectId, ObjectRecord, SqliteStore};

#[derive(Parser)]
#[command(name = "wick-autosave")]
#[command(about = "Inspect and maintain the Wick autosave store")]
#[command(version)]
struct Args {
    /// Autosave database (default: $XDG_DATA_HOME/wick/autosave.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List autosaved projects, most recently modified first
    List {
        /// Print the index as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a summary of one autosaved project
    Show {
        /// Project id
        id: ObjectId,
    },

    /// Delete an autosaved project
    Delete {
        /// Project id
        id: ObjectId,
    },

    /// Drop dangling index entries, orphaned snapshots and unused asset files
    Repair,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard =
        wick_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let db_path = args.db.clone().unwrap_or_else(Config::database_path);
    tracing::info!(path = %db_path.display(), "Opening autosave store");

    let store = SqliteStore::open(&db_path).context("failed to open autosave store")?;
    let autosave = AutoSave::new(Arc::new(store), config.autosave.clone());

    match args.command {
        Command::List { json } => cmd_list(&autosave, json).await,
        Command::Show { id } => cmd_show(&autosave, id).await,
        Command::Delete { id } => cmd_delete(&autosave, id).await,
        Command::Repair => cmd_repair(&autosave).await,
    }
}

async fn cmd_list(autosave: &AutoSave, json: bool) -> Result<()> {
    let entries = autosave
        .list()
        .await
        .context("failed to read autosave index")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No autosaved projects.");
        return Ok(());
    }

    println!("{:<36}  {:<20}  NAME", "ID", "LAST MODIFIED");
    for entry in &entries {
        // The index only stores ids; the name lives in the snapshot
        let name = match autosave.snapshot(entry.id).await {
            Ok(snapshot) => snapshot.project_state.name,
            Err(e) => {
                tracing::warn!(project = %entry.id, error = %e, "Failed to read snapshot");
                "<unreadable>".to_string()
            }
        };
        println!(
            "{:<36}  {:<20}  {}",
            entry.id,
            entry.last_modified.format("%Y-%m-%d %H:%M:%S"),
            name
        );
    }
    println!();
    println!("{} project(s)", entries.len());
    Ok(())
}

async fn cmd_show(autosave: &AutoSave, id: ObjectId) -> Result<()> {
    let snapshot = autosave
        .snapshot(id)
        .await
        .with_context(|| format!("failed to read autosave {}", id))?;
    let project = &snapshot.project_state;

    let mut clips = 0;
    let mut buttons = 0;
    let mut frames = 0;
    let mut paths = 0;
    let mut assets = 0;
    for record in &snapshot.object_states {
        match record {
            ObjectRecord::Clip(_) => clips += 1,
            ObjectRecord::Button(_) => buttons += 1,
            ObjectRecord::Frame(_) => frames += 1,
            ObjectRecord::Path(_) => paths += 1,
            ObjectRecord::ImageAsset(_) | ObjectRecord::SoundAsset(_) => assets += 1,
            ObjectRecord::Layer(_) | ObjectRecord::Tween(_) => {}
        }
    }

    println!("Project:         {}", project.name);
    println!("ID:              {}", snapshot.project_id);
    println!(
        "Last modified:   {}",
        snapshot.last_modified.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("Format version:  {}", project.metadata.format_version);
    println!("Stage:           {}x{} @ {} fps", project.width, project.height, project.framerate);
    println!("Background:      {}", project.background_color);
    println!("Objects:         {}", snapshot.object_states.len());
    println!("  Clips:         {}", clips);
    println!("  Buttons:       {}", buttons);
    println!("  Frames:        {}", frames);
    println!("  Paths:         {}", paths);
    println!("  Assets:        {}", assets);
    Ok(())
}

async fn cmd_delete(autosave: &AutoSave, id: ObjectId) -> Result<()> {
    let existed = autosave.contains(id).await?;
    autosave
        .delete(id)
        .await
        .with_context(|| format!("failed to delete autosave {}", id))?;

    if existed {
        println!("Deleted autosave {}", id);
    } else {
        println!("No autosave for {}", id);
    }
    Ok(())
}

async fn cmd_repair(autosave: &AutoSave) -> Result<()> {
    let report = autosave
        .repair()
        .await
        .context("failed to repair autosave index")?;

    if report.is_clean() {
        println!("Autosave index is consistent.");
        return Ok(());
    }

    println!("Repair complete:");
    println!("  Dangling entries removed:  {}", report.dangling_entries.len());
    println!("  Orphaned snapshots removed: {}", report.orphaned_snapshots.len());
    println!("  Duplicate entries dropped: {}", report.duplicates_collapsed);
    println!("  Orphaned files removed:    {}", report.orphaned_files.len());
    Ok(())
}
