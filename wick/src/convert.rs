//! wick-convert - CLI tool to convert legacy Wick projects
//!
//! Reads a Wick 15.2 project file, converts it to the current project
//! format, and writes the serialized project and/or stores it in the
//! autosave store so the editor can recover it.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/wick/autosave.db (~/.local/share/wick/autosave.db)
//! - Logs: $XDG_STATE_HOME/wick/ (~/.local/state/wick/)
//! - Config: $XDG_CONFIG_HOME/wick/config.toml (~/.config/wick/config.toml)

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use wick_core::config::ScriptPolicy;
use wick_core::{AutoSave, Config, LegacyConverter, SqliteStore};

#[derive(Parser)]
#[command(name = "wick-convert")]
#[command(about = "Convert a legacy Wick project to the current format")]
#[command(version)]
struct Args {
    /// Legacy project file (.wick or .json)
    file: PathBuf,

    /// Write the converted project JSON to this path ("-" for stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Split top-level event functions into separate scripts
    #[arg(long)]
    split_scripts: bool,

    /// Save the converted project into the autosave store
    #[arg(long)]
    autosave: bool,

    /// Autosave database (default: $XDG_DATA_HOME/wick/autosave.db)
    #[arg(long, requires = "autosave")]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.output.is_none() && !args.autosave {
        bail!("nothing to do: pass --output and/or --autosave");
    }

    // Load configuration
    let mut config = Config::load().context("failed to load configuration")?;
    if args.split_scripts {
        config.converter.script_policy = ScriptPolicy::SplitEvents;
    }

    // Initialize logging
    let _log_guard =
        wick_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!(file = %args.file.display(), "wick-convert starting");

    let converter = LegacyConverter::new(&config.converter);
    let conversion = converter
        .convert_file(&args.file)
        .with_context(|| format!("failed to convert {}", args.file.display()))?;
    let mut project = conversion.project;
    project.touch();

    for warning in &conversion.warnings {
        eprintln!("warning: {}", warning);
    }

    let counts = project.count_nodes();
    eprintln!(
        "Converted '{}': {} clip(s), {} button(s), {} frame(s), {} path(s), {} asset(s)",
        project.name,
        counts.clips,
        counts.buttons,
        counts.frames,
        counts.paths + counts.texts + counts.images,
        project.assets.len()
    );

    if let Some(output) = &args.output {
        let json = serde_json::to_string_pretty(&project.serialize())
            .context("failed to serialize project")?;
        if output.as_os_str() == "-" {
            println!("{}", json);
        } else {
            std::fs::write(output, json)
                .with_context(|| format!("failed to write {}", output.display()))?;
            eprintln!("Wrote {}", output.display());
        }
    }

    if args.autosave {
        let db_path = args.db.clone().unwrap_or_else(Config::database_path);
        let store = SqliteStore::open(&db_path).context("failed to open autosave store")?;
        let autosave = AutoSave::new(Arc::new(store), config.autosave.clone());

        let entry = autosave
            .save(&project)
            .await
            .context("failed to autosave converted project")?;
        println!("Autosaved {} ({})", entry.id, db_path.display());
    }

    Ok(())
}
