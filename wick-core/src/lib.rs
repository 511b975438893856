//! # wick-core
//!
//! Core library for the Wick Engine project tools.
//!
//! This library provides:
//! - The current project model and its flat, id-referencing record form
//! - Autosave persistence over a pluggable key-value store
//! - Conversion of legacy (Wick 15.2) projects into the current model
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! - **Model:** a root clip owning layers, frames, paths, tweens and nested
//!   clips, plus an asset library. Serialized as a project record and a flat
//!   list of object records.
//! - **Storage:** [`AutoSave`] keeps one snapshot per project and an index of
//!   all autosaved projects in a [`KeyValueStore`] ([`MemoryStore`] or
//!   [`SqliteStore`]).
//! - **Conversion:** [`LegacyConverter`] walks a legacy project tree and
//!   builds an equivalent current project.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wick_core::{AutoSave, Config, LegacyConverter, SqliteStore};
//!
//! # async fn run() -> wick_core::Result<()> {
//! let config = Config::load()?;
//! let store = SqliteStore::open(&Config::database_path())?;
//! let autosave = AutoSave::new(Arc::new(store), config.autosave.clone());
//!
//! let conversion = LegacyConverter::new(&config.converter)
//!     .convert_file(std::path::Path::new("MyGame-2018-04-02.wick"))?;
//! autosave.save(&conversion.project).await?;
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use autosave::{AutoSave, AutosaveEntry, AutosaveSnapshot, RepairReport};
pub use config::Config;
pub use convert::{Conversion, LegacyConverter};
pub use error::{Error, Result};
pub use model::*;
pub use store::{KeyValueStore, MemoryStore, SqliteStore};

// Public modules
pub mod autosave;
pub mod config;
pub mod convert;
pub mod error;
pub mod logging;
pub mod model;
pub mod store;
