//! Error types for wick-core

use crate::model::ObjectId;
use thiserror::Error;

/// Main error type for the wick-core library
#[derive(Error, Debug)]
pub enum Error {
    /// SQLite store error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Key-value store failure that is not a SQLite error
    #[error("store error: {0}")]
    Store(String),

    /// No autosave snapshot exists for this project
    #[error("autosave not found: {0}")]
    NotFound(ObjectId),

    /// A serialized record references an object that was never materialized
    #[error("missing object {id} referenced by {referenced_by}")]
    MissingObject { id: ObjectId, referenced_by: String },

    /// A serialized record has the wrong shape for where it is referenced
    #[error("corrupt record {id}: {message}")]
    Corrupt { id: ObjectId, message: String },

    /// Legacy node that matches no known object kind
    #[error("unrecognized legacy node {uuid}: {description}")]
    UnrecognizedNode { uuid: String, description: String },

    /// Legacy image references an asset that is not in the converted library
    #[error("image {node} references missing image asset {asset}")]
    MissingAsset { node: String, asset: String },

    /// Vector graphics import failure
    #[error("vector import error: {0}")]
    Vector(String),

    /// Legacy project could not be decoded
    #[error("legacy format error: {0}")]
    LegacyFormat(String),
}

/// Result type alias for wick-core
pub type Result<T> = std::result::Result<T, Error>;
