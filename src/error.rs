//! Error type shared by the library.

use std::io;

use thiserror::Error;

//-----------------------------------------------------------------------------

/// Errors that abort the pipeline.
///
/// Structural errors (undefined nodes or paths) cannot be repaired locally.
/// Tolerated anomalies, such as an invalid start or successor subpath index, are logged instead and never reach this type.
#[derive(Debug, Error)]
pub enum Error {
    /// A record references a node that is not in the graph.
    #[error("Undefined node: {0}")]
    UndefinedNode(String),

    /// A record references a path that is not in the graph.
    #[error("Undefined path: {0}")]
    UndefinedPath(String),

    /// The graph already contains a node with this identifier.
    #[error("Duplicate node: {0}")]
    DuplicateNode(String),

    /// The graph already contains a path with this identifier.
    #[error("Duplicate path: {0}")]
    DuplicatePath(String),

    /// A malformed line in a GFA file.
    #[error("Invalid GFA line {line}: {message}")]
    Gfa { line: usize, message: String },

    /// A malformed alignment record.
    #[error("Invalid alignment record on line {line}: {source}")]
    Record {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// The cluster table cannot be parsed.
    #[error("Invalid cluster table: {0}")]
    ClusterTable(#[source] serde_json::Error),

    /// A parameter is outside its valid range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Returns `true` if the error is a failed node or path lookup.
    pub fn is_lookup(&self) -> bool {
        matches!(self, Error::UndefinedNode(_) | Error::UndefinedPath(_))
    }
}

/// Result type with [`Error`] as the error.
pub type Result<T> = std::result::Result<T, Error>;

//-----------------------------------------------------------------------------
