//! Error types for the session engine's non-realtime paths.
//!
//! The audio thread never returns a `Result` from its hot path (see
//! [`crate::graph::processor`]); every recoverable audio-thread condition
//! degrades to silence and logs via `tracing`. These error types cover the
//! paths that run off the audio thread: graph construction, configuration
//! loading, and plugin state persistence.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while building or mutating a session's processing graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The requested connection would introduce a cycle.
    #[error("connecting node {from:?} to node {to:?} would create a cycle")]
    WouldCreateCycle {
        /// Source node of the rejected connection.
        from: crate::graph::NodeId,
        /// Destination node of the rejected connection.
        to: crate::graph::NodeId,
    },

    /// A node referenced by a connection does not exist in this graph.
    #[error("unknown node id {0:?}")]
    UnknownNode(crate::graph::NodeId),

    /// `prepare()` found a cycle during topological sort. This is a fatal
    /// initialisation error per the error-handling policy for "graph cycle
    /// at prepare time".
    #[error("graph contains a cycle: topological sort could not order all {0} nodes")]
    CycleAtPrepare(usize),

    /// A connection was declared between incompatible port kinds.
    #[error("invalid connection: {reason}")]
    InvalidConnection {
        /// Human-readable explanation of why the connection is invalid.
        reason: String,
    },
}

/// Errors produced while saving or loading plugin/session state.
#[derive(Debug, Error)]
pub enum StateError {
    /// Writing to the in-memory state stream failed (e.g. capacity exceeded).
    #[error("state save failed: {0}")]
    SaveFailed(String),

    /// The loaded blob could not be parsed as a state container or raw
    /// payload.
    #[error("state load failed: {0}")]
    LoadFailed(String),

    /// I/O error reading or writing a state blob from disk.
    #[error("state stream I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors produced while loading [`crate::config::SessionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read session config '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the configuration file as TOML.
    #[error("failed to parse session config: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Umbrella error type for session-level (non-realtime) operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A graph construction/mutation error.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A plugin state save/load error.
    #[error(transparent)]
    State(#[from] StateError),

    /// A configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
