//! Error types for the routing simulator

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors raised while loading or validating a topology description.
///
/// Any of these aborts startup; the engine never runs on a malformed topology.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("failed to read topology file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid topology document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("topology declares no links")]
    Empty,

    #[error("link between {router1} and {router2} is declared more than once")]
    DuplicateLink { router1: String, router2: String },

    #[error("link from {router} to itself is not allowed")]
    SelfLoop { router: String },

    #[error("link between {router1} and {router2} has a missing endpoint")]
    MissingEndpoint { router1: String, router2: String },

    #[error("invalid router identifier {label:?}: {reason}")]
    InvalidRouterId { label: String, reason: String },

    #[error("link between {router1} and {router2} has invalid cost {cost}: {reason}")]
    InvalidCost {
        router1: String,
        router2: String,
        cost: i64,
        reason: String,
    },

    #[error("link between {router1} and {router2} has invalid {attribute} {value}: {reason}")]
    InvalidAttribute {
        router1: String,
        router2: String,
        attribute: &'static str,
        value: f64,
        reason: String,
    },
}

/// Errors raised by the network coordinator.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid engine configuration: {field} - {reason}")]
    Configuration { field: &'static str, reason: String },

    #[error("engine has already been started")]
    AlreadyStarted,

    #[error("no link between {router1} and {router2}")]
    UnknownLink { router1: String, router2: String },

    #[error("unknown router {0}")]
    UnknownRouter(String),
}
