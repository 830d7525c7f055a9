//! Error types for chain construction and configuration loading.
//!
//! Nothing on the per-frame path returns these; they only guard setup.

use thiserror::Error;

/// Result type for kinematic chain construction.
pub type ChainResult<T> = Result<T, ChainError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while assembling a kinematic chain.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChainError {
    /// A node index does not refer to a node in the arena.
    #[error("unknown node id {0}")]
    UnknownNode(usize),

    /// An arc index does not refer to an arc in the arena.
    #[error("unknown arc id {0}")]
    UnknownArc(usize),

    /// The chain has no root arc.
    #[error("chain has no root arc")]
    MissingRoot,

    /// A second root arc was added.
    #[error("chain already has root arc '{existing}'")]
    DuplicateRoot {
        /// Name of the root arc already present.
        existing: String,
    },

    /// A node would get a second incoming arc, which breaks the tree shape.
    #[error("node '{node}' already has parent arc '{existing}'")]
    NodeAlreadyAttached {
        /// Name of the node.
        node: String,
        /// Name of the arc already owning it.
        existing: String,
    },

    /// A node is not reachable from the root arc.
    #[error("node '{node}' is not reachable from the root")]
    UnreachableNode {
        /// Name of the node.
        node: String,
    },

    /// An arc would close a loop back to one of its ancestors.
    #[error("arc '{arc}' would create a cycle")]
    Cycle {
        /// Name of the offending arc.
        arc: String,
    },

    /// The arc chosen as IK target carries no end effector.
    #[error("arc '{arc}' has no end effector")]
    MissingEndEffector {
        /// Name of the arc.
        arc: String,
    },

    /// An arc appears twice in a theta layout.
    #[error("arc '{arc}' is actuated twice")]
    DuplicateActuation {
        /// Name of the arc.
        arc: String,
    },

    /// A theta vector does not match the layout it is applied with.
    #[error("theta vector has {actual} entries, layout needs {expected}")]
    ThetaLength {
        /// Length required by the layout.
        expected: usize,
        /// Length provided.
        actual: usize,
    },
}

/// Errors raised while loading or validating a [`crate::SimConfig`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Reading or writing the config file failed.
    #[error("config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid JSON for `SimConfig`.
    #[error("config JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),

    /// A field holds a value the simulation cannot run with.
    #[error("invalid config field '{field}': {reason}")]
    Invalid {
        /// Dotted path of the field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}
