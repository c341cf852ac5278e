//! Synthesis error taxonomy.

use thiserror::Error;

/// Errors that abort a synthesis run. None are retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthError {
    /// Required configuration is absent
    #[error("configuration error: missing required value at {path}")]
    Configuration { path: String },

    /// A cross-reference names a node that is not in the graph
    #[error("dangling reference: {from}.{attribute} points at unknown node '{to}'")]
    DanglingReference {
        from: String,
        attribute: String,
        to: String,
    },

    /// A cross-reference points at a node declared after its consumer
    #[error("forward reference: {from}.{attribute} points at later node '{to}'")]
    ForwardReference {
        from: String,
        attribute: String,
        to: String,
    },

    /// A cross-reference names an attribute the producer does not export
    #[error("node '{node}' does not export attribute '{attribute}'")]
    UnknownAttribute { node: String, attribute: String },

    /// Two nodes share an id
    #[error("duplicate resource id '{0}'")]
    DuplicateId(String),

    /// A dependency names a node not yet declared
    #[error("resource '{id}' depends on unknown '{dependency}'")]
    UnknownDependency { id: String, dependency: String },

    /// The dependency edges are not acyclic
    #[error("dependency cycle detected involving: {}", .0.join(", "))]
    Cycle(Vec<String>),

    /// A config slot was never filled by wiring
    #[error("unresolved reference at {node}.{attribute}")]
    UnresolvedReference { node: String, attribute: String },

    /// Stack config could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl SynthError {
    /// Shorthand for a missing config path.
    pub fn missing(path: impl Into<String>) -> Self {
        Self::Configuration { path: path.into() }
    }
}
