pub mod diff;
pub mod graph;
pub mod loader;
pub mod normalize;
pub mod propagate;
pub mod reverse;

pub use diff::{DiffResult, GraphDiffer, ModificationPolicy, ModificationReason, compare_graphs};
pub use graph::{Component, ComponentId, DependencyGraph};
pub use loader::{load_graph, read_document, read_value};
pub use normalize::normalize_source;
pub use propagate::{AffectedSet, DepthBounds, MAX_DEPTH, MIN_DEPTH, Propagator, affected_components};
pub use reverse::ReverseDependencyIndex;

/// Error type for the graph engine.
#[derive(thiserror::Error, Debug)]
pub enum GraphError {
    /// The input file does not exist or is not a regular file.
    #[error("{what} not found: {path}")]
    NotFound { what: String, path: String },

    /// Decompressing a `.gz` input failed.
    #[error("Corrupt archive {path}: {cause}")]
    CorruptArchive { path: String, cause: String },

    /// The decoded payload is not valid JSON.
    #[error("Invalid JSON in {path} at line {line}, column {column}: {message}")]
    MalformedData {
        path: String,
        line: usize,
        column: usize,
        message: String,
    },

    /// The payload parsed, but has the wrong shape.
    #[error("Schema violation in {path}: {message}")]
    SchemaViolation { path: String, message: String },

    /// A tunable is outside its accepted range.
    #[error("Invalid parameter: {name} must be {bound}, got {value}")]
    InvalidParameter {
        name: &'static str,
        bound: String,
        value: i64,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;
