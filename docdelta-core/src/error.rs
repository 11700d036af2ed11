/// Top-level docdelta error type.
///
/// All fallible operations in `docdelta-core` return [`Result<T, DeltaError>`](Result).
/// Each variant wraps a domain-specific error enum, allowing callers to
/// match on the error source without losing type information.
#[derive(thiserror::Error, Debug)]
pub enum DeltaError {
    /// Error from the graph engine (loading, decoding, propagation bounds).
    #[error(transparent)]
    Graph(#[from] docdelta_graphs::GraphError),

    /// Error in configuration parsing or validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A module tree node does not carry the expected fields.
    #[error("Schema violation in module tree at {module:?}: {message}")]
    ModuleTree { module: String, message: String },
}

impl DeltaError {
    /// The underlying graph error, if this error came from the graph engine.
    pub fn as_graph_error(&self) -> Option<&docdelta_graphs::GraphError> {
        match self {
            Self::Graph(e) => Some(e),
            Self::Config(_) | Self::ModuleTree { .. } => None,
        }
    }
}

/// Errors in docdelta configuration parsing and validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist at the expected path.
    #[error("Config file not found: {0}")]
    NotFound(String),

    /// Configuration values are present but semantically invalid.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Configuration file syntax could not be parsed (TOML error).
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convenience alias for `Result<T, DeltaError>`.
pub type Result<T> = std::result::Result<T, DeltaError>;
