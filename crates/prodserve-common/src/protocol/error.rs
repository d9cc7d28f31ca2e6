use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProdserveError {
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("Invalid registration for {archive}/{function}: {reason}")]
    InvalidRegistration {
        archive: String,
        function: String,
        reason: String,
    },

    #[error("Unknown archive: {0}")]
    UnknownArchive(String),

    #[error("Unknown function: {archive}/{function}")]
    UnknownFunction { archive: String, function: String },

    #[error("Invalid value for parameter '{parameter}': {reason}")]
    ArgumentType { parameter: String, reason: String },

    #[error("Function execution failed: {0}")]
    Execution(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProdserveError {
    /// Shorthand for the argument-coercion failure, which always names the
    /// offending parameter.
    pub fn argument(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        ProdserveError::ArgumentType {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProdserveError>;
