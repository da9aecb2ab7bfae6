//! TPC Error Types
//!
//! Error types for target platform capability models.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use thiserror::Error;

/// Result type for platform model operations.
pub type TpcResult<T> = Result<T, TpcError>;

/// Errors raised while building or loading a platform model.
#[derive(Error, Debug)]
pub enum TpcError {
    /// Options without any configuration.
    #[error("Quantization config options must contain at least one configuration")]
    EmptyOptions,

    /// Several configurations but no base configuration.
    #[error("A base configuration is required when {0} configurations are given")]
    MissingBaseConfig(usize),

    /// Base configuration that is not one of the options.
    #[error("Base configuration is not a member of the configuration list")]
    BaseNotInList,

    /// Base index out of range while deserializing.
    #[error("Base configuration index {index} out of range for {len} configurations")]
    BaseIndexOutOfRange {
        /// Index read from the model file.
        index: usize,
        /// Number of configurations.
        len: usize,
    },

    /// Same operator type listed by two operator sets.
    #[error("Operator type '{op_type}' appears in operator sets '{first}' and '{second}'")]
    DuplicateOpType {
        /// Operator type.
        op_type: String,
        /// First set listing it.
        first: String,
        /// Second set listing it.
        second: String,
    },

    /// Platform model file could not be parsed.
    #[error("Failed to parse platform model: {0}")]
    Parse(String),

    /// Platform model could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for TpcError {
    fn from(e: toml::de::Error) -> Self {
        TpcError::Parse(e.to_string())
    }
}

impl From<toml::ser::Error> for TpcError {
    fn from(e: toml::ser::Error) -> Self {
        TpcError::Serialization(e.to_string())
    }
}
