//! Compress Error Types
//!
//! Errors raised while resolving node quantization configurations.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use thiserror::Error;

use axonml_graph::GraphError;
use axonml_quant::{QuantError, QuantizationTarget};
use axonml_tpc::TpcError;

/// Result type for configuration passes.
pub type CompressResult<T> = Result<T, CompressError>;

/// Errors raised by the configuration passes.
#[derive(Error, Debug)]
pub enum CompressError {
    /// Method name without a quantizer for the given target.
    #[error("Unknown quantization method '{method}' for {target}{}", attribute_suffix(.attribute))]
    UnknownQuantizationMethod {
        /// Method name as written in the platform model.
        method: String,
        /// Weights or activation.
        target: QuantizationTarget,
        /// Weight attribute being quantized, for weights.
        attribute: Option<String>,
    },

    /// Operator type whose kernel attribute list does not have one entry.
    #[error("Expected exactly one kernel attribute for operator type '{op_type}', found {found}")]
    KernelAttributeResolution {
        /// Operator type.
        op_type: String,
        /// Number of kernel attributes found.
        found: usize,
    },

    /// Enabled weights quantization on a node without the kernel tensor.
    #[error("Node '{node}' has no weight attribute '{attribute}'")]
    MissingWeight {
        /// Node name.
        node: String,
        /// Attribute name.
        attribute: String,
    },

    /// Invalid policy file.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Numeric kernel error.
    #[error("Quantization error: {0}")]
    Quant(#[from] QuantError),

    /// Platform model error.
    #[error("Platform model error: {0}")]
    Tpc(#[from] TpcError),

    /// Graph error.
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn attribute_suffix(attribute: &Option<String>) -> String {
    match attribute {
        Some(attr) => format!(" (attribute '{attr}')"),
        None => String::new(),
    }
}

impl From<toml::de::Error> for CompressError {
    fn from(e: toml::de::Error) -> Self {
        CompressError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for CompressError {
    fn from(e: toml::ser::Error) -> Self {
        CompressError::Config(e.to_string())
    }
}
