//! Quantization Error Types
//!
//! Error types for quantizer kernels and parameter fitting.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use thiserror::Error;

/// Result type for quantization operations.
pub type QuantResult<T> = Result<T, QuantError>;

/// Errors that can occur during quantization.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuantError {
    /// Invalid number of bits.
    #[error("Invalid bit-width: {0} (expected 1..=32)")]
    InvalidBitWidth(u32),

    /// Unknown quantization method name.
    #[error("Unknown quantization method: {0}")]
    UnknownMethod(String),

    /// Unknown error method name.
    #[error("Unknown quantization error method: {0}")]
    UnknownErrorMethod(String),

    /// Data length does not match the declared shape.
    #[error("Data length mismatch: expected {expected}, got {actual}")]
    DataLengthMismatch {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Channel axis outside of the tensor rank.
    #[error("Invalid channel axis {axis} for shape {shape:?}")]
    InvalidChannelAxis {
        /// Requested axis.
        axis: usize,
        /// Tensor shape.
        shape: Vec<usize>,
    },

    /// Parameters do not fit the quantizer or the tensor.
    #[error("Invalid quantization parameters: {0}")]
    InvalidParams(String),

    /// Tensor has no elements.
    #[error("Cannot fit quantization parameters on an empty tensor")]
    EmptyTensor,
}
