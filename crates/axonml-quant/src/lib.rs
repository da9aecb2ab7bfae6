//! Axonml Quant - Quantizer Kernels and Parameter Fitting
//!
//! Numeric building blocks used when a node's quantization configuration is
//! resolved and instantiated:
//!
//! - **Methods**: power-of-two, symmetric, uniform and LUT-symmetric grids
//! - **Quantizers**: fake-quantization (quantize then dequantize) per tensor
//!   or per channel
//! - **Params functions**: threshold / range / cluster-center fitting with an
//!   optional error-minimizing search (MSE, MAE, Lp)
//!
//! # Example
//! ```ignore
//! use axonml_quant::{symmetric_params, symmetric_quantizer, QuantizerSettings};
//!
//! let settings = QuantizerSettings::new(8).per_channel(0);
//! let params = symmetric_params(&weights, &[16, 3, 3, 3], &settings)?;
//! let fake_quantized = symmetric_quantizer(&weights, &[16, 3, 3, 3], &params, &settings)?;
//! ```
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod error;
pub mod method;
pub mod params;
pub mod quantize;
pub mod types;

pub use error::{QuantError, QuantResult};
pub use method::{QuantizationErrorMethod, QuantizationMethod, QuantizationTarget};
pub use params::{lut_symmetric_params, power_of_two_params, symmetric_params, uniform_params};
pub use quantize::{
    compute_quantization_error, lut_symmetric_quantizer, power_of_two_quantizer,
    symmetric_quantizer, uniform_quantizer,
};
pub use types::{ChannelLayout, ParamsFn, QuantizationParams, QuantizerFn, QuantizerSettings};

// =============================================================================
// Constants
// =============================================================================

/// Smallest threshold a params function returns (2^-16).
pub const MIN_THRESHOLD: f32 = 1.0 / 65536.0;

/// Default bit-width of the grid LUT cluster centers live on.
pub const LUT_VALUES_BITWIDTH: u32 = 8;

// =============================================================================
// Tests
// =============================================================================
