//! Quantizer Function Selection
//!
//! Maps quantization methods to the quantizer and params functions that
//! implement them.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use axonml_graph::FrameworkInfo;
use axonml_quant::{
    lut_symmetric_params, lut_symmetric_quantizer, power_of_two_params, power_of_two_quantizer,
    symmetric_params, symmetric_quantizer, uniform_params, uniform_quantizer, ParamsFn,
    QuantizationMethod, QuantizationTarget, QuantizerFn,
};
use axonml_tpc::MethodName;

use crate::error::{CompressError, CompressResult};

// =============================================================================
// Method Tables
// =============================================================================

/// Weights quantizer of a method.
pub fn get_weights_quantization_fn(method: QuantizationMethod) -> QuantizerFn {
    match method {
        QuantizationMethod::PowerOfTwo => power_of_two_quantizer,
        QuantizationMethod::Symmetric => symmetric_quantizer,
        QuantizationMethod::Uniform => uniform_quantizer,
        QuantizationMethod::LutSymmetric => lut_symmetric_quantizer,
    }
}

/// Weights params function of a method.
pub fn get_weights_quantization_params_fn(method: QuantizationMethod) -> ParamsFn {
    match method {
        QuantizationMethod::PowerOfTwo => power_of_two_params,
        QuantizationMethod::Symmetric => symmetric_params,
        QuantizationMethod::Uniform => uniform_params,
        QuantizationMethod::LutSymmetric => lut_symmetric_params,
    }
}

/// Activation params function of a method.
pub fn get_activation_quantization_params_fn(method: QuantizationMethod) -> ParamsFn {
    match method {
        QuantizationMethod::PowerOfTwo => power_of_two_params,
        QuantizationMethod::Symmetric => symmetric_params,
        QuantizationMethod::Uniform => uniform_params,
        QuantizationMethod::LutSymmetric => lut_symmetric_params,
    }
}

// =============================================================================
// Selection
// =============================================================================

/// Functions bound to one side of a candidate.
#[derive(Clone, Copy)]
pub struct SelectedFunctions {
    /// Resolved method.
    pub method: QuantizationMethod,
    /// Quantizer.
    pub quantization_fn: QuantizerFn,
    /// Params function.
    pub params_fn: ParamsFn,
}

impl std::fmt::Debug for SelectedFunctions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedFunctions").field("method", &self.method).finish_non_exhaustive()
    }
}

/// Resolves the weights functions of `method`.
///
/// `attribute` names the weight attribute being quantized and is only used
/// in the error.
pub fn select_weights_functions(
    method: &MethodName,
    attribute: Option<&str>,
) -> CompressResult<SelectedFunctions> {
    let resolved = method.resolve().map_err(|_| CompressError::UnknownQuantizationMethod {
        method: method.as_str().to_string(),
        target: QuantizationTarget::Weights,
        attribute: attribute.map(str::to_string),
    })?;
    Ok(SelectedFunctions {
        method: resolved,
        quantization_fn: get_weights_quantization_fn(resolved),
        params_fn: get_weights_quantization_params_fn(resolved),
    })
}

/// Resolves the activation functions of `method`.
///
/// The quantizer comes from the framework, so a method the framework does
/// not ship fails like an unknown name.
pub fn select_activation_functions(
    method: &MethodName,
    fw_info: &FrameworkInfo,
) -> CompressResult<SelectedFunctions> {
    let unknown = || CompressError::UnknownQuantizationMethod {
        method: method.as_str().to_string(),
        target: QuantizationTarget::Activation,
        attribute: None,
    };
    let resolved = method.resolve().map_err(|_| unknown())?;
    let quantization_fn = fw_info.activation_quantizer(resolved).ok_or_else(unknown)?;
    Ok(SelectedFunctions {
        method: resolved,
        quantization_fn,
        params_fn: get_activation_quantization_params_fn(resolved),
    })
}

// =============================================================================
// Tests
// =============================================================================
