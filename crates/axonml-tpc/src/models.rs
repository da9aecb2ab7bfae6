//! Built-in Platform Models
//!
//! Ready-made capability models for common deployment targets.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use axonml_quant::QuantizationMethod;

use crate::capabilities::{OperatorsSet, TargetPlatformCapabilities};
use crate::error::TpcResult;
use crate::op_config::{AttributeQuantizationConfig, OpQuantizationConfig, QuantizationConfigOptions};

/// Name of the weight attribute holding a layer's kernel.
pub const KERNEL_ATTR: &str = "kernel";

/// Name of the weight attribute holding a layer's bias.
pub const BIAS_ATTR: &str = "bias";

/// Convolution operator types.
const CONV_OPS: &[&str] = &["Conv1d", "Conv2d", "DepthwiseConv2d", "ConvTranspose2d"];

/// Fully connected operator types.
const LINEAR_OPS: &[&str] = &["Linear", "MatMul"];

/// Operators that only move data around.
const NO_QUANTIZATION_OPS: &[&str] = &[
    "Reshape", "Flatten", "Transpose", "Permute", "Squeeze", "Unsqueeze", "Dropout", "Identity",
    "Split", "Gather",
];

/// Activation and element-wise operators.
const ACTIVATION_OPS: &[&str] = &[
    "ReLU", "ReLU6", "LeakyReLU", "Sigmoid", "Tanh", "GELU", "SiLU", "Hardswish", "Add", "Sub",
    "Mul", "Concat", "Softmax",
];

// =============================================================================
// Default Platform
// =============================================================================

/// Default edge platform.
///
/// Symmetric per-channel 8-bit kernels with power-of-two activations. Kernels
/// of convolution and fully connected layers may also be quantized to 4 or 2
/// bits when mixed precision is enabled.
pub fn default_tpc() -> TpcResult<TargetPlatformCapabilities> {
    let base = default_op_config(8);
    let default_qco = QuantizationConfigOptions::single(base.clone());

    let mixed_precision = [8, 4, 2].into_iter().map(default_op_config).collect();
    let weights_mp = QuantizationConfigOptions::new(mixed_precision, Some(&base))?;

    let no_quantization = default_qco
        .clone_and_edit(|c| c.enable_activation_quantization = false)
        .clone_and_edit_weight_attribute(None, |a| a.enable_weights_quantization = false);

    let tpc = TargetPlatformCapabilities::new("default", default_qco)
        .with_version("v1")
        .with_operator_set(OperatorsSet::new("NoQuantization", NO_QUANTIZATION_OPS).with_options(no_quantization))
        .with_operator_set(OperatorsSet::new("Conv", CONV_OPS).with_options(weights_mp.clone()))
        .with_operator_set(OperatorsSet::new("FullyConnected", LINEAR_OPS).with_options(weights_mp))
        .with_operator_set(OperatorsSet::new("Activations", ACTIVATION_OPS));
    tpc.validate()?;
    Ok(tpc)
}

fn default_op_config(kernel_bits: u32) -> OpQuantizationConfig {
    OpQuantizationConfig::new(QuantizationMethod::PowerOfTwo, 8)
        .with_default_weight_attr_config(AttributeQuantizationConfig::default())
        .with_attr_config(
            KERNEL_ATTR,
            AttributeQuantizationConfig::new(QuantizationMethod::Symmetric, kernel_bits, true),
        )
        .with_attr_config(
            BIAS_ATTR,
            AttributeQuantizationConfig::new(QuantizationMethod::PowerOfTwo, 32, false).disabled(),
        )
}

// =============================================================================
// QNNPACK Platform
// =============================================================================

/// QNNPACK-style platform: per-tensor symmetric 8-bit kernels, uniform 8-bit
/// activations and a single option for every operator.
pub fn qnnpack_tpc() -> TpcResult<TargetPlatformCapabilities> {
    let base = OpQuantizationConfig::new(QuantizationMethod::Uniform, 8)
        .with_attr_config(
            KERNEL_ATTR,
            AttributeQuantizationConfig::new(QuantizationMethod::Symmetric, 8, false),
        )
        .with_attr_config(
            BIAS_ATTR,
            AttributeQuantizationConfig::new(QuantizationMethod::Symmetric, 32, false).disabled(),
        );
    let default_qco = QuantizationConfigOptions::single(base);

    let tpc = TargetPlatformCapabilities::new("qnnpack", default_qco)
        .with_version("v1")
        .with_operator_set(OperatorsSet::new("Conv", &["Conv2d", "DepthwiseConv2d", "ConvTranspose2d"]))
        .with_operator_set(OperatorsSet::new("Linear", &["Linear"]))
        .with_operator_set(OperatorsSet::new("BatchNorm", &["BatchNorm2d"]))
        .with_operator_set(OperatorsSet::new("Relu", &["ReLU", "ReLU6"]));
    tpc.validate()?;
    Ok(tpc)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tpc_is_valid() {
        let tpc = default_tpc().unwrap();
        assert!(tpc.validate().is_ok());
        assert_eq!(tpc.name, "default");
    }

    #[test]
    fn test_default_tpc_conv_mixed_precision() {
        let tpc = default_tpc().unwrap();
        let conv = tpc.get_qco("Conv2d");
        let bits: Vec<u32> = conv
            .quantization_config_list()
            .iter()
            .map(|c| c.attr_config(KERNEL_ATTR).unwrap().weights_n_bits)
            .collect();
        assert_eq!(bits, vec![8, 4, 2]);
        assert_eq!(conv.base_config().attr_config(KERNEL_ATTR).unwrap().weights_n_bits, 8);
        assert_eq!(tpc.get_qco("Linear").len(), 3);
    }

    #[test]
    fn test_default_tpc_no_quantization_set() {
        let tpc = default_tpc().unwrap();
        let reshape = tpc.get_qco("Reshape").base_config();
        assert!(!reshape.enable_activation_quantization);
        assert!(!reshape.attr_config(KERNEL_ATTR).unwrap().enable_weights_quantization);

        let relu = tpc.get_qco("ReLU");
        assert_eq!(relu.len(), 1);
        assert!(relu.base_config().enable_activation_quantization);
    }

    #[test]
    fn test_qnnpack_tpc() {
        let tpc = qnnpack_tpc().unwrap();
        let conv = tpc.get_qco("Conv2d").base_config();
        assert_eq!(conv.activation_quantization_method.as_str(), "UNIFORM");
        assert!(!conv.attr_config(KERNEL_ATTR).unwrap().weights_per_channel_threshold);
    }

    #[test]
    fn test_builtin_model_toml_round_trip() {
        let tpc = default_tpc().unwrap();
        let content = tpc.to_toml_string().unwrap();
        let restored = TargetPlatformCapabilities::from_toml_str(&content).unwrap();
        assert_eq!(restored, tpc);
    }
}
