//! Framework Information
//!
//! Describes how a deep learning framework lays out its layers: which weight
//! attributes hold kernels, which axes are channels, and which activation
//! quantizers it ships.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use std::fmt;

use rustc_hash::FxHashMap;

use axonml_quant::{
    lut_symmetric_quantizer, power_of_two_quantizer, symmetric_quantizer, uniform_quantizer,
    QuantizationMethod, QuantizerFn,
};
use axonml_tpc::KERNEL_ATTR;

/// Output and input channel axes of a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelAxis {
    /// Output channel axis.
    pub output: Option<usize>,
    /// Input channel axis.
    pub input: Option<usize>,
}

impl ChannelAxis {
    /// Creates a mapping with both axes set.
    pub fn new(output: usize, input: usize) -> Self {
        Self {
            output: Some(output),
            input: Some(input),
        }
    }
}

/// Framework layout and activation quantizer table.
#[derive(Clone, Default)]
pub struct FrameworkInfo {
    kernel_ops_attributes_mapping: FxHashMap<String, Vec<String>>,
    kernel_channels_mapping: FxHashMap<String, ChannelAxis>,
    activation_quantizer_mapping: FxHashMap<QuantizationMethod, QuantizerFn>,
}

impl FrameworkInfo {
    /// Creates an empty description.
    pub fn new() -> Self {
        Self::default()
    }

    /// Layout of the built-in layer set.
    ///
    /// Convolution and linear kernels are stored output-channel first, except
    /// transposed convolutions which store input channels first. Activation
    /// quantizers cover every threshold and range method; LUT activations are
    /// not supported.
    pub fn standard() -> Self {
        let mut info = Self::new()
            .with_activation_quantizer(QuantizationMethod::PowerOfTwo, power_of_two_quantizer)
            .with_activation_quantizer(QuantizationMethod::Symmetric, symmetric_quantizer)
            .with_activation_quantizer(QuantizationMethod::Uniform, uniform_quantizer);

        for op_type in ["Conv1d", "Conv2d", "DepthwiseConv2d"] {
            info = info.with_kernel_op(op_type, &[KERNEL_ATTR], ChannelAxis::new(0, 1));
        }
        info.with_kernel_op("ConvTranspose2d", &[KERNEL_ATTR], ChannelAxis::new(1, 0))
            .with_kernel_op("Linear", &[KERNEL_ATTR], ChannelAxis::new(0, 1))
            .with_kernel_op("MatMul", &[KERNEL_ATTR], ChannelAxis::new(1, 0))
    }

    /// Registers the kernel attributes and channel axes of an operator type.
    pub fn with_kernel_op(mut self, op_type: &str, attrs: &[&str], channels: ChannelAxis) -> Self {
        self.kernel_ops_attributes_mapping
            .insert(op_type.to_string(), attrs.iter().map(|a| a.to_string()).collect());
        self.kernel_channels_mapping.insert(op_type.to_string(), channels);
        self
    }

    /// Registers the activation quantizer of a method.
    pub fn with_activation_quantizer(mut self, method: QuantizationMethod, quantizer: QuantizerFn) -> Self {
        self.activation_quantizer_mapping.insert(method, quantizer);
        self
    }

    /// Adds the LUT activation quantizer.
    pub fn with_lut_activations(self) -> Self {
        self.with_activation_quantizer(QuantizationMethod::LutSymmetric, lut_symmetric_quantizer)
    }

    /// Returns the kernel attributes of an operator type.
    ///
    /// Operator types without a registered entry yield a single `None`, which
    /// selects the default weight attribute config.
    pub fn kernel_op_attributes(&self, op_type: &str) -> Vec<Option<&str>> {
        match self.kernel_ops_attributes_mapping.get(op_type) {
            Some(attrs) => attrs.iter().map(|a| Some(a.as_str())).collect(),
            None => vec![None],
        }
    }

    /// Returns true if `op_type` has a registered kernel attribute list.
    pub fn is_kernel_op(&self, op_type: &str) -> bool {
        self.kernel_ops_attributes_mapping.contains_key(op_type)
    }

    /// Returns the channel axes of an operator type.
    pub fn kernel_channels_mapping(&self, op_type: &str) -> ChannelAxis {
        self.kernel_channels_mapping.get(op_type).copied().unwrap_or_default()
    }

    /// Returns the activation quantizer of a method.
    pub fn activation_quantizer(&self, method: QuantizationMethod) -> Option<QuantizerFn> {
        self.activation_quantizer_mapping.get(&method).copied()
    }

    /// Methods without an activation quantizer, in declaration order.
    pub fn missing_activation_quantizers(&self) -> Vec<QuantizationMethod> {
        QuantizationMethod::ALL
            .into_iter()
            .filter(|m| !self.activation_quantizer_mapping.contains_key(m))
            .collect()
    }
}

impl fmt::Debug for FrameworkInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut activation_methods: Vec<&str> =
            self.activation_quantizer_mapping.keys().map(|m| m.as_str()).collect();
        activation_methods.sort_unstable();
        f.debug_struct("FrameworkInfo")
            .field("kernel_ops_attributes_mapping", &self.kernel_ops_attributes_mapping)
            .field("kernel_channels_mapping", &self.kernel_channels_mapping)
            .field("activation_methods", &activation_methods)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_op_attributes() {
        let info = FrameworkInfo::standard();
        assert_eq!(info.kernel_op_attributes("Conv2d"), vec![Some("kernel")]);
        assert_eq!(info.kernel_op_attributes("ReLU"), vec![None]);
        assert!(info.is_kernel_op("Linear"));
        assert!(!info.is_kernel_op("ReLU"));
    }

    #[test]
    fn test_channel_axes() {
        let info = FrameworkInfo::standard();
        assert_eq!(info.kernel_channels_mapping("Conv2d").output, Some(0));
        assert_eq!(info.kernel_channels_mapping("ConvTranspose2d").output, Some(1));
        assert_eq!(info.kernel_channels_mapping("Add"), ChannelAxis::default());
    }

    #[test]
    fn test_multiple_kernel_attributes() {
        let info = FrameworkInfo::new().with_kernel_op("Attention", &["q", "k"], ChannelAxis::new(0, 1));
        assert_eq!(info.kernel_op_attributes("Attention"), vec![Some("q"), Some("k")]);
    }

    #[test]
    fn test_activation_quantizers() {
        let info = FrameworkInfo::standard();
        assert!(info.activation_quantizer(QuantizationMethod::Uniform).is_some());
        assert!(info.activation_quantizer(QuantizationMethod::LutSymmetric).is_none());
        assert_eq!(info.missing_activation_quantizers(), vec![QuantizationMethod::LutSymmetric]);

        let full = FrameworkInfo::standard().with_lut_activations();
        assert!(full.missing_activation_quantizers().is_empty());
        assert!(FrameworkInfo::new().missing_activation_quantizers().len() == 4);
    }
}
