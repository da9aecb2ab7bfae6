//! Node Quantization Configurations
//!
//! Resolved per-node configurations: the weights side, the activation side,
//! and the candidate pairing both. Each side carries its bound quantizer and
//! params function and, once computed, its fitted parameters.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use std::fmt;

use axonml_quant::{
    ParamsFn, QuantError, QuantResult, QuantizationErrorMethod, QuantizationMethod,
    QuantizationParams, QuantizerFn, QuantizerSettings,
};
use axonml_tpc::{AttributeQuantizationConfig, OpQuantizationConfig};

use crate::config::QuantizationConfig;
use crate::selection::SelectedFunctions;

// =============================================================================
// Weights Configuration
// =============================================================================

/// How a node's kernel is quantized.
#[derive(Clone)]
pub struct NodeWeightsQuantizationConfig {
    /// Resolved method.
    pub weights_quantization_method: QuantizationMethod,
    /// Number of bits.
    pub weights_n_bits: u32,
    /// Whether thresholds are fitted per output channel.
    pub weights_per_channel_threshold: bool,
    /// Output channel axis of the kernel.
    pub weights_channels_axis: Option<usize>,
    /// Whether the kernel is quantized.
    pub enable_weights_quantization: bool,
    /// Error measure of the threshold search.
    pub weights_error_method: QuantizationErrorMethod,
    /// Norm for the Lp error.
    pub l_p_value: f32,
    /// Smallest fitted threshold.
    pub min_threshold: f32,
    /// Bias correction flag from the policy.
    pub weights_bias_correction: bool,
    /// Second moment correction flag from the policy.
    pub weights_second_moment_correction: bool,
    /// LUT values grid bit-width.
    pub lut_values_bitwidth: u32,
    /// Bound quantizer.
    pub weights_quantization_fn: QuantizerFn,
    /// Bound params function.
    pub weights_quantization_params_fn: ParamsFn,
    /// Fitted parameters, `None` until computed.
    pub weights_quantization_params: Option<QuantizationParams>,
}

impl NodeWeightsQuantizationConfig {
    /// Builds the weights side from the policy and an attribute config.
    pub fn new(
        qc: &QuantizationConfig,
        attr_cfg: &AttributeQuantizationConfig,
        functions: SelectedFunctions,
        weights_channels_axis: Option<usize>,
    ) -> Self {
        Self {
            weights_quantization_method: functions.method,
            weights_n_bits: attr_cfg.weights_n_bits,
            weights_per_channel_threshold: attr_cfg.weights_per_channel_threshold,
            weights_channels_axis,
            enable_weights_quantization: attr_cfg.enable_weights_quantization,
            weights_error_method: qc.weights_error_method,
            l_p_value: qc.l_p_value,
            min_threshold: qc.min_threshold,
            weights_bias_correction: qc.weights_bias_correction,
            weights_second_moment_correction: qc.weights_second_moment_correction,
            lut_values_bitwidth: attr_cfg.lut_values_bitwidth,
            weights_quantization_fn: functions.quantization_fn,
            weights_quantization_params_fn: functions.params_fn,
            weights_quantization_params: None,
        }
    }

    /// Settings passed to the bound functions.
    ///
    /// Per-channel only when requested and the kernel has a channel axis.
    pub fn settings(&self) -> QuantizerSettings {
        let mut settings = QuantizerSettings::new(self.weights_n_bits).with_error_method(self.weights_error_method);
        settings.l_p_value = self.l_p_value;
        settings.min_threshold = self.min_threshold;
        settings.lut_values_bitwidth = self.lut_values_bitwidth;
        match self.weights_channels_axis {
            Some(axis) if self.weights_per_channel_threshold => settings.per_channel(axis),
            _ => settings,
        }
    }

    /// Fits and stores parameters for `kernel`.
    pub fn fit_params(&mut self, kernel: &[f32], shape: &[usize]) -> QuantResult<&QuantizationParams> {
        let params = (self.weights_quantization_params_fn)(kernel, shape, &self.settings())?;
        Ok(&*self.weights_quantization_params.insert(params))
    }

    /// Fake-quantizes `kernel` with the stored parameters.
    pub fn quantize(&self, kernel: &[f32], shape: &[usize]) -> QuantResult<Vec<f32>> {
        let params = self
            .weights_quantization_params
            .as_ref()
            .ok_or_else(|| QuantError::InvalidParams("weights parameters not computed".to_string()))?;
        (self.weights_quantization_fn)(kernel, shape, params, &self.settings())
    }
}

impl PartialEq for NodeWeightsQuantizationConfig {
    // Bound functions follow from the method
    fn eq(&self, other: &Self) -> bool {
        self.weights_quantization_method == other.weights_quantization_method
            && self.weights_n_bits == other.weights_n_bits
            && self.weights_per_channel_threshold == other.weights_per_channel_threshold
            && self.weights_channels_axis == other.weights_channels_axis
            && self.enable_weights_quantization == other.enable_weights_quantization
            && self.weights_error_method == other.weights_error_method
            && self.l_p_value == other.l_p_value
            && self.min_threshold == other.min_threshold
            && self.weights_bias_correction == other.weights_bias_correction
            && self.weights_second_moment_correction == other.weights_second_moment_correction
            && self.lut_values_bitwidth == other.lut_values_bitwidth
            && self.weights_quantization_params == other.weights_quantization_params
    }
}

impl fmt::Debug for NodeWeightsQuantizationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeWeightsQuantizationConfig")
            .field("method", &self.weights_quantization_method)
            .field("n_bits", &self.weights_n_bits)
            .field("per_channel", &self.weights_per_channel_threshold)
            .field("channels_axis", &self.weights_channels_axis)
            .field("enabled", &self.enable_weights_quantization)
            .field("error_method", &self.weights_error_method)
            .field("params", &self.weights_quantization_params)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Activation Configuration
// =============================================================================

/// How a node's output is quantized.
#[derive(Clone)]
pub struct NodeActivationQuantizationConfig {
    /// Resolved method.
    pub activation_quantization_method: QuantizationMethod,
    /// Number of bits.
    pub activation_n_bits: u32,
    /// Whether the output is quantized.
    pub enable_activation_quantization: bool,
    /// Error measure of the threshold search.
    pub activation_error_method: QuantizationErrorMethod,
    /// Norm for the Lp error.
    pub l_p_value: f32,
    /// Smallest fitted threshold.
    pub min_threshold: f32,
    /// Outlier removal threshold.
    pub z_threshold: f32,
    /// Bound ReLU outputs to a power of two.
    pub relu_bound_to_power_of_2: bool,
    /// Shift negative activations before quantization.
    pub shift_negative_activation_correction: bool,
    /// Output keeps the input's quantization.
    pub quantization_preserving: bool,
    /// Bound quantizer.
    pub activation_quantization_fn: QuantizerFn,
    /// Bound params function.
    pub activation_quantization_params_fn: ParamsFn,
    /// Fitted parameters, `None` until computed.
    pub activation_quantization_params: Option<QuantizationParams>,
}

impl NodeActivationQuantizationConfig {
    /// Builds the activation side from the policy and an operator config.
    pub fn new(qc: &QuantizationConfig, op_cfg: &OpQuantizationConfig, functions: SelectedFunctions) -> Self {
        Self {
            activation_quantization_method: functions.method,
            activation_n_bits: op_cfg.activation_n_bits,
            enable_activation_quantization: op_cfg.enable_activation_quantization,
            activation_error_method: qc.activation_error_method,
            l_p_value: qc.l_p_value,
            min_threshold: qc.min_threshold,
            z_threshold: qc.z_threshold,
            relu_bound_to_power_of_2: qc.relu_bound_to_power_of_2,
            shift_negative_activation_correction: qc.shift_negative_activation_correction,
            quantization_preserving: op_cfg.quantization_preserving,
            activation_quantization_fn: functions.quantization_fn,
            activation_quantization_params_fn: functions.params_fn,
            activation_quantization_params: None,
        }
    }

    /// Settings passed to the bound functions. Activations are per tensor.
    pub fn settings(&self) -> QuantizerSettings {
        let mut settings =
            QuantizerSettings::new(self.activation_n_bits).with_error_method(self.activation_error_method);
        settings.l_p_value = self.l_p_value;
        settings.min_threshold = self.min_threshold;
        settings
    }

    /// Fits and stores parameters from collected output samples.
    pub fn fit_params(&mut self, samples: &[f32]) -> QuantResult<&QuantizationParams> {
        let samples = self.remove_outliers(samples);
        let params = (self.activation_quantization_params_fn)(&samples, &[samples.len()], &self.settings())?;
        Ok(&*self.activation_quantization_params.insert(params))
    }

    /// Fake-quantizes `data` with the stored parameters.
    pub fn quantize(&self, data: &[f32]) -> QuantResult<Vec<f32>> {
        let params = self
            .activation_quantization_params
            .as_ref()
            .ok_or_else(|| QuantError::InvalidParams("activation parameters not computed".to_string()))?;
        (self.activation_quantization_fn)(data, &[data.len()], params, &self.settings())
    }

    /// Drops samples more than `z_threshold` standard deviations from the mean.
    fn remove_outliers(&self, samples: &[f32]) -> Vec<f32> {
        if !self.z_threshold.is_finite() || samples.len() < 2 {
            return samples.to_vec();
        }
        let n = samples.len() as f32;
        let mean = samples.iter().sum::<f32>() / n;
        let std = (samples.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / n).sqrt();
        if std == 0.0 {
            return samples.to_vec();
        }
        samples
            .iter()
            .copied()
            .filter(|x| ((x - mean) / std).abs() <= self.z_threshold)
            .collect()
    }
}

impl PartialEq for NodeActivationQuantizationConfig {
    fn eq(&self, other: &Self) -> bool {
        self.activation_quantization_method == other.activation_quantization_method
            && self.activation_n_bits == other.activation_n_bits
            && self.enable_activation_quantization == other.enable_activation_quantization
            && self.activation_error_method == other.activation_error_method
            && self.l_p_value == other.l_p_value
            && self.min_threshold == other.min_threshold
            && self.z_threshold == other.z_threshold
            && self.relu_bound_to_power_of_2 == other.relu_bound_to_power_of_2
            && self.shift_negative_activation_correction == other.shift_negative_activation_correction
            && self.quantization_preserving == other.quantization_preserving
            && self.activation_quantization_params == other.activation_quantization_params
    }
}

impl fmt::Debug for NodeActivationQuantizationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeActivationQuantizationConfig")
            .field("method", &self.activation_quantization_method)
            .field("n_bits", &self.activation_n_bits)
            .field("enabled", &self.enable_activation_quantization)
            .field("error_method", &self.activation_error_method)
            .field("params", &self.activation_quantization_params)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Candidate
// =============================================================================

/// One candidate configuration of a node.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateNodeQuantizationConfig {
    /// Policy the candidate was built from; owned by this candidate.
    pub quantization_config: QuantizationConfig,
    /// Weights side.
    pub weights_quantization_cfg: NodeWeightsQuantizationConfig,
    /// Activation side.
    pub activation_quantization_cfg: NodeActivationQuantizationConfig,
}

impl CandidateNodeQuantizationConfig {
    /// Pairs a weights and an activation config built from `qc`.
    pub fn new(
        qc: QuantizationConfig,
        op_cfg: &OpQuantizationConfig,
        weights_cfg: &AttributeQuantizationConfig,
        weights_functions: SelectedFunctions,
        activation_functions: SelectedFunctions,
        weights_channels_axis: Option<usize>,
    ) -> Self {
        let weights_quantization_cfg =
            NodeWeightsQuantizationConfig::new(&qc, weights_cfg, weights_functions, weights_channels_axis);
        let activation_quantization_cfg = NodeActivationQuantizationConfig::new(&qc, op_cfg, activation_functions);
        Self {
            quantization_config: qc,
            weights_quantization_cfg,
            activation_quantization_cfg,
        }
    }

    /// Weights bit-width.
    pub fn weights_n_bits(&self) -> u32 {
        self.weights_quantization_cfg.weights_n_bits
    }

    /// Activation bit-width.
    pub fn activation_n_bits(&self) -> u32 {
        self.activation_quantization_cfg.activation_n_bits
    }

    /// `(weights_n_bits, activation_n_bits)`, the candidate ordering key.
    pub fn bit_widths(&self) -> (u32, u32) {
        (self.weights_n_bits(), self.activation_n_bits())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::{select_activation_functions, select_weights_functions};
    use axonml_graph::FrameworkInfo;
    use axonml_tpc::MethodName;

    fn candidate(weights_bits: u32, per_channel: bool) -> CandidateNodeQuantizationConfig {
        let op_cfg = OpQuantizationConfig::new(QuantizationMethod::PowerOfTwo, 8);
        let attr = AttributeQuantizationConfig::new(QuantizationMethod::Symmetric, weights_bits, per_channel);
        let weights = select_weights_functions(&attr.weights_quantization_method, Some("kernel")).unwrap();
        let activation =
            select_activation_functions(&MethodName::new("POWER_OF_TWO"), &FrameworkInfo::standard()).unwrap();
        CandidateNodeQuantizationConfig::new(QuantizationConfig::default(), &op_cfg, &attr, weights, activation, Some(0))
    }

    #[test]
    fn test_candidate_fields() {
        let c = candidate(4, true);
        assert_eq!(c.bit_widths(), (4, 8));
        assert_eq!(c.weights_quantization_cfg.weights_quantization_method, QuantizationMethod::Symmetric);
        assert_eq!(c.activation_quantization_cfg.activation_quantization_method, QuantizationMethod::PowerOfTwo);
        assert!(c.weights_quantization_cfg.enable_weights_quantization);
        assert!(c.weights_quantization_cfg.weights_quantization_params.is_none());
        assert!(c.weights_quantization_cfg.weights_bias_correction);
    }

    #[test]
    fn test_weights_settings_per_channel() {
        assert_eq!(candidate(8, true).weights_quantization_cfg.settings().channel_axis, Some(0));
        assert_eq!(candidate(8, false).weights_quantization_cfg.settings().channel_axis, None);
    }

    #[test]
    fn test_weights_fit_and_quantize() {
        let mut cfg = candidate(8, true).weights_quantization_cfg;
        let kernel: Vec<f32> = (0..8).map(|i| i as f32 * 0.25 - 1.0).collect();
        assert!(cfg.quantize(&kernel, &[2, 4]).is_err());

        let params = cfg.fit_params(&kernel, &[2, 4]).unwrap();
        assert_eq!(params.num_channels(), 2);
        let quantized = cfg.quantize(&kernel, &[2, 4]).unwrap();
        for (q, x) in quantized.iter().zip(kernel.iter()) {
            assert!((q - x).abs() < 0.05);
        }
    }

    #[test]
    fn test_activation_fit_and_quantize() {
        let mut cfg = candidate(8, true).activation_quantization_cfg;
        let samples = [0.0, 0.5, 1.0, 1.5, 2.0];
        cfg.fit_params(&samples).unwrap();
        assert!(cfg.activation_quantization_params.as_ref().unwrap().is_per_tensor());
        assert_eq!(cfg.quantize(&samples).unwrap().len(), samples.len());
    }

    #[test]
    fn test_activation_outlier_removal() {
        let mut cfg = candidate(8, true).activation_quantization_cfg;
        cfg.z_threshold = 2.0;
        let mut samples = vec![1.0f32; 20];
        samples.push(1000.0);
        assert_eq!(cfg.remove_outliers(&samples).len(), 20);

        cfg.z_threshold = f32::INFINITY;
        assert_eq!(cfg.remove_outliers(&samples).len(), 21);
    }

    #[test]
    fn test_candidate_equality_ignores_identity() {
        let a = candidate(8, true);
        let b = candidate(8, true);
        assert_eq!(a, b);
        assert_ne!(a, candidate(4, true));
    }
}
