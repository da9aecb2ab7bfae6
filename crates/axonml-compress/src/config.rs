//! Config - Quantization Policy
//!
//! Global user policy shared by every node configuration. Loadable from and
//! savable to TOML.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use std::path::Path;

use serde::{Deserialize, Serialize};

use axonml_quant::{QuantizationErrorMethod, MIN_THRESHOLD};

use crate::error::{CompressError, CompressResult};

// =============================================================================
// Quantization Config
// =============================================================================

/// Quantization policy.
///
/// A plain value: every mixed-precision candidate owns its own clone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantizationConfig {
    /// Error measure for activation threshold search
    #[serde(default)]
    pub activation_error_method: QuantizationErrorMethod,

    /// Error measure for weights threshold search
    #[serde(default)]
    pub weights_error_method: QuantizationErrorMethod,

    /// Norm used by the Lp error method
    #[serde(default = "default_l_p_value")]
    pub l_p_value: f32,

    /// Bound ReLU outputs to a power of two
    #[serde(default)]
    pub relu_bound_to_power_of_2: bool,

    /// Apply bias correction after weights quantization
    #[serde(default = "default_true")]
    pub weights_bias_correction: bool,

    /// Correct the second moment of quantized weights
    #[serde(default)]
    pub weights_second_moment_correction: bool,

    /// Scale inputs of linear layers
    ///
    /// Not read while building candidates. Carried in each candidate's
    /// `quantization_config` for the graph transformation passes.
    #[serde(default)]
    pub input_scaling: bool,

    /// Shift negative activations before quantization
    #[serde(default)]
    pub shift_negative_activation_correction: bool,

    /// Equalize activation channels
    ///
    /// Carried like `input_scaling`.
    #[serde(default)]
    pub activation_channel_equalization: bool,

    /// Outlier removal threshold (in standard deviations)
    #[serde(default = "default_z_threshold")]
    pub z_threshold: f32,

    /// Smallest threshold a params function may return
    #[serde(default = "default_min_threshold")]
    pub min_threshold: f32,

    /// Collapse consecutive linear layers
    ///
    /// Carried like `input_scaling`.
    #[serde(default = "default_true")]
    pub linear_collapsing: bool,

    /// Collapse residual additions into convolutions
    ///
    /// Carried like `input_scaling`.
    #[serde(default = "default_true")]
    pub residual_collapsing: bool,
}

impl Default for QuantizationConfig {
    fn default() -> Self {
        Self {
            activation_error_method: QuantizationErrorMethod::default(),
            weights_error_method: QuantizationErrorMethod::default(),
            l_p_value: default_l_p_value(),
            relu_bound_to_power_of_2: false,
            weights_bias_correction: true,
            weights_second_moment_correction: false,
            input_scaling: false,
            shift_negative_activation_correction: false,
            activation_channel_equalization: false,
            z_threshold: default_z_threshold(),
            min_threshold: default_min_threshold(),
            linear_collapsing: true,
            residual_collapsing: true,
        }
    }
}

fn default_l_p_value() -> f32 {
    2.0
}
fn default_true() -> bool {
    true
}
fn default_z_threshold() -> f32 {
    f32::INFINITY
}
fn default_min_threshold() -> f32 {
    MIN_THRESHOLD
}

impl QuantizationConfig {
    /// Sets the error method of both weights and activations.
    pub fn with_error_method(mut self, error_method: QuantizationErrorMethod) -> Self {
        self.activation_error_method = error_method;
        self.weights_error_method = error_method;
        self
    }

    /// Checks numeric fields.
    pub fn validate(&self) -> CompressResult<()> {
        if self.l_p_value.is_nan() || self.l_p_value <= 0.0 {
            return Err(CompressError::Config(format!(
                "l_p_value must be positive, got {}",
                self.l_p_value
            )));
        }
        if self.min_threshold.is_nan() || self.min_threshold <= 0.0 {
            return Err(CompressError::Config(format!(
                "min_threshold must be positive, got {}",
                self.min_threshold
            )));
        }
        if self.z_threshold.is_nan() || self.z_threshold <= 0.0 {
            return Err(CompressError::Config(format!(
                "z_threshold must be positive, got {}",
                self.z_threshold
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Parses and validates a policy from TOML.
    pub fn from_toml_str(content: &str) -> CompressResult<Self> {
        let config: QuantizationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a policy file.
    pub fn load<P: AsRef<Path>>(path: P) -> CompressResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Saves the policy to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> CompressResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = QuantizationConfig::default();
        assert_eq!(config.weights_error_method, QuantizationErrorMethod::Mse);
        assert!(config.weights_bias_correction);
        assert!(config.z_threshold.is_infinite());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = QuantizationConfig::from_toml_str(
            r#"
            weights_error_method = "no_clipping"
            relu_bound_to_power_of_2 = true
            "#,
        )
        .unwrap();
        assert_eq!(config.weights_error_method, QuantizationErrorMethod::NoClipping);
        assert_eq!(config.activation_error_method, QuantizationErrorMethod::Mse);
        assert!(config.relu_bound_to_power_of_2);
        assert!(config.linear_collapsing);
        assert_eq!(config.l_p_value, 2.0);
    }

    #[test]
    fn test_from_toml_rejects_bad_values() {
        assert!(matches!(
            QuantizationConfig::from_toml_str("l_p_value = -1.0"),
            Err(CompressError::Config(_))
        ));
        assert!(matches!(
            QuantizationConfig::from_toml_str("weights_error_method = \"median\""),
            Err(CompressError::Config(_))
        ));
    }

    #[test]
    fn test_clone_is_independent() {
        let config = QuantizationConfig::default();
        let mut copy = config.clone();
        copy.input_scaling = true;
        assert!(!config.input_scaling);
        assert_ne!(config, copy);
    }
}
