//! Operator Quantization Configurations
//!
//! The legal quantization options a platform offers for one operator type.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use std::collections::BTreeMap;
use std::fmt;

use axonml_quant::{QuantError, QuantizationMethod, LUT_VALUES_BITWIDTH};
use serde::{Deserialize, Serialize};

use crate::error::{TpcError, TpcResult};

// =============================================================================
// Method Name
// =============================================================================

/// A quantization method as named by a platform model.
///
/// Platform models are written independently of the quantizer tables, so the
/// name is kept verbatim and only resolved when a node is configured.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodName(String);

impl MethodName {
    /// Creates a method name from any string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the raw name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolves the name against the known methods.
    pub fn resolve(&self) -> Result<QuantizationMethod, QuantError> {
        self.0.parse()
    }
}

impl From<QuantizationMethod> for MethodName {
    fn from(method: QuantizationMethod) -> Self {
        Self(method.as_str().to_string())
    }
}

impl From<&str> for MethodName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl fmt::Display for MethodName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Attribute Configuration
// =============================================================================

/// How one weight attribute of an operator is quantized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeQuantizationConfig {
    /// Quantization method for the attribute.
    pub weights_quantization_method: MethodName,

    /// Number of bits.
    #[serde(default = "default_n_bits")]
    pub weights_n_bits: u32,

    /// Whether thresholds are fitted per output channel.
    #[serde(default)]
    pub weights_per_channel_threshold: bool,

    /// Whether the attribute is quantized at all.
    #[serde(default)]
    pub enable_weights_quantization: bool,

    /// Bit-width of the LUT values grid.
    #[serde(default = "default_lut_values_bitwidth")]
    pub lut_values_bitwidth: u32,
}

impl AttributeQuantizationConfig {
    /// Creates an enabled attribute configuration.
    pub fn new(method: impl Into<MethodName>, n_bits: u32, per_channel: bool) -> Self {
        Self {
            weights_quantization_method: method.into(),
            weights_n_bits: n_bits,
            weights_per_channel_threshold: per_channel,
            enable_weights_quantization: true,
            lut_values_bitwidth: LUT_VALUES_BITWIDTH,
        }
    }

    /// Returns a copy with quantization disabled.
    pub fn disabled(mut self) -> Self {
        self.enable_weights_quantization = false;
        self
    }
}

impl Default for AttributeQuantizationConfig {
    fn default() -> Self {
        Self::new(QuantizationMethod::PowerOfTwo, default_n_bits(), false).disabled()
    }
}

fn default_n_bits() -> u32 {
    8
}

fn default_lut_values_bitwidth() -> u32 {
    LUT_VALUES_BITWIDTH
}

// =============================================================================
// Operator Configuration
// =============================================================================

/// One legal quantization configuration for an operator type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpQuantizationConfig {
    /// Used for weight attributes missing from `attr_weights_configs_mapping`.
    #[serde(default)]
    pub default_weight_attr_config: AttributeQuantizationConfig,

    /// Per-attribute weight configurations (e.g. "kernel", "bias").
    #[serde(default)]
    pub attr_weights_configs_mapping: BTreeMap<String, AttributeQuantizationConfig>,

    /// Quantization method for the operator output.
    pub activation_quantization_method: MethodName,

    /// Number of activation bits.
    #[serde(default = "default_n_bits")]
    pub activation_n_bits: u32,

    /// Whether the output is quantized.
    #[serde(default = "default_true")]
    pub enable_activation_quantization: bool,

    /// Whether the operator keeps its input's quantization unchanged.
    #[serde(default)]
    pub quantization_preserving: bool,

    /// SIMD width of the target for this operator, if known.
    #[serde(default)]
    pub simd_size: Option<u32>,
}

fn default_true() -> bool {
    true
}

impl OpQuantizationConfig {
    /// Creates a configuration without attribute-specific entries.
    pub fn new(activation_method: impl Into<MethodName>, activation_n_bits: u32) -> Self {
        Self {
            default_weight_attr_config: AttributeQuantizationConfig::default(),
            attr_weights_configs_mapping: BTreeMap::new(),
            activation_quantization_method: activation_method.into(),
            activation_n_bits,
            enable_activation_quantization: true,
            quantization_preserving: false,
            simd_size: None,
        }
    }

    /// Adds (or replaces) the configuration of a weight attribute.
    pub fn with_attr_config(mut self, attr: &str, config: AttributeQuantizationConfig) -> Self {
        self.attr_weights_configs_mapping.insert(attr.to_string(), config);
        self
    }

    /// Sets the fallback attribute configuration.
    pub fn with_default_weight_attr_config(mut self, config: AttributeQuantizationConfig) -> Self {
        self.default_weight_attr_config = config;
        self
    }

    /// Returns the configuration listed for `attr`, if any.
    pub fn attr_config(&self, attr: &str) -> Option<&AttributeQuantizationConfig> {
        self.attr_weights_configs_mapping.get(attr)
    }
}

// =============================================================================
// Configuration Options
// =============================================================================

/// Ordered candidate configurations for an operator type plus the base
/// configuration used when mixed precision is off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawOptions", into = "RawOptions")]
pub struct QuantizationConfigOptions {
    configs: Vec<OpQuantizationConfig>,
    base_index: usize,
}

impl QuantizationConfigOptions {
    /// Creates options, validating the base configuration.
    ///
    /// A single configuration is its own base. With several configurations a
    /// base must be given and must be one of them.
    pub fn new(
        configs: Vec<OpQuantizationConfig>,
        base: Option<&OpQuantizationConfig>,
    ) -> TpcResult<Self> {
        if configs.is_empty() {
            return Err(TpcError::EmptyOptions);
        }
        let base_index = match base {
            Some(base) => configs
                .iter()
                .position(|c| c == base)
                .ok_or(TpcError::BaseNotInList)?,
            None if configs.len() == 1 => 0,
            None => return Err(TpcError::MissingBaseConfig(configs.len())),
        };
        Ok(Self {
            configs,
            base_index,
        })
    }

    /// Options holding a single configuration.
    pub fn single(config: OpQuantizationConfig) -> Self {
        Self {
            configs: vec![config],
            base_index: 0,
        }
    }

    /// All candidate configurations, in platform order.
    pub fn quantization_config_list(&self) -> &[OpQuantizationConfig] {
        &self.configs
    }

    /// Configuration used when mixed precision is disabled.
    pub fn base_config(&self) -> &OpQuantizationConfig {
        &self.configs[self.base_index]
    }

    /// Number of candidate configurations.
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    /// Always false; options are never empty.
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Returns a copy with `edit` applied to every configuration.
    pub fn clone_and_edit(&self, edit: impl Fn(&mut OpQuantizationConfig)) -> Self {
        let mut edited = self.clone();
        edited.configs.iter_mut().for_each(edit);
        edited
    }

    /// Returns a copy with `edit` applied to the named attribute configuration
    /// of every option, or to every listed attribute when `attrs` is `None`.
    pub fn clone_and_edit_weight_attribute(
        &self,
        attrs: Option<&[&str]>,
        edit: impl Fn(&mut AttributeQuantizationConfig),
    ) -> Self {
        self.clone_and_edit(|config| {
            for (name, attr_config) in config.attr_weights_configs_mapping.iter_mut() {
                if attrs.map_or(true, |names| names.contains(&name.as_str())) {
                    edit(attr_config);
                }
            }
        })
    }
}

/// On-disk form: the list plus the index of the base configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawOptions {
    configs: Vec<OpQuantizationConfig>,
    #[serde(default)]
    base: Option<usize>,
}

impl TryFrom<RawOptions> for QuantizationConfigOptions {
    type Error = TpcError;

    fn try_from(raw: RawOptions) -> Result<Self, Self::Error> {
        match raw.base {
            Some(index) if index >= raw.configs.len() => Err(TpcError::BaseIndexOutOfRange {
                index,
                len: raw.configs.len(),
            }),
            Some(index) => {
                let base = raw.configs[index].clone();
                Self::new(raw.configs, Some(&base))
            }
            None => Self::new(raw.configs, None),
        }
    }
}

impl From<QuantizationConfigOptions> for RawOptions {
    fn from(options: QuantizationConfigOptions) -> Self {
        RawOptions {
            base: Some(options.base_index),
            configs: options.configs,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn op_config(weights_bits: u32, activation_bits: u32) -> OpQuantizationConfig {
        OpQuantizationConfig::new(QuantizationMethod::PowerOfTwo, activation_bits).with_attr_config(
            "kernel",
            AttributeQuantizationConfig::new(QuantizationMethod::Symmetric, weights_bits, true),
        )
    }

    #[test]
    fn test_method_name_resolution() {
        assert_eq!(MethodName::from(QuantizationMethod::Uniform).resolve(), Ok(QuantizationMethod::Uniform));
        assert!(MethodName::new("KMEANS").resolve().is_err());
        assert_eq!(MethodName::new("custom").to_string(), "custom");
    }

    #[test]
    fn test_single_config_is_base() {
        let options = QuantizationConfigOptions::new(vec![op_config(8, 8)], None).unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(options.base_config(), &op_config(8, 8));
    }

    #[test]
    fn test_base_required_for_multiple() {
        let err = QuantizationConfigOptions::new(vec![op_config(8, 8), op_config(4, 8)], None);
        assert!(matches!(err, Err(TpcError::MissingBaseConfig(2))));
    }

    #[test]
    fn test_base_must_be_listed() {
        let err = QuantizationConfigOptions::new(
            vec![op_config(8, 8), op_config(4, 8)],
            Some(&op_config(2, 8)),
        );
        assert!(matches!(err, Err(TpcError::BaseNotInList)));
        assert!(matches!(QuantizationConfigOptions::new(vec![], None), Err(TpcError::EmptyOptions)));
    }

    #[test]
    fn test_base_selected_by_value() {
        let options = QuantizationConfigOptions::new(
            vec![op_config(4, 8), op_config(8, 8), op_config(2, 8)],
            Some(&op_config(8, 8)),
        )
        .unwrap();
        assert_eq!(options.base_config().attr_config("kernel").unwrap().weights_n_bits, 8);
        assert_eq!(options.quantization_config_list()[0].attr_config("kernel").unwrap().weights_n_bits, 4);
    }

    #[test]
    fn test_clone_and_edit() {
        let options = QuantizationConfigOptions::single(op_config(8, 8));
        let edited = options.clone_and_edit(|c| c.enable_activation_quantization = false);
        assert!(!edited.base_config().enable_activation_quantization);
        assert!(options.base_config().enable_activation_quantization);

        let no_weights = options.clone_and_edit_weight_attribute(Some(&["kernel"]), |a| {
            a.enable_weights_quantization = false
        });
        assert!(!no_weights.base_config().attr_config("kernel").unwrap().enable_weights_quantization);
    }

    #[test]
    fn test_default_attr_config_disabled() {
        let config = AttributeQuantizationConfig::default();
        assert!(!config.enable_weights_quantization);
        assert_eq!(config.weights_n_bits, 8);
    }

    #[test]
    fn test_options_base_index_validation() {
        let raw = RawOptions {
            configs: vec![op_config(8, 8)],
            base: Some(3),
        };
        assert!(matches!(
            QuantizationConfigOptions::try_from(raw),
            Err(TpcError::BaseIndexOutOfRange { index: 3, len: 1 })
        ));
    }
}
