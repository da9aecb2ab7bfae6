//! Target Platform Capabilities
//!
//! Groups operator types into operator sets and attaches the legal
//! quantization options of each set. Models can be built in code or loaded
//! from TOML.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{TpcError, TpcResult};
use crate::op_config::QuantizationConfigOptions;

// =============================================================================
// Operator Sets
// =============================================================================

/// Operator types that share the same quantization options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorsSet {
    /// Set name (e.g. "Conv").
    pub name: String,

    /// Operator types belonging to the set.
    pub op_types: Vec<String>,

    /// Options for the set; the platform default applies when absent.
    #[serde(default)]
    pub qc_options: Option<QuantizationConfigOptions>,
}

impl OperatorsSet {
    /// Creates a set that uses the platform default options.
    pub fn new(name: &str, op_types: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            op_types: op_types.iter().map(|s| s.to_string()).collect(),
            qc_options: None,
        }
    }

    /// Attaches set-specific options.
    pub fn with_options(mut self, options: QuantizationConfigOptions) -> Self {
        self.qc_options = Some(options);
        self
    }

    /// Returns true if the set lists `op_type`.
    pub fn contains(&self, op_type: &str) -> bool {
        self.op_types.iter().any(|t| t == op_type)
    }
}

// =============================================================================
// Target Platform Capabilities
// =============================================================================

/// Quantization capabilities of a deployment target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetPlatformCapabilities {
    /// Platform name.
    pub name: String,

    /// Platform model version.
    #[serde(default)]
    pub version: Option<String>,

    /// Options for operator types not covered by any set.
    pub default_qco: QuantizationConfigOptions,

    /// Operator sets, in declaration order.
    #[serde(default)]
    pub operator_sets: Vec<OperatorsSet>,
}

impl TargetPlatformCapabilities {
    /// Creates a platform with only default options.
    pub fn new(name: &str, default_qco: QuantizationConfigOptions) -> Self {
        Self {
            name: name.to_string(),
            version: None,
            default_qco,
            operator_sets: Vec::new(),
        }
    }

    /// Sets the version string.
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    /// Appends an operator set.
    pub fn with_operator_set(mut self, set: OperatorsSet) -> Self {
        self.operator_sets.push(set);
        self
    }

    /// Returns the set that lists `op_type`, if any.
    pub fn operator_set_for(&self, op_type: &str) -> Option<&OperatorsSet> {
        self.operator_sets.iter().find(|set| set.contains(op_type))
    }

    /// Returns the quantization options for an operator type.
    ///
    /// Falls back to the platform default when no set lists the type or the
    /// set carries no options of its own.
    pub fn get_qco(&self, op_type: &str) -> &QuantizationConfigOptions {
        self.operator_set_for(op_type)
            .and_then(|set| set.qc_options.as_ref())
            .unwrap_or(&self.default_qco)
    }

    /// Checks that every operator type belongs to at most one set.
    pub fn validate(&self) -> TpcResult<()> {
        let mut owners: HashMap<&str, &str> = HashMap::new();
        for set in &self.operator_sets {
            for op_type in &set.op_types {
                if let Some(first) = owners.insert(op_type, &set.name) {
                    return Err(TpcError::DuplicateOpType {
                        op_type: op_type.clone(),
                        first: first.to_string(),
                        second: set.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Parses and validates a platform model from TOML.
    pub fn from_toml_str(content: &str) -> TpcResult<Self> {
        let tpc: TargetPlatformCapabilities = toml::from_str(content)?;
        tpc.validate()?;
        Ok(tpc)
    }

    /// Loads a platform model file.
    pub fn load<P: AsRef<Path>>(path: P) -> TpcResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Serializes the model to TOML.
    pub fn to_toml_string(&self) -> TpcResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Saves the model to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> TpcResult<()> {
        std::fs::write(path.as_ref(), self.to_toml_string()?)?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
