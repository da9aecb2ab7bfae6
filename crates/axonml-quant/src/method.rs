//! Quantization Methods
//!
//! Closed sets of quantization methods, threshold-search error methods and
//! quantization targets.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QuantError;

// =============================================================================
// Quantization Method
// =============================================================================

/// How a tensor is mapped onto its integer grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuantizationMethod {
    /// Symmetric grid whose threshold is a power of two.
    PowerOfTwo,
    /// Symmetric grid with an arbitrary threshold.
    Symmetric,
    /// Asymmetric grid spanning a min/max range.
    Uniform,
    /// Look-up table of cluster centers inside a symmetric threshold.
    #[serde(rename = "LUT_SYM_QUANTIZER")]
    LutSymmetric,
}

impl QuantizationMethod {
    /// Every method, in declaration order.
    pub const ALL: [QuantizationMethod; 4] = [
        QuantizationMethod::PowerOfTwo,
        QuantizationMethod::Symmetric,
        QuantizationMethod::Uniform,
        QuantizationMethod::LutSymmetric,
    ];

    /// Canonical name, as written in platform models.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuantizationMethod::PowerOfTwo => "POWER_OF_TWO",
            QuantizationMethod::Symmetric => "SYMMETRIC",
            QuantizationMethod::Uniform => "UNIFORM",
            QuantizationMethod::LutSymmetric => "LUT_SYM_QUANTIZER",
        }
    }
}

impl FromStr for QuantizationMethod {
    type Err = QuantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "POWER_OF_TWO" | "POT" => Ok(QuantizationMethod::PowerOfTwo),
            "SYMMETRIC" | "SYM" => Ok(QuantizationMethod::Symmetric),
            "UNIFORM" => Ok(QuantizationMethod::Uniform),
            "LUT_SYM_QUANTIZER" | "LUT_SYMMETRIC" | "LUT" => Ok(QuantizationMethod::LutSymmetric),
            _ => Err(QuantError::UnknownMethod(s.to_string())),
        }
    }
}

impl fmt::Display for QuantizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Error Method
// =============================================================================

/// Error measure minimized when searching for a clipping threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantizationErrorMethod {
    /// Use the observed range as is.
    NoClipping,
    /// Mean squared error.
    #[default]
    Mse,
    /// Mean absolute error.
    Mae,
    /// Mean of |error|^p, with p taken from the policy.
    Lp,
}

impl FromStr for QuantizationErrorMethod {
    type Err = QuantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "no_clipping" | "noclipping" => Ok(QuantizationErrorMethod::NoClipping),
            "mse" => Ok(QuantizationErrorMethod::Mse),
            "mae" => Ok(QuantizationErrorMethod::Mae),
            "lp" => Ok(QuantizationErrorMethod::Lp),
            _ => Err(QuantError::UnknownErrorMethod(s.to_string())),
        }
    }
}

impl fmt::Display for QuantizationErrorMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuantizationErrorMethod::NoClipping => write!(f, "no_clipping"),
            QuantizationErrorMethod::Mse => write!(f, "mse"),
            QuantizationErrorMethod::Mae => write!(f, "mae"),
            QuantizationErrorMethod::Lp => write!(f, "lp"),
        }
    }
}

// =============================================================================
// Quantization Target
// =============================================================================

/// What a quantizer is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantizationTarget {
    /// Layer weights (kernels).
    Weights,
    /// Layer outputs.
    Activation,
}

impl fmt::Display for QuantizationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuantizationTarget::Weights => write!(f, "weights"),
            QuantizationTarget::Activation => write!(f, "activation"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_from_str() {
        assert_eq!("POWER_OF_TWO".parse::<QuantizationMethod>(), Ok(QuantizationMethod::PowerOfTwo));
        assert_eq!("symmetric".parse::<QuantizationMethod>(), Ok(QuantizationMethod::Symmetric));
        assert_eq!("Uniform".parse::<QuantizationMethod>(), Ok(QuantizationMethod::Uniform));
        assert_eq!("lut".parse::<QuantizationMethod>(), Ok(QuantizationMethod::LutSymmetric));
        assert!("KMEANS".parse::<QuantizationMethod>().is_err());
    }

    #[test]
    fn test_method_name_round_trip() {
        for method in QuantizationMethod::ALL {
            assert_eq!(method.to_string().parse::<QuantizationMethod>(), Ok(method));
        }
    }

    #[test]
    fn test_error_method_default() {
        assert_eq!(QuantizationErrorMethod::default(), QuantizationErrorMethod::Mse);
        assert_eq!("no_clipping".parse::<QuantizationErrorMethod>(), Ok(QuantizationErrorMethod::NoClipping));
        assert!("kl".parse::<QuantizationErrorMethod>().is_err());
    }

    #[test]
    fn test_target_display() {
        assert_eq!(QuantizationTarget::Weights.to_string(), "weights");
        assert_eq!(QuantizationTarget::Activation.to_string(), "activation");
    }
}
