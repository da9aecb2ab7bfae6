//! Quantization Types
//!
//! Fitted parameters, quantizer settings, function signatures and the
//! channel layout helper shared by all kernels.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::error::{QuantError, QuantResult};
use crate::method::QuantizationErrorMethod;

// =============================================================================
// Function Signatures
// =============================================================================

/// Fake-quantizes `data` (of shape `shape`) with fitted parameters.
///
/// The output has the same length as the input and holds the dequantized
/// values of the integer grid.
pub type QuantizerFn =
    fn(&[f32], &[usize], &QuantizationParams, &QuantizerSettings) -> QuantResult<Vec<f32>>;

/// Fits the parameters a quantizer needs from tensor statistics.
pub type ParamsFn = fn(&[f32], &[usize], &QuantizerSettings) -> QuantResult<QuantizationParams>;

// =============================================================================
// Quantization Parameters
// =============================================================================

/// Parameters produced by a params function and consumed by a quantizer.
///
/// Each vector has one entry per channel, or a single entry for per-tensor
/// quantization.
#[derive(Debug, Clone, PartialEq)]
pub enum QuantizationParams {
    /// Symmetric threshold (power-of-two and symmetric quantizers).
    Threshold {
        /// Clipping threshold per channel.
        threshold: Vec<f32>,
    },
    /// Asymmetric range (uniform quantizer).
    Range {
        /// Lower bound per channel.
        min: Vec<f32>,
        /// Upper bound per channel.
        max: Vec<f32>,
    },
    /// Cluster centers on the LUT integer grid plus a symmetric threshold.
    Lut {
        /// Sorted cluster centers, shared by all channels.
        cluster_centers: Vec<f32>,
        /// Clipping threshold per channel.
        threshold: Vec<f32>,
    },
}

impl QuantizationParams {
    /// Number of channels the parameters describe.
    pub fn num_channels(&self) -> usize {
        match self {
            QuantizationParams::Threshold { threshold } => threshold.len(),
            QuantizationParams::Range { min, .. } => min.len(),
            QuantizationParams::Lut { threshold, .. } => threshold.len(),
        }
    }

    /// Returns true when one value set covers the whole tensor.
    pub fn is_per_tensor(&self) -> bool {
        self.num_channels() == 1
    }
}

// =============================================================================
// Quantizer Settings
// =============================================================================

/// Settings shared by quantizers and params functions.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizerSettings {
    /// Number of bits of the integer grid.
    pub n_bits: u32,
    /// Channel axis for per-channel quantization, `None` for per-tensor.
    pub channel_axis: Option<usize>,
    /// Error measure used by the threshold search.
    pub error_method: QuantizationErrorMethod,
    /// Norm used by [`QuantizationErrorMethod::Lp`].
    pub l_p_value: f32,
    /// Smallest threshold a params function may return.
    pub min_threshold: f32,
    /// Bit-width of the LUT grid the cluster centers live on.
    pub lut_values_bitwidth: u32,
}

impl QuantizerSettings {
    /// Creates per-tensor settings with MSE search.
    pub fn new(n_bits: u32) -> Self {
        Self {
            n_bits,
            channel_axis: None,
            error_method: QuantizationErrorMethod::Mse,
            l_p_value: 2.0,
            min_threshold: crate::MIN_THRESHOLD,
            lut_values_bitwidth: crate::LUT_VALUES_BITWIDTH,
        }
    }

    /// Sets the per-channel axis.
    pub fn per_channel(mut self, axis: usize) -> Self {
        self.channel_axis = Some(axis);
        self
    }

    /// Sets the error method.
    pub fn with_error_method(mut self, error_method: QuantizationErrorMethod) -> Self {
        self.error_method = error_method;
        self
    }

    /// Checks the bit-widths.
    pub fn validate(&self) -> QuantResult<()> {
        if self.n_bits == 0 || self.n_bits > 32 {
            return Err(QuantError::InvalidBitWidth(self.n_bits));
        }
        if self.lut_values_bitwidth == 0 || self.lut_values_bitwidth > 32 {
            return Err(QuantError::InvalidBitWidth(self.lut_values_bitwidth));
        }
        Ok(())
    }
}

// =============================================================================
// Channel Layout
// =============================================================================

/// Maps flat element indices to channel indices along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelLayout {
    channels: usize,
    stride: usize,
}

impl ChannelLayout {
    /// Builds the layout for `shape`, validating `data_len` against it.
    pub fn new(shape: &[usize], axis: Option<usize>, data_len: usize) -> QuantResult<Self> {
        let expected: usize = shape.iter().product();
        if expected != data_len {
            return Err(QuantError::DataLengthMismatch {
                expected,
                actual: data_len,
            });
        }

        match axis {
            None => Ok(Self {
                channels: 1,
                stride: data_len.max(1),
            }),
            Some(axis) if axis < shape.len() => Ok(Self {
                channels: shape[axis],
                stride: shape[axis + 1..].iter().product(),
            }),
            Some(axis) => Err(QuantError::InvalidChannelAxis {
                axis,
                shape: shape.to_vec(),
            }),
        }
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Channel of the element at flat index `i`.
    pub fn channel_of(&self, i: usize) -> usize {
        if self.channels <= 1 {
            0
        } else {
            (i / self.stride) % self.channels
        }
    }

    /// Gathers the elements of every channel.
    pub fn split(&self, data: &[f32]) -> Vec<Vec<f32>> {
        let mut groups = vec![Vec::with_capacity(data.len() / self.channels.max(1)); self.channels];
        for (i, &value) in data.iter().enumerate() {
            groups[self.channel_of(i)].push(value);
        }
        groups
    }
}

// =============================================================================
// Tests
// =============================================================================
