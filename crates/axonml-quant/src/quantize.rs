//! Quantizer Kernels
//!
//! Fake-quantization functions: each maps a float tensor onto the integer
//! grid described by its parameters and back to floats.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use rayon::prelude::*;

use crate::error::{QuantError, QuantResult};
use crate::method::QuantizationErrorMethod;
use crate::types::{ChannelLayout, QuantizationParams, QuantizerSettings};

// =============================================================================
// Public API
// =============================================================================

/// Quantizes with a power-of-two threshold.
///
/// # Arguments
/// * `data` - Flat tensor values
/// * `shape` - Tensor shape
/// * `params` - `Threshold` params whose thresholds are powers of two
/// * `settings` - Bit-width and channel axis
pub fn power_of_two_quantizer(
    data: &[f32],
    shape: &[usize],
    params: &QuantizationParams,
    settings: &QuantizerSettings,
) -> QuantResult<Vec<f32>> {
    if let QuantizationParams::Threshold { threshold } = params {
        if let Some(t) = threshold.iter().find(|t| !is_power_of_two(**t)) {
            return Err(QuantError::InvalidParams(format!(
                "threshold {t} is not a power of two"
            )));
        }
    }
    threshold_quantizer(data, shape, params, settings)
}

/// Quantizes with an arbitrary symmetric threshold.
pub fn symmetric_quantizer(
    data: &[f32],
    shape: &[usize],
    params: &QuantizationParams,
    settings: &QuantizerSettings,
) -> QuantResult<Vec<f32>> {
    threshold_quantizer(data, shape, params, settings)
}

/// Quantizes onto an asymmetric min/max grid.
pub fn uniform_quantizer(
    data: &[f32],
    shape: &[usize],
    params: &QuantizationParams,
    settings: &QuantizerSettings,
) -> QuantResult<Vec<f32>> {
    settings.validate()?;
    let QuantizationParams::Range { min, max } = params else {
        return Err(QuantError::InvalidParams(
            "uniform quantizer expects range params".to_string(),
        ));
    };
    let layout = ChannelLayout::new(shape, settings.channel_axis, data.len())?;
    check_channels(min.len(), &layout)?;
    check_channels(max.len(), &layout)?;

    let n_bits = settings.n_bits;
    Ok(data
        .par_iter()
        .enumerate()
        .map(|(i, &x)| {
            let c = layout.channel_of(i);
            uniform_quantize(x, pick(min, c), pick(max, c), n_bits)
        })
        .collect())
}

/// Quantizes by snapping to the nearest LUT cluster center.
pub fn lut_symmetric_quantizer(
    data: &[f32],
    shape: &[usize],
    params: &QuantizationParams,
    settings: &QuantizerSettings,
) -> QuantResult<Vec<f32>> {
    settings.validate()?;
    let QuantizationParams::Lut {
        cluster_centers,
        threshold,
    } = params
    else {
        return Err(QuantError::InvalidParams(
            "LUT quantizer expects cluster centers".to_string(),
        ));
    };
    if cluster_centers.is_empty() {
        return Err(QuantError::InvalidParams("no cluster centers".to_string()));
    }
    let layout = ChannelLayout::new(shape, settings.channel_axis, data.len())?;
    check_channels(threshold.len(), &layout)?;

    let lut_bits = settings.lut_values_bitwidth;
    Ok(data
        .par_iter()
        .enumerate()
        .map(|(i, &x)| {
            lut_quantize(x, cluster_centers, pick(threshold, layout.channel_of(i)), lut_bits)
        })
        .collect())
}

// =============================================================================
// Element Kernels
// =============================================================================

fn threshold_quantizer(
    data: &[f32],
    shape: &[usize],
    params: &QuantizationParams,
    settings: &QuantizerSettings,
) -> QuantResult<Vec<f32>> {
    settings.validate()?;
    let QuantizationParams::Threshold { threshold } = params else {
        return Err(QuantError::InvalidParams(
            "threshold quantizer expects threshold params".to_string(),
        ));
    };
    let layout = ChannelLayout::new(shape, settings.channel_axis, data.len())?;
    check_channels(threshold.len(), &layout)?;

    let n_bits = settings.n_bits;
    Ok(data
        .par_iter()
        .enumerate()
        .map(|(i, &x)| signed_quantize(x, pick(threshold, layout.channel_of(i)), n_bits))
        .collect())
}

/// Signed symmetric quantize-dequantize of one value.
pub(crate) fn signed_quantize(x: f32, threshold: f32, n_bits: u32) -> f32 {
    if threshold <= 0.0 {
        return 0.0;
    }
    let levels = 2f32.powi(n_bits as i32 - 1);
    let delta = threshold / levels;
    (x / delta).round().clamp(-levels, levels - 1.0) * delta
}

/// Asymmetric quantize-dequantize of one value.
pub(crate) fn uniform_quantize(x: f32, min: f32, max: f32, n_bits: u32) -> f32 {
    let (min, max) = fix_range_to_include_zero(min, max, n_bits);
    if max <= min {
        return min;
    }
    let levels = 2f32.powi(n_bits as i32) - 1.0;
    let delta = (max - min) / levels;
    let zero_point = (-min / delta).round();
    (((x / delta).round() + zero_point).clamp(0.0, levels) - zero_point) * delta
}

pub(crate) fn lut_quantize(x: f32, centers: &[f32], threshold: f32, lut_bits: u32) -> f32 {
    if threshold <= 0.0 {
        return 0.0;
    }
    let half = 2f32.powi(lut_bits as i32 - 1);
    let scale = half / threshold;
    let v = (x * scale).clamp(-half, half - 1.0);
    nearest_center(v, centers) / scale
}

/// Returns the center closest to `v`.
pub(crate) fn nearest_center(v: f32, centers: &[f32]) -> f32 {
    centers
        .iter()
        .copied()
        .min_by(|a, b| (a - v).abs().total_cmp(&(b - v).abs()))
        .unwrap_or(0.0)
}

/// Adjusts a range so that zero lands exactly on the `n_bits` grid.
///
/// One-sided ranges are extended to zero. A range straddling zero keeps its
/// width and shifts so that `min` becomes a whole multiple of the step.
pub fn fix_range_to_include_zero(min: f32, max: f32, n_bits: u32) -> (f32, f32) {
    if min > 0.0 {
        return (0.0, max);
    }
    if max < 0.0 {
        return (min, 0.0);
    }
    if max <= min {
        return (min, max);
    }
    let scale = (max - min) / (2f32.powi(n_bits as i32) - 1.0);
    let min_adj = scale * (min / scale).round();
    (min_adj, max - min + min_adj)
}

/// Returns true for positive powers of two (including fractions like 0.25).
pub fn is_power_of_two(x: f32) -> bool {
    x > 0.0 && x.log2().fract() == 0.0
}

fn pick(values: &[f32], channel: usize) -> f32 {
    if values.len() == 1 {
        values[0]
    } else {
        values[channel]
    }
}

fn check_channels(len: usize, layout: &ChannelLayout) -> QuantResult<()> {
    if len == 1 || len == layout.channels() {
        Ok(())
    } else {
        Err(QuantError::InvalidParams(format!(
            "{len} parameter values for {} channels",
            layout.channels()
        )))
    }
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Computes the error between an original tensor and its quantized version.
pub fn compute_quantization_error(
    original: &[f32],
    quantized: &[f32],
    error_method: QuantizationErrorMethod,
    l_p_value: f32,
) -> f32 {
    if original.len() != quantized.len() || original.is_empty() {
        return f32::INFINITY;
    }

    let n = original.len() as f32;
    let diffs = original.iter().zip(quantized.iter()).map(|(a, b)| (a - b).abs());
    match error_method {
        QuantizationErrorMethod::Mse | QuantizationErrorMethod::NoClipping => {
            diffs.map(|d| d * d).sum::<f32>() / n
        }
        QuantizationErrorMethod::Mae => diffs.sum::<f32>() / n,
        QuantizationErrorMethod::Lp => diffs.map(|d| d.powf(l_p_value)).sum::<f32>() / n,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold(t: Vec<f32>) -> QuantizationParams {
        QuantizationParams::Threshold { threshold: t }
    }

    #[test]
    fn test_symmetric_quantizer_grid() {
        // 8 bits, threshold 1.0: delta = 1/128
        let data = vec![0.5, -1.0, 2.0, 0.001];
        let out = symmetric_quantizer(&data, &[4], &threshold(vec![1.0]), &QuantizerSettings::new(8))
            .unwrap();

        assert_eq!(out[0], 0.5);
        assert_eq!(out[1], -1.0);
        // clipped to the largest positive level
        assert!((out[2] - 127.0 / 128.0).abs() < 1e-6);
        assert_eq!(out[3], 0.0);
    }

    #[test]
    fn test_power_of_two_rejects_non_pot_threshold() {
        let settings = QuantizerSettings::new(8);
        let err = power_of_two_quantizer(&[0.1, 0.2], &[2], &threshold(vec![0.3]), &settings);
        assert!(matches!(err, Err(QuantError::InvalidParams(_))));

        let ok = power_of_two_quantizer(&[0.1, 0.2], &[2], &threshold(vec![0.25]), &settings);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_per_channel_thresholds() {
        // shape [2, 2], channels on axis 0
        let data = vec![0.9, -0.9, 3.5, -3.5];
        let settings = QuantizerSettings::new(2).per_channel(0);
        let out = symmetric_quantizer(&data, &[2, 2], &threshold(vec![1.0, 4.0]), &settings).unwrap();

        // 2 bits: levels {-2, -1, 0, 1} * delta, delta = t / 2
        assert_eq!(out, vec![0.5, -1.0, 2.0, -4.0]);
    }

    #[test]
    fn test_channel_count_mismatch() {
        let settings = QuantizerSettings::new(8).per_channel(0);
        let err = symmetric_quantizer(&[1.0; 6], &[3, 2], &threshold(vec![1.0, 1.0]), &settings);
        assert!(matches!(err, Err(QuantError::InvalidParams(_))));
    }

    #[test]
    fn test_uniform_quantizer() {
        let params = QuantizationParams::Range {
            min: vec![0.0],
            max: vec![3.0],
        };
        // 2 bits over [0, 3]: delta 1.0
        let out = uniform_quantizer(&[0.4, 1.6, 5.0, -1.0], &[4], &params, &QuantizerSettings::new(2))
            .unwrap();
        assert_eq!(out, vec![0.0, 2.0, 3.0, 0.0]);
    }

    #[test]
    fn test_uniform_range_includes_zero() {
        assert_eq!(fix_range_to_include_zero(1.0, 3.0, 8), (0.0, 3.0));
        assert_eq!(fix_range_to_include_zero(-3.0, -1.0, 8), (-3.0, 0.0));
        // Already on the 2-bit grid: step 1.0
        assert_eq!(fix_range_to_include_zero(-1.0, 2.0, 2), (-1.0, 2.0));
    }

    #[test]
    fn test_uniform_range_snaps_to_grid() {
        let (min, max) = fix_range_to_include_zero(-1.0, 1.3, 8);
        let scale = 2.3 / 255.0;
        let steps = min / scale;
        assert!((steps - steps.round()).abs() < 1e-3);
        assert!((max - min - 2.3).abs() < 1e-5);
        assert!(min < 0.0 && max > 0.0);
    }

    #[test]
    fn test_uniform_quantizer_zero_exact() {
        let params = QuantizationParams::Range {
            min: vec![-1.0],
            max: vec![1.3],
        };
        let out = uniform_quantizer(&[0.0, -1.0, 1.3], &[3], &params, &QuantizerSettings::new(8)).unwrap();
        assert_eq!(out[0], 0.0);
        assert!((out[1] + 1.0).abs() < 0.01);
        assert!((out[2] - 1.3).abs() < 0.01);
    }

    #[test]
    fn test_lut_quantizer_snaps_to_centers() {
        let params = QuantizationParams::Lut {
            cluster_centers: vec![-128.0, 0.0, 64.0],
            threshold: vec![1.0],
        };
        let out = lut_symmetric_quantizer(&[-0.9, 0.1, 0.6], &[3], &params, &QuantizerSettings::new(2))
            .unwrap();
        assert_eq!(out, vec![-1.0, 0.0, 0.5]);
    }

    #[test]
    fn test_wrong_params_kind() {
        let params = QuantizationParams::Range {
            min: vec![0.0],
            max: vec![1.0],
        };
        let err = symmetric_quantizer(&[0.0], &[1], &params, &QuantizerSettings::new(8));
        assert!(matches!(err, Err(QuantError::InvalidParams(_))));
    }

    #[test]
    fn test_quantization_error() {
        let original = vec![1.0, 2.0, 3.0, 4.0];
        let quantized = vec![1.1, 2.0, 2.9, 4.1];

        let mse = compute_quantization_error(&original, &quantized, QuantizationErrorMethod::Mse, 2.0);
        let mae = compute_quantization_error(&original, &quantized, QuantizationErrorMethod::Mae, 2.0);
        assert!(mse > 0.0 && mse < 0.01);
        assert!((mae - 0.075).abs() < 1e-4);
        assert_eq!(
            compute_quantization_error(&original, &[], QuantizationErrorMethod::Mse, 2.0),
            f32::INFINITY
        );
    }

    #[test]
    fn test_is_power_of_two() {
        assert!(is_power_of_two(1.0));
        assert!(is_power_of_two(0.125));
        assert!(is_power_of_two(64.0));
        assert!(!is_power_of_two(3.0));
        assert!(!is_power_of_two(0.0));
    }
}
