//! Quantization Parameter Fitting
//!
//! Params functions compute the thresholds, ranges or cluster centers a
//! quantizer needs, optionally searching for the clipping value that
//! minimizes the configured error.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use rayon::prelude::*;

use crate::error::{QuantError, QuantResult};
use crate::method::QuantizationErrorMethod;
use crate::quantize::{
    compute_quantization_error, fix_range_to_include_zero, nearest_center, signed_quantize,
    uniform_quantize,
};
use crate::types::{ChannelLayout, QuantizationParams, QuantizerSettings};

/// Number of candidate clipping values evaluated by the linear searches.
const NUM_SEARCH_CANDIDATES: usize = 100;

/// Number of halvings tried by the power-of-two search.
const POT_SEARCH_STEPS: u32 = 8;

/// Lloyd iterations used to place LUT cluster centers.
const KMEANS_ITERATIONS: usize = 20;

// =============================================================================
// Public API
// =============================================================================

/// Fits power-of-two thresholds, one per channel.
///
/// # Arguments
/// * `data` - Flat tensor values
/// * `shape` - Tensor shape
/// * `settings` - Bit-width, channel axis and search settings
///
/// # Returns
/// `Threshold` params
pub fn power_of_two_params(
    data: &[f32],
    shape: &[usize],
    settings: &QuantizerSettings,
) -> QuantResult<QuantizationParams> {
    let groups = channel_groups(data, shape, settings)?;
    let threshold = groups
        .par_iter()
        .map(|values| fit_power_of_two(values, settings))
        .collect();
    Ok(QuantizationParams::Threshold { threshold })
}

/// Fits symmetric thresholds, one per channel.
pub fn symmetric_params(
    data: &[f32],
    shape: &[usize],
    settings: &QuantizerSettings,
) -> QuantResult<QuantizationParams> {
    let groups = channel_groups(data, shape, settings)?;
    let threshold = groups
        .par_iter()
        .map(|values| fit_symmetric(values, settings))
        .collect();
    Ok(QuantizationParams::Threshold { threshold })
}

/// Fits min/max ranges, one per channel.
pub fn uniform_params(
    data: &[f32],
    shape: &[usize],
    settings: &QuantizerSettings,
) -> QuantResult<QuantizationParams> {
    let groups = channel_groups(data, shape, settings)?;
    let (min, max) = groups
        .par_iter()
        .map(|values| fit_uniform(values, settings))
        .unzip();
    Ok(QuantizationParams::Range { min, max })
}

/// Fits symmetric thresholds and a shared set of LUT cluster centers.
///
/// Centers live on the signed `lut_values_bitwidth` integer grid; at most
/// `2^n_bits` of them are produced.
pub fn lut_symmetric_params(
    data: &[f32],
    shape: &[usize],
    settings: &QuantizerSettings,
) -> QuantResult<QuantizationParams> {
    if settings.n_bits > settings.lut_values_bitwidth {
        return Err(QuantError::InvalidParams(format!(
            "{} LUT bits exceed the {}-bit values grid",
            settings.n_bits, settings.lut_values_bitwidth
        )));
    }
    let groups = channel_groups(data, shape, settings)?;
    let threshold: Vec<f32> = groups
        .par_iter()
        .map(|values| fit_symmetric(values, settings))
        .collect();

    let half = 2f32.powi(settings.lut_values_bitwidth as i32 - 1);
    let scaled: Vec<f32> = groups
        .iter()
        .zip(threshold.iter())
        .flat_map(|(values, &t)| {
            let scale = half / t;
            values.iter().map(move |&x| (x * scale).clamp(-half, half - 1.0))
        })
        .collect();

    let max_clusters = (1u64 << settings.n_bits) as usize;
    let cluster_centers = kmeans_1d(&scaled, max_clusters);
    Ok(QuantizationParams::Lut {
        cluster_centers,
        threshold,
    })
}

// =============================================================================
// Per-Channel Fitting
// =============================================================================

fn channel_groups(
    data: &[f32],
    shape: &[usize],
    settings: &QuantizerSettings,
) -> QuantResult<Vec<Vec<f32>>> {
    settings.validate()?;
    if data.is_empty() {
        return Err(QuantError::EmptyTensor);
    }
    let layout = ChannelLayout::new(shape, settings.channel_axis, data.len())?;
    Ok(layout.split(data))
}

fn max_abs(values: &[f32]) -> f32 {
    values.iter().fold(0.0f32, |a, &b| a.max(b.abs()))
}

fn fit_power_of_two(values: &[f32], settings: &QuantizerSettings) -> f32 {
    let max_abs = max_abs(values).max(settings.min_threshold);
    let no_clipping = 2f32.powf(max_abs.log2().ceil());
    if settings.error_method == QuantizationErrorMethod::NoClipping {
        return no_clipping;
    }

    let mut best = no_clipping;
    let mut best_error = threshold_error(values, no_clipping, settings);
    for step in 1..=POT_SEARCH_STEPS {
        let candidate = no_clipping / 2f32.powi(step as i32);
        if candidate < settings.min_threshold {
            break;
        }
        let error = threshold_error(values, candidate, settings);
        if error < best_error {
            best_error = error;
            best = candidate;
        }
    }
    best
}

fn fit_symmetric(values: &[f32], settings: &QuantizerSettings) -> f32 {
    let max_abs = max_abs(values).max(settings.min_threshold);
    if settings.error_method == QuantizationErrorMethod::NoClipping {
        return max_abs;
    }

    let mut best = max_abs;
    let mut best_error = threshold_error(values, max_abs, settings);
    for i in 1..NUM_SEARCH_CANDIDATES {
        let candidate = max_abs * i as f32 / NUM_SEARCH_CANDIDATES as f32;
        if candidate < settings.min_threshold {
            continue;
        }
        let error = threshold_error(values, candidate, settings);
        if error < best_error {
            best_error = error;
            best = candidate;
        }
    }
    best
}

fn fit_uniform(values: &[f32], settings: &QuantizerSettings) -> (f32, f32) {
    let min = values.iter().fold(f32::INFINITY, |a, &b| a.min(b));
    let max = values.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let (min, max) = fix_range_to_include_zero(min, max, settings.n_bits);
    if settings.error_method == QuantizationErrorMethod::NoClipping || max <= min {
        return (min, max);
    }

    let mut best = (min, max);
    let mut best_error = range_error(values, min, max, settings);
    for i in 1..NUM_SEARCH_CANDIDATES {
        let fraction = i as f32 / NUM_SEARCH_CANDIDATES as f32;
        let (lo, hi) = (min * fraction, max * fraction);
        let error = range_error(values, lo, hi, settings);
        if error < best_error {
            best_error = error;
            best = (lo, hi);
        }
    }
    fix_range_to_include_zero(best.0, best.1, settings.n_bits)
}

fn threshold_error(values: &[f32], threshold: f32, settings: &QuantizerSettings) -> f32 {
    let quantized: Vec<f32> = values
        .iter()
        .map(|&x| signed_quantize(x, threshold, settings.n_bits))
        .collect();
    compute_quantization_error(values, &quantized, settings.error_method, settings.l_p_value)
}

fn range_error(values: &[f32], min: f32, max: f32, settings: &QuantizerSettings) -> f32 {
    let quantized: Vec<f32> = values
        .iter()
        .map(|&x| uniform_quantize(x, min, max, settings.n_bits))
        .collect();
    compute_quantization_error(values, &quantized, settings.error_method, settings.l_p_value)
}

// =============================================================================
// Cluster Centers
// =============================================================================

/// One-dimensional k-means returning sorted, rounded, distinct centers.
fn kmeans_1d(values: &[f32], max_clusters: usize) -> Vec<f32> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);
    let mut distinct = sorted.clone();
    distinct.dedup();

    let k = max_clusters.min(distinct.len()).max(1);
    if distinct.len() <= k {
        return round_centers(distinct);
    }

    // Quantile initialization
    let mut centers: Vec<f32> = (0..k)
        .map(|i| sorted[(i * (sorted.len() - 1)) / (k - 1).max(1)])
        .collect();

    for _ in 0..KMEANS_ITERATIONS {
        let mut sums = vec![0.0f64; k];
        let mut counts = vec![0usize; k];
        for &v in values {
            let idx = nearest_index(v, &centers);
            sums[idx] += f64::from(v);
            counts[idx] += 1;
        }
        let mut moved = false;
        for i in 0..k {
            if counts[i] > 0 {
                let mean = (sums[i] / counts[i] as f64) as f32;
                moved |= mean != centers[i];
                centers[i] = mean;
            }
        }
        if !moved {
            break;
        }
    }

    round_centers(centers)
}

fn nearest_index(v: f32, centers: &[f32]) -> usize {
    let nearest = nearest_center(v, centers);
    centers.iter().position(|&c| c == nearest).unwrap_or(0)
}

fn round_centers(mut centers: Vec<f32>) -> Vec<f32> {
    for c in &mut centers {
        *c = c.round();
    }
    centers.sort_by(f32::total_cmp);
    centers.dedup();
    centers
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantize::{lut_quantize, uniform_quantizer};

    fn lut_error(values: &[f32], centers: &[f32], threshold: f32, settings: &QuantizerSettings) -> f32 {
        let quantized: Vec<f32> = values
            .iter()
            .map(|&x| lut_quantize(x, centers, threshold, settings.lut_values_bitwidth))
            .collect();
        compute_quantization_error(values, &quantized, settings.error_method, settings.l_p_value)
    }

    fn thresholds(params: QuantizationParams) -> Vec<f32> {
        match params {
            QuantizationParams::Threshold { threshold } => threshold,
            other => panic!("expected threshold params, got {other:?}"),
        }
    }

    #[test]
    fn test_power_of_two_no_clipping() {
        let settings = QuantizerSettings::new(8).with_error_method(QuantizationErrorMethod::NoClipping);
        let params = power_of_two_params(&[-3.0, 1.0, 2.5], &[3], &settings).unwrap();
        assert_eq!(thresholds(params), vec![4.0]);
    }

    #[test]
    fn test_power_of_two_search_stays_pot() {
        let mut data: Vec<f32> = (0..200).map(|i| (i as f32 / 100.0) - 1.0).collect();
        data.push(60.0);
        let params = power_of_two_params(&data, &[201], &QuantizerSettings::new(4)).unwrap();
        let t = thresholds(params)[0];
        assert!(crate::quantize::is_power_of_two(t));
        assert!(t <= 64.0);
    }

    #[test]
    fn test_symmetric_no_clipping_is_max_abs() {
        let settings = QuantizerSettings::new(8).with_error_method(QuantizationErrorMethod::NoClipping);
        let params = symmetric_params(&[-3.0, 1.0, 2.5], &[3], &settings).unwrap();
        assert_eq!(thresholds(params), vec![3.0]);
    }

    #[test]
    fn test_symmetric_mse_clips_outlier() {
        let mut data: Vec<f32> = (0..1000).map(|i| ((i % 200) as f32 / 100.0) - 1.0).collect();
        data.push(10.0);
        let params = symmetric_params(&data, &[1001], &QuantizerSettings::new(4)).unwrap();
        assert!(thresholds(params)[0] < 10.0);
    }

    #[test]
    fn test_per_channel_params() {
        let settings = QuantizerSettings::new(8)
            .with_error_method(QuantizationErrorMethod::NoClipping)
            .per_channel(1);
        // [2, 2]: columns are channels
        let params = symmetric_params(&[1.0, -4.0, 0.5, 2.0], &[2, 2], &settings).unwrap();
        assert_eq!(thresholds(params), vec![1.0, 4.0]);
    }

    #[test]
    fn test_min_threshold_floor() {
        let settings = QuantizerSettings::new(8).with_error_method(QuantizationErrorMethod::NoClipping);
        let params = symmetric_params(&[0.0, 0.0], &[2], &settings).unwrap();
        assert_eq!(thresholds(params), vec![settings.min_threshold]);
    }

    #[test]
    fn test_uniform_no_clipping() {
        let settings = QuantizerSettings::new(8).with_error_method(QuantizationErrorMethod::NoClipping);
        let params = uniform_params(&[1.0, 2.0, 3.0], &[3], &settings).unwrap();
        assert_eq!(
            params,
            QuantizationParams::Range {
                min: vec![0.0],
                max: vec![3.0]
            }
        );
    }

    #[test]
    fn test_uniform_params_keep_zero_exact() {
        let data = [-1.0, -0.2, 0.0, 0.7, 1.3];
        let settings = QuantizerSettings::new(8);
        let params = uniform_params(&data, &[5], &settings).unwrap();
        let out = uniform_quantizer(&[0.0], &[1], &params, &settings).unwrap();
        assert_eq!(out, vec![0.0]);
    }

    #[test]
    fn test_lut_params() {
        let data: Vec<f32> = (0..256).map(|i| (i as f32 / 128.0) - 1.0).collect();
        let settings = QuantizerSettings::new(2);
        let params = lut_symmetric_params(&data, &[256], &settings).unwrap();

        let QuantizationParams::Lut { cluster_centers, threshold } = params else {
            panic!("expected LUT params");
        };
        assert!(!cluster_centers.is_empty());
        assert!(cluster_centers.len() <= 4);
        assert!(cluster_centers.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(threshold.len(), 1);
        assert!(lut_error(&data, &cluster_centers, threshold[0], &settings).is_finite());
    }

    #[test]
    fn test_lut_bits_exceed_grid() {
        let mut settings = QuantizerSettings::new(8);
        settings.lut_values_bitwidth = 4;
        assert!(matches!(
            lut_symmetric_params(&[1.0], &[1], &settings),
            Err(QuantError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_empty_tensor() {
        assert_eq!(
            symmetric_params(&[], &[0], &QuantizerSettings::new(8)),
            Err(QuantError::EmptyTensor)
        );
    }
}
