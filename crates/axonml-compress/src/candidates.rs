//! Candidate Synthesis
//!
//! Builds the candidate configurations of one node from the platform options
//! that apply to it.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use axonml_graph::FrameworkInfo;
use axonml_tpc::{OpQuantizationConfig, QuantizationConfigOptions};

use crate::config::QuantizationConfig;
use crate::error::{CompressError, CompressResult};
use crate::node_config::CandidateNodeQuantizationConfig;
use crate::selection::{select_activation_functions, select_weights_functions};

/// Builds one candidate from one operator configuration.
///
/// The kernel is quantized with the config listed for `kernel_attr`; when the
/// operator config does not list it, or the node has no kernel, the default
/// weight attribute config applies.
pub fn create_node_single_candidate_qc(
    qc: QuantizationConfig,
    fw_info: &FrameworkInfo,
    weight_channel_axis: Option<usize>,
    op_cfg: &OpQuantizationConfig,
    kernel_attr: Option<&str>,
) -> CompressResult<CandidateNodeQuantizationConfig> {
    let weights_cfg = kernel_attr
        .and_then(|attr| op_cfg.attr_config(attr))
        .unwrap_or(&op_cfg.default_weight_attr_config);

    let weights_functions = select_weights_functions(&weights_cfg.weights_quantization_method, kernel_attr)?;
    let activation_functions = select_activation_functions(&op_cfg.activation_quantization_method, fw_info)?;

    Ok(CandidateNodeQuantizationConfig::new(
        qc,
        op_cfg,
        weights_cfg,
        weights_functions,
        activation_functions,
        weight_channel_axis,
    ))
}

/// Builds every candidate of a node.
///
/// Without mixed precision the single candidate comes from the base config.
/// With it, each listed config yields a candidate with its own copy of `qc`,
/// ordered by descending `(weights_n_bits, activation_n_bits)`; equal keys
/// keep their listed order.
pub fn create_node_candidates_qc(
    qc: &QuantizationConfig,
    fw_info: &FrameworkInfo,
    weight_channel_axis: Option<usize>,
    options: &QuantizationConfigOptions,
    op_type: &str,
    mixed_precision_enable: bool,
) -> CompressResult<Vec<CandidateNodeQuantizationConfig>> {
    let kernel_attrs = fw_info.kernel_op_attributes(op_type);
    let [kernel_attr] = kernel_attrs.as_slice() else {
        return Err(CompressError::KernelAttributeResolution {
            op_type: op_type.to_string(),
            found: kernel_attrs.len(),
        });
    };
    let kernel_attr = *kernel_attr;

    if !mixed_precision_enable {
        let candidate =
            create_node_single_candidate_qc(qc.clone(), fw_info, weight_channel_axis, options.base_config(), kernel_attr)?;
        return Ok(vec![candidate]);
    }

    let mut candidates = options
        .quantization_config_list()
        .iter()
        .map(|op_cfg| create_node_single_candidate_qc(qc.clone(), fw_info, weight_channel_axis, op_cfg, kernel_attr))
        .collect::<CompressResult<Vec<_>>>()?;
    candidates.sort_by(|a, b| b.bit_widths().cmp(&a.bit_widths()));
    Ok(candidates)
}

// =============================================================================
// Tests
// =============================================================================
