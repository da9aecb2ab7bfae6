//! Weights Parameter Computation
//!
//! Fits the bound weights params function of every enabled candidate on the
//! node's kernel tensor.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use tracing::debug;

use axonml_graph::{FrameworkInfo, Graph, GraphError, Node, WeightTensor};

use crate::configure::GraphQuantization;
use crate::error::{CompressError, CompressResult};

/// Computes weights parameters for every candidate with weights
/// quantization enabled. Returns the number of fitted candidates.
pub fn compute_weights_params(
    graph: &Graph,
    fw_info: &FrameworkInfo,
    quantization: &mut GraphQuantization,
) -> CompressResult<usize> {
    let mut fitted = 0;
    for (id, candidates) in quantization.iter_mut() {
        let node = graph.get(id).ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        let mut enabled = candidates
            .iter_mut()
            .map(|c| &mut c.weights_quantization_cfg)
            .filter(|w| w.enable_weights_quantization)
            .peekable();
        if enabled.peek().is_none() {
            continue;
        }

        let kernel = kernel_tensor(node, fw_info)?;
        let mut node_fitted = 0;
        for weights_cfg in enabled {
            weights_cfg.fit_params(kernel.data(), kernel.shape())?;
            node_fitted += 1;
        }
        debug!(node = %node.name, candidates = node_fitted, "Computed weights quantization params");
        fitted += node_fitted;
    }
    Ok(fitted)
}

fn kernel_tensor<'a>(node: &'a Node, fw_info: &FrameworkInfo) -> CompressResult<&'a WeightTensor> {
    let attrs = fw_info.kernel_op_attributes(node.op_type());
    attrs
        .iter()
        .flatten()
        .find_map(|attr| node.weight(attr))
        .ok_or_else(|| CompressError::MissingWeight {
            node: node.name.clone(),
            attribute: attrs.iter().flatten().next().unwrap_or(&"<none>").to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuantizationConfig;
    use crate::configure::set_quantization_configuration_to_graph;
    use axonml_tpc::{default_tpc, KERNEL_ATTR};

    #[test]
    fn test_compute_weights_params() {
        let mut graph = Graph::new();
        let input = graph.add_node(Node::new("input", "Input")).unwrap();
        let kernel: Vec<f32> = (0..12).map(|i| (i as f32 - 6.0) / 6.0).collect();
        let conv = graph
            .add_node(
                Node::new("conv", "Conv2d")
                    .with_inputs(&[input])
                    .with_weight(KERNEL_ATTR, WeightTensor::new(&[3, 4, 1, 1], kernel).unwrap()),
            )
            .unwrap();
        let fw_info = FrameworkInfo::standard();
        let tpc = default_tpc().unwrap();
        let mut quantization =
            set_quantization_configuration_to_graph(&graph, &fw_info, &tpc, &QuantizationConfig::default(), true)
                .unwrap();

        let fitted = compute_weights_params(&graph, &fw_info, &mut quantization).unwrap();
        assert_eq!(fitted, 3);

        for candidate in quantization.candidates(conv).unwrap() {
            let params = candidate.weights_quantization_cfg.weights_quantization_params.as_ref().unwrap();
            // Per output channel
            assert_eq!(params.num_channels(), 3);
        }
        let input_candidates = quantization.candidates(input).unwrap();
        assert!(input_candidates.iter().all(|c| c.weights_quantization_cfg.weights_quantization_params.is_none()));
    }

    #[test]
    fn test_missing_kernel_reports_attribute() {
        let node = Node::new("fc", "Linear");
        match kernel_tensor(&node, &FrameworkInfo::standard()) {
            Err(CompressError::MissingWeight { node, attribute }) => {
                assert_eq!(node, "fc");
                assert_eq!(attribute, "kernel");
            }
            other => panic!("expected missing weight error, got {other:?}"),
        }
    }
}
