//! Graph Configuration Pass
//!
//! Resolves the candidate configurations of every node in a graph. The graph
//! is only read; the result is a [`GraphQuantization`] mapping each node to
//! its candidates.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use tracing::{debug, info, warn};

use axonml_graph::{FrameworkInfo, Graph, Node, NodeId};
use axonml_tpc::TargetPlatformCapabilities;

use crate::candidates::create_node_candidates_qc;
use crate::config::QuantizationConfig;
use crate::error::CompressResult;
use crate::node_config::{
    CandidateNodeQuantizationConfig, NodeActivationQuantizationConfig, NodeWeightsQuantizationConfig,
};

// =============================================================================
// Node Candidates
// =============================================================================

/// Candidates of one node, highest precision first.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeCandidates {
    candidates: Vec<CandidateNodeQuantizationConfig>,
}

impl NodeCandidates {
    /// Wraps an already ordered candidate list.
    pub fn new(candidates: Vec<CandidateNodeQuantizationConfig>) -> Self {
        Self { candidates }
    }

    /// Returns the candidates.
    pub fn as_slice(&self) -> &[CandidateNodeQuantizationConfig] {
        &self.candidates
    }

    /// Returns the candidate at `index`.
    pub fn get(&self, index: usize) -> Option<&CandidateNodeQuantizationConfig> {
        self.candidates.get(index)
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Returns true if there are no candidates.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Iterates over the candidates.
    pub fn iter(&self) -> std::slice::Iter<'_, CandidateNodeQuantizationConfig> {
        self.candidates.iter()
    }

    /// Iterates mutably over the candidates.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, CandidateNodeQuantizationConfig> {
        self.candidates.iter_mut()
    }

    /// Index of the highest precision candidate.
    pub fn max_precision_index(&self) -> usize {
        0
    }

    /// Index of the lowest precision candidate.
    pub fn min_precision_index(&self) -> usize {
        self.candidates.len().saturating_sub(1)
    }

    /// Index of the first candidate with the given bit-widths.
    pub fn candidate_index(&self, weights_n_bits: u32, activation_n_bits: u32) -> Option<usize> {
        self.candidates
            .iter()
            .position(|c| c.bit_widths() == (weights_n_bits, activation_n_bits))
    }

    /// Distinct weights configs, in candidate order.
    pub fn unique_weights_candidates(&self) -> Vec<&NodeWeightsQuantizationConfig> {
        let mut unique: Vec<&NodeWeightsQuantizationConfig> = Vec::new();
        for cfg in self.candidates.iter().map(|c| &c.weights_quantization_cfg) {
            if !unique.contains(&cfg) {
                unique.push(cfg);
            }
        }
        unique
    }

    /// Distinct activation configs, in candidate order.
    pub fn unique_activation_candidates(&self) -> Vec<&NodeActivationQuantizationConfig> {
        let mut unique: Vec<&NodeActivationQuantizationConfig> = Vec::new();
        for cfg in self.candidates.iter().map(|c| &c.activation_quantization_cfg) {
            if !unique.contains(&cfg) {
                unique.push(cfg);
            }
        }
        unique
    }

    /// Returns true if every candidate has the same weights config.
    pub fn is_all_weights_candidates_equal(&self) -> bool {
        self.unique_weights_candidates().len() <= 1
    }

    /// Returns true if every candidate has the same activation config.
    pub fn is_all_activation_candidates_equal(&self) -> bool {
        self.unique_activation_candidates().len() <= 1
    }
}

impl<'a> IntoIterator for &'a NodeCandidates {
    type Item = &'a CandidateNodeQuantizationConfig;
    type IntoIter = std::slice::Iter<'a, CandidateNodeQuantizationConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}

// =============================================================================
// Graph Quantization
// =============================================================================

/// Candidates of every node, in graph order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphQuantization {
    entries: Vec<(NodeId, NodeCandidates)>,
}

impl GraphQuantization {
    /// Candidates of a node.
    pub fn candidates(&self, id: NodeId) -> Option<&NodeCandidates> {
        self.position(id).map(|i| &self.entries[i].1)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no node was configured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over nodes and their candidates in graph order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &NodeCandidates)> {
        self.entries.iter().map(|(id, candidates)| (*id, candidates))
    }

    /// Iterates mutably over nodes and their candidates in graph order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (NodeId, &mut NodeCandidates)> {
        self.entries.iter_mut().map(|(id, candidates)| (*id, candidates))
    }

    // Entries are pushed in ascending id order
    fn position(&self, id: NodeId) -> Option<usize> {
        self.entries.binary_search_by_key(&id, |(node_id, _)| *node_id).ok()
    }
}

// =============================================================================
// Configuration Pass
// =============================================================================

/// Resolves the candidates of every node in `graph`.
///
/// Nodes are visited in graph order. The first node error aborts the pass
/// and no partial result is returned.
pub fn set_quantization_configuration_to_graph(
    graph: &Graph,
    fw_info: &FrameworkInfo,
    tpc: &TargetPlatformCapabilities,
    qc: &QuantizationConfig,
    mixed_precision_enable: bool,
) -> CompressResult<GraphQuantization> {
    let missing = fw_info.missing_activation_quantizers();
    if !missing.is_empty() {
        warn!(missing = ?missing, "Framework has no activation quantizer for some methods");
    }
    info!(
        nodes = graph.len(),
        platform = %tpc.name,
        mixed_precision = mixed_precision_enable,
        "Setting quantization configuration to graph"
    );

    let mut entries = Vec::with_capacity(graph.len());
    for node in graph.nodes() {
        let candidates = set_quantization_configs_to_node(node, fw_info, tpc, qc, mixed_precision_enable)?;
        entries.push((node.id, NodeCandidates::new(candidates)));
    }
    Ok(GraphQuantization { entries })
}

/// Resolves the candidates of one node.
pub fn set_quantization_configs_to_node(
    node: &Node,
    fw_info: &FrameworkInfo,
    tpc: &TargetPlatformCapabilities,
    qc: &QuantizationConfig,
    mixed_precision_enable: bool,
) -> CompressResult<Vec<CandidateNodeQuantizationConfig>> {
    let options = node.quantization_options(tpc);
    let weight_channel_axis = fw_info.kernel_channels_mapping(node.op_type()).output;

    let mut candidates = create_node_candidates_qc(
        qc,
        fw_info,
        weight_channel_axis,
        options,
        node.op_type(),
        mixed_precision_enable,
    )?;
    reconcile_enable_flags(
        &mut candidates,
        node.has_weights_to_quantize(fw_info),
        node.has_activation(),
    );

    debug!(
        node = %node.name,
        op_type = %node.op_type,
        candidates = candidates.len(),
        "Resolved node quantization candidates"
    );
    Ok(candidates)
}

/// Disables weights or activation quantization the node cannot support.
pub fn reconcile_enable_flags(
    candidates: &mut [CandidateNodeQuantizationConfig],
    has_weights_to_quantize: bool,
    has_activation: bool,
) {
    for candidate in candidates {
        candidate.weights_quantization_cfg.enable_weights_quantization &= has_weights_to_quantize;
        candidate.activation_quantization_cfg.enable_activation_quantization &= has_activation;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axonml_graph::WeightTensor;
    use axonml_tpc::{default_tpc, KERNEL_ATTR};

    fn conv_graph() -> (Graph, NodeId, NodeId) {
        let mut graph = Graph::new();
        let input = graph.add_node(Node::new("input", "Input")).unwrap();
        let conv = graph
            .add_node(
                Node::new("conv", "Conv2d")
                    .with_inputs(&[input])
                    .with_weight(KERNEL_ATTR, WeightTensor::full(&[2, 1, 1, 1], 0.5)),
            )
            .unwrap();
        let relu = graph.add_node(Node::new("relu", "ReLU").with_inputs(&[conv])).unwrap();
        (graph, conv, relu)
    }

    #[test]
    fn test_graph_pass_covers_every_node() {
        let (graph, conv, relu) = conv_graph();
        let tpc = default_tpc().unwrap();
        let result = set_quantization_configuration_to_graph(
            &graph,
            &FrameworkInfo::standard(),
            &tpc,
            &QuantizationConfig::default(),
            true,
        )
        .unwrap();

        assert_eq!(result.len(), graph.len());
        assert_eq!(result.candidates(conv).unwrap().len(), 3);
        assert_eq!(result.candidates(relu).unwrap().len(), 1);
        let ids: Vec<NodeId> = result.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, graph.nodes().iter().map(|n| n.id).collect::<Vec<_>>());
    }

    #[test]
    fn test_reconcile_enable_flags() {
        let (graph, conv, _) = conv_graph();
        let tpc = default_tpc().unwrap();
        let mut candidates = set_quantization_configs_to_node(
            graph.node(conv),
            &FrameworkInfo::standard(),
            &tpc,
            &QuantizationConfig::default(),
            true,
        )
        .unwrap();
        assert!(candidates.iter().all(|c| c.weights_quantization_cfg.enable_weights_quantization));

        reconcile_enable_flags(&mut candidates, false, true);
        assert!(candidates.iter().all(|c| !c.weights_quantization_cfg.enable_weights_quantization));
        assert!(candidates.iter().all(|c| c.activation_quantization_cfg.enable_activation_quantization));

        // Never re-enables
        reconcile_enable_flags(&mut candidates, true, true);
        assert!(candidates.iter().all(|c| !c.weights_quantization_cfg.enable_weights_quantization));
    }

    #[test]
    fn test_node_candidates_queries() {
        let (graph, conv, relu) = conv_graph();
        let tpc = default_tpc().unwrap();
        let result = set_quantization_configuration_to_graph(
            &graph,
            &FrameworkInfo::standard(),
            &tpc,
            &QuantizationConfig::default(),
            true,
        )
        .unwrap();

        let conv = result.candidates(conv).unwrap();
        assert_eq!(conv.max_precision_index(), 0);
        assert_eq!(conv.min_precision_index(), 2);
        assert_eq!(conv.candidate_index(4, 8), Some(1));
        assert_eq!(conv.candidate_index(16, 8), None);
        assert_eq!(conv.unique_weights_candidates().len(), 3);
        assert_eq!(conv.unique_activation_candidates().len(), 1);
        assert!(!conv.is_all_weights_candidates_equal());
        assert!(conv.is_all_activation_candidates_equal());

        let relu = result.candidates(relu).unwrap();
        assert_eq!(relu.min_precision_index(), 0);
        assert!(relu.is_all_weights_candidates_equal());
    }

    #[test]
    fn test_unknown_node_id() {
        let (graph, _, _) = conv_graph();
        let tpc = default_tpc().unwrap();
        let result = set_quantization_configuration_to_graph(
            &graph,
            &FrameworkInfo::standard(),
            &tpc,
            &QuantizationConfig::default(),
            false,
        )
        .unwrap();

        let mut other = Graph::new();
        for i in 0..5 {
            other.add_node(Node::new(&format!("n{i}"), "Input")).unwrap();
        }
        assert!(result.candidates(other.nodes()[4].id).is_none());
    }
}
