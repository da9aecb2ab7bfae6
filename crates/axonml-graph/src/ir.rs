//! Graph Representation
//!
//! Layer graph consumed by the quantization configuration passes. Nodes are
//! stored in insertion order and may only consume nodes added before them, so
//! insertion order is a topological order.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use rustc_hash::FxHashMap;

use axonml_tpc::{QuantizationConfigOptions, TargetPlatformCapabilities};

use crate::error::{GraphError, GraphResult};
use crate::framework::FrameworkInfo;

/// Unique identifier for a node in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Returns the raw index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

// =============================================================================
// Weight Tensor
// =============================================================================

/// Float weight tensor stored on a node.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl WeightTensor {
    /// Creates a tensor, checking that `data` fills `shape`.
    pub fn new(shape: &[usize], data: Vec<f32>) -> GraphResult<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(GraphError::WeightShapeMismatch {
                expected,
                found: data.len(),
            });
        }
        Ok(Self {
            shape: shape.to_vec(),
            data,
        })
    }

    /// Creates a tensor filled with a constant.
    pub fn full(shape: &[usize], value: f32) -> Self {
        let numel = shape.iter().product();
        Self {
            shape: shape.to_vec(),
            data: vec![value; numel],
        }
    }

    /// Returns the dimensions.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the flat values.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Returns the number of elements.
    pub fn numel(&self) -> usize {
        self.data.len()
    }
}

// =============================================================================
// Node
// =============================================================================

/// A layer in the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node identifier, assigned when the node is added to a graph.
    pub id: NodeId,
    /// Unique node name.
    pub name: String,
    /// Operator type, used to look up platform options.
    pub op_type: String,
    /// Input nodes.
    pub inputs: Vec<NodeId>,
    /// Weight tensors keyed by attribute name.
    pub weights: FxHashMap<String, WeightTensor>,
    /// Whether the node produces an activation tensor.
    pub has_activation: bool,
}

impl Node {
    /// Creates a node with no inputs or weights.
    pub fn new(name: &str, op_type: &str) -> Self {
        Self {
            id: NodeId(0),
            name: name.to_string(),
            op_type: op_type.to_string(),
            inputs: Vec::new(),
            weights: FxHashMap::default(),
            has_activation: true,
        }
    }

    /// Sets the input nodes.
    pub fn with_inputs(mut self, inputs: &[NodeId]) -> Self {
        self.inputs = inputs.to_vec();
        self
    }

    /// Attaches a weight tensor under `attr`.
    pub fn with_weight(mut self, attr: &str, tensor: WeightTensor) -> Self {
        self.weights.insert(attr.to_string(), tensor);
        self
    }

    /// Marks the node as producing no activation tensor.
    pub fn without_activation(mut self) -> Self {
        self.has_activation = false;
        self
    }

    /// Returns the operator type.
    pub fn op_type(&self) -> &str {
        &self.op_type
    }

    /// Returns the weight tensor stored under `attr`.
    pub fn weight(&self, attr: &str) -> Option<&WeightTensor> {
        self.weights.get(attr)
    }

    /// Returns true if the node has a weight tensor under `attr`.
    pub fn has_weight(&self, attr: &str) -> bool {
        self.weights.contains_key(attr)
    }

    /// Returns whether the node produces an activation tensor.
    pub fn has_activation(&self) -> bool {
        self.has_activation
    }

    /// Returns true if any kernel attribute of the node's operator type is
    /// present on the node.
    pub fn has_weights_to_quantize(&self, fw_info: &FrameworkInfo) -> bool {
        fw_info
            .kernel_op_attributes(&self.op_type)
            .into_iter()
            .flatten()
            .any(|attr| self.has_weight(attr))
    }

    /// Returns the platform options that apply to this node.
    pub fn quantization_options<'a>(
        &self,
        tpc: &'a TargetPlatformCapabilities,
    ) -> &'a QuantizationConfigOptions {
        tpc.get_qco(&self.op_type)
    }
}

// =============================================================================
// Graph
// =============================================================================

/// Layer graph.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    names: FxHashMap<String, NodeId>,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node and returns its id.
    ///
    /// Fails if the name is taken or an input does not refer to an earlier
    /// node.
    pub fn add_node(&mut self, mut node: Node) -> GraphResult<NodeId> {
        if self.names.contains_key(&node.name) {
            return Err(GraphError::DuplicateNodeName(node.name));
        }
        let id = NodeId(self.nodes.len());
        if let Some(input) = node.inputs.iter().find(|input| input.0 >= id.0) {
            return Err(GraphError::InvalidNodeReference {
                node: node.name,
                input: input.0,
            });
        }
        node.id = id;
        self.names.insert(node.name.clone(), id);
        self.nodes.push(node);
        Ok(id)
    }

    /// Returns the node with the given id.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Returns the node with the given id, if it belongs to this graph.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Looks a node up by name.
    pub fn node_by_name(&self, name: &str) -> GraphResult<&Node> {
        self.names
            .get(name)
            .map(|id| &self.nodes[id.0])
            .ok_or_else(|| GraphError::NodeNotFound(name.to_string()))
    }

    /// Returns all nodes in topological order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns the number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the ids of nodes that consume `id`.
    pub fn consumers(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.inputs.contains(&id))
            .map(|n| n.id)
            .collect()
    }

    /// Validates the graph structure.
    pub fn validate(&self) -> GraphResult<()> {
        for (i, node) in self.nodes.iter().enumerate() {
            if node.id.0 != i {
                return Err(GraphError::InvalidNodeReference {
                    node: node.name.clone(),
                    input: node.id.0,
                });
            }
            for input in &node.inputs {
                if input.0 >= i {
                    return Err(GraphError::InvalidNodeReference {
                        node: node.name.clone(),
                        input: input.0,
                    });
                }
            }
        }
        Ok(())
    }
}
