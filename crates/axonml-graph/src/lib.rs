//! Axonml Graph - Layer Graph and Framework Layout
//!
//! The graph representation walked by the quantization configuration passes,
//! together with [`FrameworkInfo`], which tells the passes where each layer
//! keeps its kernel and which activation quantizers are available.
//!
//! # Example
//! ```ignore
//! use axonml_graph::{FrameworkInfo, Graph, Node, WeightTensor};
//!
//! let mut graph = Graph::new();
//! let input = graph.add_node(Node::new("input", "Input"))?;
//! graph.add_node(
//!     Node::new("conv1", "Conv2d")
//!         .with_inputs(&[input])
//!         .with_weight("kernel", WeightTensor::new(&[16, 3, 3, 3], weights)?),
//! )?;
//!
//! let fw_info = FrameworkInfo::standard();
//! ```
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod framework;
pub mod ir;

pub use error::{GraphError, GraphResult};
pub use framework::{ChannelAxis, FrameworkInfo};
pub use ir::{Graph, Node, NodeId, WeightTensor};
