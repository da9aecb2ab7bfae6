//! Axonml Compress - Node Quantization Configuration
//!
//! Resolves, for every node of a layer graph, the quantization candidates a
//! target platform allows:
//!
//! - **Selection**: maps quantization methods to quantizer and params functions
//! - **Candidates**: builds one candidate per platform option, ordered by
//!   descending precision when mixed precision is enabled
//! - **Configuration pass**: walks the graph and returns a node to candidates
//!   mapping, disabling quantization a node cannot support
//! - **Params**: fits weights quantization parameters on the node kernels
//!
//! # Example
//! ```ignore
//! use axonml_compress::{set_quantization_configuration_to_graph, QuantizationConfig};
//! use axonml_graph::FrameworkInfo;
//! use axonml_tpc::default_tpc;
//!
//! let tpc = default_tpc()?;
//! let fw_info = FrameworkInfo::standard();
//! let qc = QuantizationConfig::load("quantization.toml")?;
//!
//! let mut quantization = set_quantization_configuration_to_graph(&graph, &fw_info, &tpc, &qc, true)?;
//! compute_weights_params(&graph, &fw_info, &mut quantization)?;
//! ```
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod candidates;
pub mod config;
pub mod configure;
pub mod error;
pub mod node_config;
pub mod params;
pub mod selection;

pub use candidates::{create_node_candidates_qc, create_node_single_candidate_qc};
pub use config::QuantizationConfig;
pub use configure::{
    reconcile_enable_flags, set_quantization_configs_to_node, set_quantization_configuration_to_graph,
    GraphQuantization, NodeCandidates,
};
pub use error::{CompressError, CompressResult};
pub use node_config::{
    CandidateNodeQuantizationConfig, NodeActivationQuantizationConfig, NodeWeightsQuantizationConfig,
};
pub use params::compute_weights_params;
pub use selection::{
    get_activation_quantization_params_fn, get_weights_quantization_fn, get_weights_quantization_params_fn,
    select_activation_functions, select_weights_functions, SelectedFunctions,
};
