//! Axonml TPC - Target Platform Capabilities
//!
//! Describes which quantization configurations a deployment target accepts
//! for each operator type:
//!
//! - **`AttributeQuantizationConfig`**: how one weight attribute is quantized
//! - **`OpQuantizationConfig`**: one legal option for an operator
//! - **`QuantizationConfigOptions`**: ordered options plus a base option
//! - **`TargetPlatformCapabilities`**: operator sets mapped to options,
//!   buildable in code or loadable from TOML
//!
//! # Example
//! ```ignore
//! use axonml_tpc::{default_tpc, TargetPlatformCapabilities};
//!
//! let tpc = default_tpc()?;
//! let conv_options = tpc.get_qco("Conv2d");
//! assert_eq!(conv_options.len(), 3);
//!
//! let custom = TargetPlatformCapabilities::load("platform.toml")?;
//! ```
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod capabilities;
pub mod error;
pub mod models;
pub mod op_config;

pub use capabilities::{OperatorsSet, TargetPlatformCapabilities};
pub use error::{TpcError, TpcResult};
pub use models::{default_tpc, qnnpack_tpc, BIAS_ATTR, KERNEL_ATTR};
pub use op_config::{
    AttributeQuantizationConfig, MethodName, OpQuantizationConfig, QuantizationConfigOptions,
};
