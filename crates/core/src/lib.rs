//! Core types for the server-side analytics hit client: error taxonomy,
//! configuration, the e-commerce product record and the protocol
//! parameter set.

pub mod config;
pub mod error;
pub mod params;
pub mod types;

pub use config::{IdSpan, IdentityConfig, TrackerConfig};
pub use error::{SsgaError, SsgaResult};
pub use params::{ParamValue, ParameterSet};
pub use types::ProductField;
