//! # netconv-core
//!
//! Core types and policies shared by the netconv controller client and the
//! reconciliation engine.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy and failure classification
//! - [`ids`] - Strongly-typed identifiers for controller resources
//! - [`types`] - Primitive domain types (site paths, address spaces, CIDRs)
//! - [`config`] - Engine configuration loaded by callers
//! - [`client`] - Retry, pagination and HTTP client policies
//! - [`version`] - Controller release versions and comparison
//! - [`query`] - Query-parameter builder for list endpoints

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod ids;
pub mod query;
pub mod types;
pub mod version;

// Re-export commonly used types
pub use error::{Error, Result};
pub use version::ControllerVersion;
