//! Client facade for the network controller REST API.
//!
//! [`ControllerClient`] wraps a [`Transport`] with version gating, a retry
//! budget and envelope decoding, and implements the [`Controller`] method
//! surface the reconciler consumes. List methods return single pages; drain
//! them with [`pagination::drain`] or [`pagination::find_first`].

#![deny(missing_docs)]

pub mod client;
pub mod controller;
pub mod methods;
pub mod models;
pub mod pagination;
pub mod transport;

pub use client::ControllerClient;
pub use controller::Controller;
pub use methods::{MethodSpec, METHODS};
pub use transport::{ApiRequest, HttpTransport, HttpTransportBuilder, Transport};

/// Convenient result alias sharing the `netconv-core` error type.
pub type Result<T> = netconv_core::Result<T>;
