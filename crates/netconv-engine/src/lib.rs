//! # netconv-engine
//!
//! Idempotent reconciliation of a network controller against a declarative
//! input document: global IP pools, per-site reserved sub-pools, per-site
//! network services, roles and users.
//!
//! ## Modules
//!
//! - [`input`] - The input document model
//! - [`validate`] - Validation and normalization, run before any apply
//! - [`diff`] - Comparison vectors and planned actions
//! - [`family`] - The fetch, plan and apply contract every group follows
//! - [`pools`], [`network`], [`roles`], [`users`] - The resource groups
//! - [`site`] - Site hierarchy resolution and device listing
//! - [`report`] - Outcome accumulation and the result envelope
//! - [`driver`] - The run state machine

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod diff;
pub mod driver;
pub mod family;
pub mod input;
pub mod logging;
pub mod network;
pub mod patch;
pub mod pools;
pub mod report;
pub mod roles;
pub mod secret;
pub mod site;
pub mod users;
pub mod validate;

pub use driver::{Driver, PlannedGroup, PlannedResource};
pub use input::{InputDocument, State};
pub use patch::Patch;
pub use report::{Group, GroupSummary, Outcome, ResultEnvelope, RunReport};
pub use secret::{Sealed, SecretManager, SessionCipher};
pub use site::SiteResolver;
