//! IP address pool families: global pools and their per-site reservations.

pub mod global;
pub mod reserved;

pub use global::GlobalPools;
pub use reserved::ReservedPools;
