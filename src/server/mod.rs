//! Connection dispatch and lifetime management.
//!
//! This layer owns every live connection: the readiness event loop, the
//! bounded registry with its dual-timeout eviction policy, and the
//! signal-to-flag shutdown bridge.

pub mod dispatcher;
pub mod registry;
pub mod signal;

pub use dispatcher::Dispatcher;
pub use registry::{Connection, HARD_TIMEOUT, Registry, RegistryFull, SOFT_TIMEOUT};
