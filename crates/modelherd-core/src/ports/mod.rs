//! Port definitions (trait abstractions) for infrastructure.
//!
//! Ports define the interfaces the core expects from the outside world.
//! They contain no implementation details and use only domain types.

pub mod output;
pub mod readiness;

pub use output::{NoopOutputSink, SessionOutputSink};
pub use readiness::ReadinessProbe;
