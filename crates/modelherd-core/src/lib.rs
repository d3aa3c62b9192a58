//! Core domain types and port definitions for modelherd.
//!
//! This crate contains the pieces of the supervisor that are pure data and
//! policy: invocation descriptions, the command registry, lifecycle states
//! and events, the error taxonomy, and the port traits that infrastructure
//! crates implement. It holds no process or I/O implementation details.

pub mod events;
pub mod invocation;
pub mod model;
pub mod ports;
pub mod process;
pub mod registry;

// Re-export commonly used types for convenience
pub use events::{ProcessEvent, ProcessStateInfo};
pub use invocation::Invocation;
pub use model::ModelDescriptor;
pub use ports::{NoopOutputSink, ReadinessProbe, SessionOutputSink};
pub use process::{HandleId, ProcessStatus, SessionError, SupervisorError};
pub use registry::{CommandRegistry, InvocationTemplate, RegistryError};

// Silence unused dev-dependency warnings until we add runtime-based tests
#[cfg(test)]
use tokio_test as _;
