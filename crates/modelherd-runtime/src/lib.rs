//! Process supervision and OS-level concerns for modelherd.
//!
//! This crate implements the ports and data model defined in
//! `modelherd-core`: the [`ProcessSupervisor`] that owns every OS process,
//! the [`SessionController`] for dependent interactive clients, concrete
//! readiness probes, and the model-listing runner.

pub mod listing;
pub mod output;
pub mod probe;
pub mod session;
pub mod shutdown;
pub mod supervisor;

pub use listing::list_models;
pub use probe::{HttpProbe, TcpProbe};
pub use session::{SessionBinding, SessionController};
pub use supervisor::{ProcessHandle, ProcessSupervisor, SupervisorConfig};
