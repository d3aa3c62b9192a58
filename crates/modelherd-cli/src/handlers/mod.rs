//! Command handlers.
//!
//! Each handler receives the fully-composed [`crate::CliContext`] and
//! delegates process work to the supervisor and session controller.

pub mod chat;
pub mod common;
pub mod list;
pub mod pull;
pub mod run;
pub mod serve;
