//! The LLM <-> tool dispatch loop: seeds a conversation, alternates between
//! streaming LLM turns and tool invocations, and emits the caller-facing
//! event stream.

pub mod config;
pub mod runner;
pub mod stream;

pub use config::DispatchConfig;
pub use runner::{run_dispatch, DispatchOutcome};
