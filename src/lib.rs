//! deskpilot: a vision-model driven desktop automation agent.
//!
//! The agent captures the primary monitor, sends the frame to a local
//! vision-language model server, decodes the returned action JSON into a
//! typed intent, and injects the corresponding mouse/keyboard input. The
//! loop in [`agent::engine`] drives this cycle until the model reports the
//! task complete, the step limit is hit, or a human interrupts.

pub mod agent;
pub mod config;
pub mod coordinates;
pub mod errors;
pub mod executor;
pub mod llm;
pub mod perception;
