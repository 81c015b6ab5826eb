//! docchat — document retrieval and multi-variant question answering.
//!
//! The binary in `main.rs` is a thin console front end; everything it drives
//! lives here so integration tests can reach it.

pub mod config;
pub mod error;
pub mod llm;
pub mod logger;
pub mod subsystems;
