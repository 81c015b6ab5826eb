//! Memory store implementations.

pub mod basic_session;
pub mod chunker;
pub mod docstore;
pub mod docstore_core;
pub mod keywords;
pub mod kg_docstore;
