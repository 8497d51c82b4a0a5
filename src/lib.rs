//! SDRAG Assistant
//!
//! Core of a hybrid-RAG chat assistant for financial analytics:
//! - Classifies each query as semantic (known metric) or documental
//! - Answers semantic queries from a deterministic metric store, with the
//!   canonical SQL shown for auditability
//! - Sends everything else to a chat-completion model
//! - Traces every step with input, output and timing
//!
//! FLOW:
//! QUERY → CLASSIFY → SQL → DATA → EXPLAIN → RESPOND

pub mod agent;
pub mod api;
pub mod audit;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod error;
pub mod llm;
pub mod metrics;
pub mod models;
pub mod sink;
pub mod sql;
pub mod trace;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use classifier::QueryClassifier;
