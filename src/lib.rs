//! Cloudflare Config Assistant Orchestrator
//!
//! An LLM-backed planning engine that:
//! - Turns a free-text goal into a schema-valid configuration plan
//! - Classifies topic and intent deterministically before asking the model
//! - Grounds synthesis in retrieved documentation context
//! - Repairs or replaces bad model output with deterministic fallbacks
//! - Enforces non-negotiable safety policy on every plan
//! - Tracks per-session goals, answers, and pending questions
//!
//! PIPELINE:
//! GOAL → CLASSIFY → RETRIEVE → SYNTHESIZE → NORMALIZE → ENFORCE → ASK

pub mod api;
pub mod classifiers;
pub mod error;
pub mod llm;
pub mod models;
pub mod planning;
pub mod retrieval;
pub mod session;

pub use error::Result;

// Re-export common types
pub use models::*;
