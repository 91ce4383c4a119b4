//! Goal and intent classifiers
//!
//! Two classifiers sit in front of plan synthesis:
//! - goal: pure keyword/regex mapping from free text to a coarse topic
//! - intent: heuristic label with an LLM-assisted authoritative path

pub mod goal;
pub mod intent;

pub use goal::classify_goal;
pub use intent::{classify_intent, heuristic_intent};
