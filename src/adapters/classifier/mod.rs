//! Classifier adapters.
//!
//! - `OpenAiClassifier`: OpenAI-compatible chat completions with a forced tool call
//! - `ScriptedClassifier`: deterministic double for tests

pub mod mock;
pub mod openai;

pub use mock::{ScriptedClassifier, ScriptedResponse};
pub use openai::{OpenAiClassifier, OpenAiClassifierConfig};
