//! pubwatch-llm — Generative model backend abstraction.
//! Implements the LlmBackend trait for the Gemini API plus an audit
//! record for every call.

pub mod backend;
pub mod audit;
