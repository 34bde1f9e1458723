//! Completion backend over the Gemini `generateContent` API.
//!
//! One stateless HTTP round trip per call; retry policy and buffer
//! ownership live with the caller.

pub mod gemini;

pub use gemini::{GeminiClient, GeminiConfig};
