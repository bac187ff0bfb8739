//! fromptly - Inline prompt suggestions for web code-generation tools
//!
//! A suggestion service that asks an LLM to rewrite a raw prompt into a more
//! specific one, and a page overlay controller that debounces edits, shows
//! the suggestions next to the prompt field and highlights vague phrases.
//! Supports Gemini, Anthropic, OpenAI and OpenAI-compatible endpoints.

pub mod cli;
pub mod config;
pub mod dom;
pub mod error;
pub mod llm;
pub mod model;
pub mod overlay;
pub mod service;
pub mod util;
