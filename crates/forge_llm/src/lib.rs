//! # forge_llm
//!
//! Code generation through hosted LLM APIs.
//!
//! The recovery pipeline depends only on the [`CodeGenerator`] trait. This
//! crate provides the HTTP-backed implementation, the provider preference
//! order with its pure selection function [`next_provider`], and the
//! lenient parser that turns chatty model replies into strictly typed
//! responses.

pub mod client;
pub mod error;
pub mod generator;
pub mod parse;
pub mod provider;

pub use client::{LlmAdapter, LlmResponse};
pub use error::{LlmError, LlmResult};
pub use generator::{render_fix_prompt, CodeGenerator, FixRequest, LlmCodeGenerator};
pub use parse::{extract_json, parse_fix_response, parse_generated_app, FixResponse, GeneratedApp};
pub use provider::{next_provider, parse_provider_order, LlmProvider};
