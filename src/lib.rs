//! # slide_agent
//!
//! Generates PowerPoint presentations by driving a tool-calling LLM.
//!
//! This library provides:
//! - A web form and JSON API for presentation requests
//! - A bounded agent loop that lets the model call presentation tools
//! - A small PresentationML writer the tools build decks with
//!
//! ## Architecture
//!
//! 1. Turn the request into a single instruction
//! 2. Give the model a fixed system prompt and the presentation tool schemas
//! 3. Execute requested tools, feed results back, stop on save or after the step budget
//! 4. Rename the newest `.pptx` in the workspace to `presentation_<unix-ts>.pptx`
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use slide_agent::{agent::PresentationAgent, llm::OpenAiClient, Config};
//!
//! let config = Config::from_env()?;
//! let llm = Arc::new(OpenAiClient::new(&config)?);
//! let agent = PresentationAgent::new(config, llm);
//! let path = agent.run("Renewable energy trends. Make it 5 slides").await?.path;
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod llm;
pub mod pptx;
pub mod tools;

pub use config::Config;
