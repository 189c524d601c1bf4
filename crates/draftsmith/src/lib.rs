//! Draftsmith - turns design prompts into ER diagrams, document drafts,
//! mockups and modification proposals through a chain of LLM providers.

pub mod build_info;
pub mod config;
pub mod document;
pub mod envelope;
pub mod extract;
pub mod fallback;
pub mod handlers;
pub mod llm;
pub mod prompt;
pub mod proposal;
pub mod request;
pub mod router;
pub mod server;
pub mod service;
pub mod splitter;
