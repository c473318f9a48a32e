//! Completion service clients used by the research relay.
//!
//! Every provider is exposed through [`CompletionClient`]: one prompt in, one
//! text completion out. Providers never retry; a failed call surfaces
//! immediately to the caller.
mod google;
mod openai;
mod types;

pub use google::{GoogleClient, GoogleConfig, DEFAULT_GOOGLE_API_BASE};
pub use openai::{OpenAiClient, OpenAiConfig, DEFAULT_OPENAI_API_BASE};
pub use types::{Completion, CompletionClient, CompletionError, CompletionRequest, CompletionUsage};
