//! LLM provider adapters with streaming support, used by the traversal
//! engine to reach the relevance oracle.

pub mod anthropic;
pub mod provider;
pub mod types;

pub use anthropic::AnthropicProvider;
pub use provider::LlmProvider;
pub use types::*;
