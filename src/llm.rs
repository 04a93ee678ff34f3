//! Chat-completion adapter: provider dispatch, the HTTP client, and the
//! per-player memory store.

pub mod client;
pub mod memory;
pub mod provider;

pub use client::LlmClient;
pub use memory::{MemoryStore, truncate_words};
pub use provider::Provider;
