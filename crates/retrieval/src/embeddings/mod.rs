//! Query embedding.
//!
//! The orchestrator never embeds documents; it only turns partition queries
//! into vectors for the search backend.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
