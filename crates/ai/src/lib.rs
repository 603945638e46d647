//! `designdiff-ai`
//!
//! **Responsibility:** boundary to the remote vision models.
//!
//! This crate is intentionally **not** part of the domain model:
//! - It must not touch persistence.
//! - It turns two screenshots into a list of [`VisualDiscrepancy`] findings,
//!   or into a [`VisionError`] the orchestrator can degrade on.
//! - The static fallback library and the templated summary live here too, so
//!   callers have a non-AI answer for every AI question.

pub mod anthropic;
pub mod error;
mod exchange;
pub mod fallback;
pub mod finding;
mod http;
pub mod image;
pub mod normalize;
pub mod openai;
pub mod prompt;
pub mod provider;
pub mod summary;

pub use anthropic::AnthropicProvider;
pub use error::VisionError;
pub use fallback::{FallbackError, FallbackLibrary};
pub use finding::VisualDiscrepancy;
pub use normalize::parse_discrepancies;
pub use openai::OpenAiProvider;
pub use provider::{ProviderConfig, ProviderKind, VisionProvider};
pub use summary::{PriorityCounts, summarize_counts, summarize_fallback};
