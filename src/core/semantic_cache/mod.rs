//! Approximate-match response caching
//!
//! Responses are keyed by prompt embedding rather than exact text: a lookup
//! whose embedding lies within a configurable Euclidean radius of a cached
//! entry reuses that entry's response.

mod cache;
mod types;

#[cfg(test)]
mod tests;

pub use cache::SemanticCache;
pub use types::{CacheEntry, CacheStats, Embedder};
