//! Result cache in front of dispatch.
//!
//! Each façade owns one [`ResultCache`]; nothing is shared across façades.
//! A miss always falls through to real computation, so the cache can only
//! save work, never change an answer.

mod key;
mod store;

pub use key::{cache_key, task_cache_key};
pub use store::{CacheConfig, CacheStats, ResultCache};
