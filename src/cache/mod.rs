//! Short-lived response caching for the global feed.

mod lock;
pub mod middleware;
pub mod store;

pub use middleware::{CacheState, page_cache_layer};
pub use store::{CachedPage, PageCache, PageKey};
