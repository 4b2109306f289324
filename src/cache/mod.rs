//! Fast job-status cache.
//!
//! Job state is written here after every status transition so the API layer
//! can poll progress without touching the durable store. Entries are
//! TTL-bound; the cache is not the system of record.

mod error;
mod keys;
mod memory;
mod redis;
mod traits;

pub use error::{CacheError, CacheResult};
pub use keys::CacheKeys;
pub use memory::MemoryCache;
pub use redis::RedisCache;
pub use traits::{CacheExt, JobCache};
