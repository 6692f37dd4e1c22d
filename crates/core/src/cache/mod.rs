//! Link resolution cache.
//!
//! Remembers, per torrent, which direct URLs were resolved for which links
//! and which library files were written, so later runs can skip API calls
//! while the links are still fresh.

mod store;
mod types;

pub use store::{JsonFileLinkCache, LinkCache};
pub use types::{
    is_expired, parse_timestamp, CacheEntry, CacheError, CachedLink, LINK_LIFETIME_DAYS,
};
