//! Live cache layer with snapshot isolation.
//!
//! One [`LiveCache`] per entity type holds the latest active version of
//! every identity as of its last reload. Reloads are explicit: the cache
//! never refreshes itself on a miss, and absence only means "no active
//! version known as of the last reload".
//!
//! # Example
//!
//! ```ignore
//! let cache = Arc::new(LiveCache::<User>::new(provider.get()));
//! cache.reload()?;
//!
//! let users = RefData::new(Arc::clone(&cache));
//! if let Some(user) = users.get("EvanJames") {
//!     println!("{} sits on desk {}", user.identity(), user.desk);
//! }
//! ```

pub mod accessor;
pub mod live;
pub mod stats;

pub use accessor::RefData;
pub use live::{CacheSnapshot, LiveCache};
pub use stats::CacheStats;
