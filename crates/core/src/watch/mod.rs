//! Watch mode: keep the library in sync continuously.

mod runner;
mod types;

pub use runner::SyncWatcher;
pub use types::{WatchOptions, WatchStatus};
