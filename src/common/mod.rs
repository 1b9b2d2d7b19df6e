pub mod cache;
pub mod config;
pub mod error;
pub mod retry;

/// Concurrency bound for collection fan-out. The transport's connection pool
/// is sized from it so warmed connections cover a full fan-out per account.
pub(crate) const FANOUT_CONCURRENCY: usize = 8;
