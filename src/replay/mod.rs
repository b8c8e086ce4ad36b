//! Replay drivers
//!
//! The sequential engine applies events strictly in input order; the
//! sharded driver statically partitions the stream by instrument hash and
//! runs one engine per partition.

pub mod engine;
pub mod sharded;

pub use engine::{ReplayEngine, ReplayParts, ReplayState, ReplaySummary};
pub use sharded::{ShardedOutcome, ShardedReplay};
