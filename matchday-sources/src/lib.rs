//! Snapshot Source adapters.
//!
//! Each adapter owns one upstream's fragility: its endpoint shape, its
//! status vocabulary, its quirks in reporting goals. Everything is
//! validated here; the engine behind [`matchday_core::source::SnapshotSource`]
//! never sees a raw payload.

#![forbid(unsafe_code)]

pub mod fixtures_api;
pub mod livescore;

pub use fixtures_api::FixturesSource;
pub use livescore::LivescoreSource;

/// Upstream calls in flight at once, shared by every adapter instance's
/// internal gate.
pub const FETCH_CONCURRENCY: usize = 5;
