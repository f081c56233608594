//! Shared fixture value types.
//!
//! Everything a Snapshot Source hands to the tracker lives here. Adapters
//! are responsible for producing validated values; the tracker never sees a
//! raw API payload.

pub mod snapshot;

pub use snapshot::{EventMarker, LifecycleSignal, MarkerKind, MatchSnapshot, RedCardFlags};

use serde::{Deserialize, Serialize};

/// Stable identity of a fixture, derived from the two sides' identifying
/// fields (short codes where the source has them, display names otherwise).
///
/// The same fixture must map to the same id on every poll, and two different
/// fixtures must never share one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchId(String);

impl MatchId {
    /// Derive an id from the home and away identifying keys.
    ///
    /// Keys are lowercased and stripped to alphanumerics so that cosmetic
    /// feed differences ("Sweden " vs "sweden") cannot split one fixture
    /// into two records.
    pub fn derive(home_key: &str, away_key: &str) -> Self {
        let mut id = String::with_capacity(home_key.len() + away_key.len() + 1);
        push_slug(&mut id, home_key);
        id.push('-');
        push_slug(&mut id, away_key);
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An id derived from empty keys identifies nothing.
    pub fn is_empty(&self) -> bool {
        self.0 == "-"
    }
}

fn push_slug(out: &mut String, key: &str) {
    for c in key.chars().filter(|c| c.is_alphanumeric()) {
        out.extend(c.to_lowercase());
    }
}

impl std::fmt::Display for MatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which side of a fixture an incident belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamSide {
    Home,
    Away,
}
