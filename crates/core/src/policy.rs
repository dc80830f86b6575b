//! Seeding policy: decides when a torrent has seeded enough to be retired.
//!
//! Two styles are supported, picked at configuration time:
//! - **States**: the raw client-reported state (e.g. `pausedUP`) must be in an allow-set.
//! - **Thresholds**: ratio reached OR seeding time reached. Either clause alone is
//!   sufficient, and a clause configured at zero or below is disabled.

use std::collections::BTreeSet;

use crate::torrent_client::TorrentInfo;

/// Seeding policy evaluated against live client statistics.
#[derive(Debug, Clone, PartialEq)]
pub enum SeedingPolicy {
    /// Exact, case-sensitive match on the client-reported state string.
    States(BTreeSet<String>),
    /// `None` means the clause is disabled.
    Thresholds {
        target_ratio: Option<f64>,
        target_seeding_secs: Option<u64>,
    },
}

/// Outcome of evaluating a policy for one torrent. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    StateMatched,
    RatioReached,
    SeedingTimeReached,
    NotSatisfied,
}

impl PolicyDecision {
    pub fn is_eligible(&self) -> bool {
        !matches!(self, PolicyDecision::NotSatisfied)
    }
}

impl SeedingPolicy {
    /// Parse a comma separated list of client states. Entries are trimmed and
    /// blank entries dropped; case is preserved.
    pub fn from_state_list(list: &str) -> Self {
        SeedingPolicy::States(
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Build a threshold policy from raw configuration values.
    pub fn thresholds(target_ratio: f64, target_seeding_hours: i64) -> Self {
        SeedingPolicy::Thresholds {
            target_ratio: (target_ratio > 0.0).then_some(target_ratio),
            target_seeding_secs: (target_seeding_hours > 0)
                .then(|| (target_seeding_hours as u64).saturating_mul(3600)),
        }
    }

    /// True when no torrent could ever satisfy this policy.
    pub fn is_disabled(&self) -> bool {
        match self {
            SeedingPolicy::States(states) => states.is_empty(),
            SeedingPolicy::Thresholds {
                target_ratio,
                target_seeding_secs,
            } => target_ratio.is_none() && target_seeding_secs.is_none(),
        }
    }

    pub fn evaluate(&self, torrent: &TorrentInfo) -> PolicyDecision {
        match self {
            SeedingPolicy::States(states) => {
                if states.contains(torrent.raw_state.as_str()) {
                    PolicyDecision::StateMatched
                } else {
                    PolicyDecision::NotSatisfied
                }
            }
            SeedingPolicy::Thresholds {
                target_ratio,
                target_seeding_secs,
            } => {
                if target_ratio.is_some_and(|target| torrent.ratio >= target) {
                    PolicyDecision::RatioReached
                } else if target_seeding_secs.is_some_and(|target| torrent.seeding_secs >= target)
                {
                    PolicyDecision::SeedingTimeReached
                } else {
                    PolicyDecision::NotSatisfied
                }
            }
        }
    }
}
