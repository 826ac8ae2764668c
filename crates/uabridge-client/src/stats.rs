// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Bridge runtime statistics.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

// =============================================================================
// BridgeStats
// =============================================================================

/// Monotonic counters and timestamps describing the bridge's health.
///
/// Updated only by the bridge task; callers receive snapshot clones, never
/// references into live state.
#[derive(Debug, Clone, Serialize)]
pub struct BridgeStats {
    /// When the bridge task started.
    pub started_at: DateTime<Utc>,

    /// When the last connect reached a successful first cycle.
    pub last_connected: Option<DateTime<Utc>>,

    /// Read/write cycles completed since the task started.
    pub cycles_total: u64,

    /// Cycles completed since the last reconnect.
    pub cycles_since_connect: u64,

    /// Number of connect attempts that reached type discovery.
    pub reconnects: u64,

    /// Duration of the most recent full cycle.
    #[serde(with = "humantime_serde")]
    pub last_cycle: Duration,
}

impl BridgeStats {
    /// Creates zeroed statistics stamped with the current time.
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            last_connected: None,
            cycles_total: 0,
            cycles_since_connect: 0,
            reconnects: 0,
            last_cycle: Duration::ZERO,
        }
    }

    /// Uptime since the bridge task started.
    pub fn uptime(&self) -> Duration {
        (Utc::now() - self.started_at).to_std().unwrap_or_default()
    }

    /// Time connected since the last successful first cycle.
    pub fn connected_for(&self) -> Option<Duration> {
        self.last_connected
            .map(|t| (Utc::now() - t).to_std().unwrap_or_default())
    }
}

impl Default for BridgeStats {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_stats() {
        let stats = BridgeStats::new();
        assert_eq!(stats.cycles_total, 0);
        assert_eq!(stats.reconnects, 0);
        assert!(stats.last_connected.is_none());
        assert!(stats.connected_for().is_none());
    }

    #[test]
    fn test_connected_for() {
        let mut stats = BridgeStats::new();
        stats.last_connected = Some(Utc::now() - chrono::Duration::seconds(5));
        let connected = stats.connected_for().unwrap();
        assert!(connected >= Duration::from_secs(4));
    }
}
