//! Application-level constants and engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "MediMate";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Data file used when the caller does not name one.
pub const DEFAULT_DATA_FILE: &str = "medicines.json";

/// How often the alarm task polls the clock.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Stock strictly below this counts as low.
pub const LOW_STOCK_THRESHOLD: u32 = 10;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "medimate=info,medimate_core=info"
}

/// What happens to taken state when the calendar day changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPolicy {
    /// Clear armed alarms and taken times recorded before today.
    #[default]
    ResetDaily,
    /// Never clear taken times (a dose taken once stays taken).
    KeepForever,
}

/// Alarm engine settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub day_policy: DayPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(DEFAULT_POLL_INTERVAL, Duration::from_secs(30));
        assert_eq!(LOW_STOCK_THRESHOLD, 10);
        assert_eq!(EngineConfig::default().day_policy, DayPolicy::ResetDaily);
    }

    #[test]
    fn test_app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
