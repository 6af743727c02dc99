//! Derived schedule views: entries, alarm keys and dashboard totals.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{DoseStatus, DoseTime};

/// One dose in today's flattened schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleEntry {
    /// Dose time
    pub time: DoseTime,
    /// Medicine display string ("name - dose")
    pub medicine: String,
    /// Taken status (NotTaken in the raw view)
    pub status: DoseStatus,
}

impl ScheduleEntry {
    pub fn new(time: DoseTime, medicine: impl Into<String>) -> Self {
        Self {
            time,
            medicine: medicine.into(),
            status: DoseStatus::NotTaken,
        }
    }

    /// Key identifying this dose's alarm.
    pub fn key(&self) -> AlarmKey {
        AlarmKey {
            time: self.time,
            medicine: self.medicine.clone(),
        }
    }
}

/// Identity of an alarm: one dose time of one medicine.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AlarmKey {
    pub time: DoseTime,
    pub medicine: String,
}

impl fmt::Display for AlarmKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.time, self.medicine)
    }
}

/// Totals shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_medicines: usize,
    pub doses_today: usize,
    pub doses_taken: usize,
    pub low_stock: usize,
}
