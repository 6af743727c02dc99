//! Medicine records and the caller-supplied input used to create them.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::DoseTime;
use crate::config::LOW_STOCK_THRESHOLD;

/// Store-assigned medicine identifier.
pub type MedicineId = u64;

/// Whether a scheduled dose has been taken today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoseStatus {
    #[default]
    #[serde(alias = "Belum Diminum")]
    NotTaken,
    #[serde(alias = "Sudah Diminum")]
    Taken,
}

impl DoseStatus {
    /// Human-readable label for dashboards.
    pub fn label(&self) -> &'static str {
        match self {
            DoseStatus::NotTaken => "Not Taken",
            DoseStatus::Taken => "Taken",
        }
    }
}

fn default_stock_unit() -> String {
    "tablet".to_string()
}

/// A persisted medicine with its daily schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicineRecord {
    /// Unique id, immutable after creation
    pub id: MedicineId,
    /// Medicine name (e.g., "Paracetamol")
    pub name: String,
    /// Dose per intake (e.g., "500mg")
    pub dose: String,
    /// Remaining quantity
    pub stock: u32,
    /// Unit for stock (e.g., "tablet", "ml")
    #[serde(default = "default_stock_unit")]
    pub stock_unit: String,
    /// Daily dose times
    #[serde(default)]
    pub times: BTreeSet<DoseTime>,
    /// Free-form notes
    #[serde(default)]
    pub notes: Option<String>,
    /// Times acknowledged for the current day
    #[serde(default)]
    pub taken_times: BTreeSet<DoseTime>,
    /// Status per dose time, written on acknowledge
    #[serde(default)]
    pub status_per_time: BTreeMap<DoseTime, DoseStatus>,
    /// Day on which `taken_times` were recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taken_on: Option<NaiveDate>,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: String,
    /// Last edit timestamp
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl MedicineRecord {
    /// Build a fresh record from validated input.
    pub fn from_input(id: MedicineId, input: MedicineInput) -> Self {
        Self {
            id,
            name: input.name,
            dose: input.dose,
            stock: input.stock,
            stock_unit: input.stock_unit,
            times: input.times.into_iter().collect(),
            notes: input.notes.filter(|n| !n.trim().is_empty()),
            taken_times: BTreeSet::new(),
            status_per_time: BTreeMap::new(),
            taken_on: None,
            created_at: chrono::Utc::now().to_rfc3339(),
            updated_at: None,
        }
    }

    /// Overwrite the editable fields, keeping identity and timestamps.
    ///
    /// Taken state survives only for times that are still scheduled.
    pub fn apply_input(&mut self, input: MedicineInput) {
        self.name = input.name;
        self.dose = input.dose;
        self.stock = input.stock;
        self.stock_unit = input.stock_unit;
        self.times = input.times.into_iter().collect();
        self.notes = input.notes.filter(|n| !n.trim().is_empty());

        let times = &self.times;
        self.taken_times.retain(|t| times.contains(t));
        self.status_per_time.retain(|t, _| times.contains(t));
        self.touch();
    }

    /// Display string used by schedule entries and alarm keys.
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.name, self.dose)
    }

    /// Check if stock is below the low-stock threshold.
    pub fn is_low_stock(&self) -> bool {
        self.stock < LOW_STOCK_THRESHOLD
    }

    /// Check if the dose at `time` has been acknowledged.
    pub fn is_taken(&self, time: &DoseTime) -> bool {
        self.taken_times.contains(time)
    }

    /// Record the dose at `time` as taken on `day`.
    ///
    /// Returns false when `time` is not part of this schedule.
    pub fn mark_taken(&mut self, time: DoseTime, day: NaiveDate) -> bool {
        if !self.times.contains(&time) {
            return false;
        }
        self.taken_times.insert(time);
        self.status_per_time.insert(time, DoseStatus::Taken);
        self.taken_on = Some(day);
        true
    }

    /// Forget all taken state.
    pub fn clear_taken(&mut self) {
        self.taken_times.clear();
        self.status_per_time.clear();
        self.taken_on = None;
    }

    /// Touch the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Some(chrono::Utc::now().to_rfc3339());
    }
}

/// Input validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Medicine name must not be empty")]
    EmptyName,

    #[error("Dose must not be empty")]
    EmptyDose,

    #[error("At least one dose time is required")]
    NoTimes,
}

/// Caller-supplied fields for add and edit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicineInput {
    pub name: String,
    pub dose: String,
    pub stock: u32,
    #[serde(default = "default_stock_unit")]
    pub stock_unit: String,
    pub times: Vec<DoseTime>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl MedicineInput {
    /// Create input with the default stock unit and no notes.
    pub fn new(name: impl Into<String>, dose: impl Into<String>, stock: u32, times: Vec<DoseTime>) -> Self {
        Self {
            name: name.into(),
            dose: dose.into(),
            stock,
            stock_unit: default_stock_unit(),
            times,
            notes: None,
        }
    }

    /// Reject input the add/edit forms would not accept.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.dose.trim().is_empty() {
            return Err(ValidationError::EmptyDose);
        }
        if self.times.is_empty() {
            return Err(ValidationError::NoTimes);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> DoseTime {
        s.parse().unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn paracetamol() -> MedicineInput {
        MedicineInput::new("Paracetamol", "500mg", 20, vec![t("20:00"), t("08:00")])
    }

    #[test]
    fn test_from_input() {
        let record = MedicineRecord::from_input(1, paracetamol());
        assert_eq!(record.id, 1);
        assert_eq!(record.display_name(), "Paracetamol - 500mg");
        assert_eq!(record.stock_unit, "tablet");
        assert!(record.taken_times.is_empty());
        assert!(record.updated_at.is_none());
        assert!(!record.created_at.is_empty());
        let times: Vec<String> = record.times.iter().map(|t| t.to_string()).collect();
        assert_eq!(times, vec!["08:00", "20:00"]);
    }

    #[test]
    fn test_blank_notes_dropped() {
        let mut input = paracetamol();
        input.notes = Some("   ".into());
        let record = MedicineRecord::from_input(1, input);
        assert!(record.notes.is_none());
    }

    #[test]
    fn test_low_stock_threshold() {
        let mut record = MedicineRecord::from_input(1, paracetamol());
        record.stock = 10;
        assert!(!record.is_low_stock());
        record.stock = 9;
        assert!(record.is_low_stock());
    }

    #[test]
    fn test_mark_taken_idempotent() {
        let mut record = MedicineRecord::from_input(1, paracetamol());
        assert!(record.mark_taken(t("08:00"), day()));
        assert!(record.mark_taken(t("08:00"), day()));
        assert_eq!(record.taken_times.len(), 1);
        assert_eq!(record.status_per_time.get(&t("08:00")), Some(&DoseStatus::Taken));
        assert_eq!(record.taken_on, Some(day()));
    }

    #[test]
    fn test_mark_taken_unscheduled_time_ignored() {
        let mut record = MedicineRecord::from_input(1, paracetamol());
        assert!(!record.mark_taken(t("12:00"), day()));
        assert!(record.taken_times.is_empty());
    }

    #[test]
    fn test_apply_input_keeps_taken_subset() {
        let mut record = MedicineRecord::from_input(1, paracetamol());
        record.mark_taken(t("08:00"), day());
        record.mark_taken(t("20:00"), day());

        let mut input = paracetamol();
        input.times = vec![t("08:00"), t("14:00")];
        input.stock = 5;
        record.apply_input(input);

        assert_eq!(record.stock, 5);
        assert!(record.is_taken(&t("08:00")));
        assert!(!record.is_taken(&t("20:00")));
        assert!(record.taken_times.is_subset(&record.times));
        assert!(record.updated_at.is_some());
    }

    #[test]
    fn test_validate() {
        assert!(paracetamol().validate().is_ok());

        let mut input = paracetamol();
        input.name = " ".into();
        assert_eq!(input.validate(), Err(ValidationError::EmptyName));

        let mut input = paracetamol();
        input.dose = String::new();
        assert_eq!(input.validate(), Err(ValidationError::EmptyDose));

        let mut input = paracetamol();
        input.times.clear();
        assert_eq!(input.validate(), Err(ValidationError::NoTimes));
    }

    #[test]
    fn test_deserialize_with_missing_optional_fields() {
        let json = r#"{"id": 3, "name": "Ibuprofen", "dose": "200mg", "stock": 4}"#;
        let record: MedicineRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.stock_unit, "tablet");
        assert!(record.times.is_empty());
        assert!(record.taken_on.is_none());
        assert!(record.is_low_stock());
    }

    #[test]
    fn test_status_per_time_serializes_as_map() {
        let mut record = MedicineRecord::from_input(1, paracetamol());
        record.mark_taken(t("08:00"), day());
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["status_per_time"]["08:00"], "taken");
        assert_eq!(value["taken_times"][0], "08:00");
        assert_eq!(value["taken_on"], "2024-03-01");
    }

    #[test]
    fn test_legacy_status_labels_accepted() {
        let status: BTreeMap<DoseTime, DoseStatus> =
            serde_json::from_str(r#"{"08:00": "Sudah Diminum", "20:00": "Belum Diminum"}"#).unwrap();
        assert_eq!(status.get(&t("08:00")), Some(&DoseStatus::Taken));
        assert_eq!(status.get(&t("20:00")), Some(&DoseStatus::NotTaken));
    }
}
