//! MediMate Core Library
//!
//! Medicine store and alarm reconciliation for a desktop reminder app.
//!
//! # Architecture
//!
//! ```text
//!   medicines.json ◀──load/save──▶ MedicineStore
//!                                       │
//!                          today_schedule (time, medicine, status)
//!                                       │
//!   clock ──tick/poll every 30s──▶ AlarmEngine ──armed set──▶ AlarmPlayer
//!                                       │
//!                                "alarm due" entries
//!                                       │
//!                             presentation layer
//!                                       │
//!                     acknowledge ──▶ taken_times + clear armed key
//! ```
//!
//! # Core Principle
//!
//! **Each due dose rings once per day until acknowledged.** Repeated polls
//! within the same minute never re-arm a dose that is armed or taken.
//!
//! # Modules
//!
//! - [`models`]: Domain types (MedicineRecord, DoseTime, ScheduleEntry, etc.)
//! - [`store`]: JSON-file medicine store with CRUD and schedule views
//! - [`alarm`]: Alarm engine and playback seam
//! - [`config`]: Constants and engine configuration

pub mod alarm;
pub mod config;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use alarm::{AlarmEngine, AlarmPlayer, SilentPlayer};
pub use config::{DayPolicy, EngineConfig};
pub use models::{
    AlarmKey, DashboardSummary, DoseStatus, DoseTime, MedicineId, MedicineInput, MedicineRecord,
    ScheduleEntry, TimeParseError, ValidationError,
};
pub use store::{MedicineStore, StoreError, StoreResult};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Mutex, MutexGuard};
use std::sync::Arc;

use tracing::warn;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum MediMateError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Lock poisoned: {0}")]
    LockError(String),
}

impl From<StoreError> for MediMateError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => MediMateError::NotFound(format!("medicine {}", id)),
            StoreError::Invalid(e) => MediMateError::InvalidInput(e.to_string()),
            other => MediMateError::StorageError(other.to_string()),
        }
    }
}

impl From<TimeParseError> for MediMateError {
    fn from(e: TimeParseError) -> Self {
        MediMateError::InvalidInput(e.to_string())
    }
}

impl From<ValidationError> for MediMateError {
    fn from(e: ValidationError) -> Self {
        MediMateError::InvalidInput(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for MediMateError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        MediMateError::LockError(e.to_string())
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open the medicine store at the given path.
///
/// `keep_taken_forever` disables the daily reset of taken doses.
#[uniffi::export]
pub fn open_medimate(path: String, keep_taken_forever: bool) -> Arc<MediMateCore> {
    let mut store = MedicineStore::open(&path);
    let config = EngineConfig {
        day_policy: if keep_taken_forever {
            DayPolicy::KeepForever
        } else {
            DayPolicy::ResetDaily
        },
    };
    let mut engine = AlarmEngine::new(config);
    engine.roll_over(&mut store, chrono::Local::now().date_naive());
    Arc::new(MediMateCore::new(store, engine))
}

/// Create an in-memory store (for testing).
#[uniffi::export]
pub fn open_medimate_in_memory() -> Arc<MediMateCore> {
    Arc::new(MediMateCore::new(
        MedicineStore::in_memory(),
        AlarmEngine::default(),
    ))
}

// =========================================================================
// Main API Object
// =========================================================================

struct Inner {
    store: MedicineStore,
    engine: AlarmEngine,
}

/// Thread-safe store and engine for the presentation layer.
///
/// The mutex makes this the single writer for the store's
/// load-modify-save cycle.
#[derive(uniffi::Object)]
pub struct MediMateCore {
    inner: Mutex<Inner>,
}

impl MediMateCore {
    /// Wrap an existing store and engine.
    pub fn new(store: MedicineStore, engine: AlarmEngine) -> Self {
        Self {
            inner: Mutex::new(Inner { store, engine }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, MediMateError> {
        Ok(self.inner.lock()?)
    }
}

#[uniffi::export]
impl MediMateCore {
    // =========================================================================
    // Medicine Operations
    // =========================================================================

    /// Check form fields without saving.
    pub fn validate_medicine(&self, fields: FfiMedicineInput) -> Result<(), MediMateError> {
        let input = MedicineInput::try_from(fields)?;
        input.validate()?;
        Ok(())
    }

    /// Add a medicine. Returns false if the input is invalid or saving failed.
    pub fn add_medicine(&self, fields: FfiMedicineInput) -> bool {
        let result = MedicineInput::try_from(fields)
            .and_then(|input| Ok(self.lock()?.store.add(input)?));
        match result {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Add medicine failed");
                false
            }
        }
    }

    /// Edit a medicine. Returns false if it does not exist or saving failed.
    pub fn edit_medicine(&self, id: u64, fields: FfiMedicineInput) -> bool {
        let result = MedicineInput::try_from(fields)
            .and_then(|input| Ok(self.lock()?.store.edit(id, input)?));
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(id, error = %e, "Edit medicine failed");
                false
            }
        }
    }

    /// Delete a medicine. Returns false if it does not exist or saving failed.
    pub fn delete_medicine(&self, id: u64) -> bool {
        let result = self
            .lock()
            .and_then(|mut inner| Ok(inner.store.delete(id)?));
        match result {
            Ok(_) => true,
            Err(e) => {
                warn!(id, error = %e, "Delete medicine failed");
                false
            }
        }
    }

    /// Get a medicine by id.
    pub fn get_medicine(&self, id: u64) -> Result<Option<FfiMedicine>, MediMateError> {
        let inner = self.lock()?;
        Ok(inner.store.get_by_id(id).map(FfiMedicine::from))
    }

    /// All medicines in store order.
    pub fn list_medicines(&self) -> Result<Vec<FfiMedicine>, MediMateError> {
        let inner = self.lock()?;
        Ok(inner.store.records().iter().map(FfiMedicine::from).collect())
    }

    /// Search medicines by name.
    pub fn search_medicines(&self, query: String) -> Result<Vec<FfiMedicine>, MediMateError> {
        let inner = self.lock()?;
        Ok(inner
            .store
            .search(&query)
            .into_iter()
            .map(FfiMedicine::from)
            .collect())
    }

    /// Total number of medicines.
    pub fn medicine_count(&self) -> Result<u64, MediMateError> {
        Ok(self.lock()?.store.count() as u64)
    }

    /// Medicines with stock below 10.
    pub fn get_low_stock_medicines(&self) -> Result<Vec<FfiMedicine>, MediMateError> {
        let inner = self.lock()?;
        Ok(inner
            .store
            .low_stock()
            .into_iter()
            .map(FfiMedicine::from)
            .collect())
    }

    /// Re-read the data file after an external change.
    pub fn reload(&self) -> Result<(), MediMateError> {
        self.lock()?.store.reload();
        Ok(())
    }

    // =========================================================================
    // Schedule Operations
    // =========================================================================

    /// Today's schedule sorted by time, with taken status overlaid.
    pub fn get_today_schedule(&self) -> Result<Vec<FfiScheduleEntry>, MediMateError> {
        let inner = self.lock()?;
        Ok(inner
            .store
            .schedule_with_status()
            .into_iter()
            .map(FfiScheduleEntry::from)
            .collect())
    }

    /// Totals for the dashboard cards.
    pub fn get_dashboard_summary(&self) -> Result<FfiDashboardSummary, MediMateError> {
        Ok(self.lock()?.store.summary().into())
    }

    // =========================================================================
    // Alarm Operations
    // =========================================================================

    /// Arm doses due at `now` ("HH:MM") and return the newly due entries.
    ///
    /// Runs the daily rollover first when the local date has changed.
    pub fn poll_alarms(&self, now: String) -> Result<Vec<FfiScheduleEntry>, MediMateError> {
        let now: DoseTime = now.parse()?;
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        inner.store.refresh();
        inner
            .engine
            .enter_day(&mut inner.store, chrono::Local::now().date_naive());
        Ok(inner
            .engine
            .poll(&inner.store, now)
            .into_iter()
            .map(FfiScheduleEntry::from)
            .collect())
    }

    /// Poll against the local clock, handling a day change first.
    pub fn tick_now(&self) -> Result<Vec<FfiScheduleEntry>, MediMateError> {
        let now = chrono::Local::now().naive_local();
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        Ok(inner
            .engine
            .tick(&mut inner.store, now)
            .into_iter()
            .map(FfiScheduleEntry::from)
            .collect())
    }

    /// Alarms still waiting for acknowledgment.
    pub fn armed_alarms(&self) -> Result<Vec<FfiScheduleEntry>, MediMateError> {
        let inner = self.lock()?;
        Ok(inner
            .engine
            .armed_entries()
            .into_iter()
            .map(FfiScheduleEntry::from)
            .collect())
    }

    /// Mark a dose as taken and clear its alarm.
    ///
    /// A dose whose medicine no longer exists still has its alarm cleared.
    pub fn acknowledge(&self, entry: FfiScheduleEntry) -> Result<(), MediMateError> {
        let entry = ScheduleEntry::try_from(entry)?;
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        inner.engine.acknowledge(&mut inner.store, &entry);
        Ok(())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe medicine form fields.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicineInput {
    pub name: String,
    pub dose: String,
    pub stock: u32,
    pub stock_unit: String,
    pub times: Vec<String>,
    pub notes: Option<String>,
}

impl TryFrom<FfiMedicineInput> for MedicineInput {
    type Error = MediMateError;

    fn try_from(fields: FfiMedicineInput) -> Result<Self, Self::Error> {
        let times = fields
            .times
            .iter()
            .map(|t| t.parse::<DoseTime>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MedicineInput {
            name: fields.name,
            dose: fields.dose,
            stock: fields.stock,
            stock_unit: fields.stock_unit,
            times,
            notes: fields.notes,
        })
    }
}

/// FFI-safe medicine record.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicine {
    pub id: u64,
    pub name: String,
    pub dose: String,
    pub stock: u32,
    pub stock_unit: String,
    pub times: Vec<String>,
    pub notes: Option<String>,
    pub taken_times: Vec<String>,
    pub low_stock: bool,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<&MedicineRecord> for FfiMedicine {
    fn from(record: &MedicineRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            dose: record.dose.clone(),
            stock: record.stock,
            stock_unit: record.stock_unit.clone(),
            times: record.times.iter().map(|t| t.to_string()).collect(),
            notes: record.notes.clone(),
            taken_times: record.taken_times.iter().map(|t| t.to_string()).collect(),
            low_stock: record.is_low_stock(),
            created_at: record.created_at.clone(),
            updated_at: record.updated_at.clone(),
        }
    }
}

/// FFI-safe dose status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiDoseStatus {
    NotTaken,
    Taken,
}

impl From<DoseStatus> for FfiDoseStatus {
    fn from(status: DoseStatus) -> Self {
        match status {
            DoseStatus::NotTaken => FfiDoseStatus::NotTaken,
            DoseStatus::Taken => FfiDoseStatus::Taken,
        }
    }
}

impl From<FfiDoseStatus> for DoseStatus {
    fn from(status: FfiDoseStatus) -> Self {
        match status {
            FfiDoseStatus::NotTaken => DoseStatus::NotTaken,
            FfiDoseStatus::Taken => DoseStatus::Taken,
        }
    }
}

/// FFI-safe schedule entry.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct FfiScheduleEntry {
    pub time: String,
    pub medicine: String,
    pub status: FfiDoseStatus,
}

impl From<ScheduleEntry> for FfiScheduleEntry {
    fn from(entry: ScheduleEntry) -> Self {
        Self {
            time: entry.time.to_string(),
            medicine: entry.medicine,
            status: entry.status.into(),
        }
    }
}

impl TryFrom<FfiScheduleEntry> for ScheduleEntry {
    type Error = MediMateError;

    fn try_from(entry: FfiScheduleEntry) -> Result<Self, Self::Error> {
        Ok(ScheduleEntry {
            time: entry.time.parse()?,
            medicine: entry.medicine,
            status: entry.status.into(),
        })
    }
}

/// FFI-safe dashboard totals.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct FfiDashboardSummary {
    pub total_medicines: u64,
    pub doses_today: u64,
    pub doses_taken: u64,
    pub low_stock: u64,
}

impl From<DashboardSummary> for FfiDashboardSummary {
    fn from(summary: DashboardSummary) -> Self {
        Self {
            total_medicines: summary.total_medicines as u64,
            doses_today: summary.doses_today as u64,
            doses_taken: summary.doses_taken as u64,
            low_stock: summary.low_stock as u64,
        }
    }
}
