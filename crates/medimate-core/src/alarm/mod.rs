//! Schedule-to-alarm reconciliation.
//!
//! The engine compares the clock with today's schedule and arms each due,
//! untaken dose exactly once. Per (time, medicine) pair and calendar day:
//!
//! ```text
//! IDLE ──poll match, not taken──▶ ARMED ──acknowledge──▶ ACKNOWLEDGED
//!   ▲                                                        │
//!   └──────────────────── day rollover ◀─────────────────────┘
//! ```
//!
//! A pair whose time is already taken stays IDLE when polled.

mod player;

pub use player::*;

use std::collections::BTreeSet;

use chrono::{Local, NaiveDate, NaiveDateTime};
use tracing::{debug, error, info, warn};

use crate::config::{DayPolicy, EngineConfig};
use crate::models::{AlarmKey, DoseTime, ScheduleEntry};
use crate::store::MedicineStore;

/// Tracks armed alarms against a [`MedicineStore`].
pub struct AlarmEngine {
    config: EngineConfig,
    armed: BTreeSet<AlarmKey>,
    today: Option<NaiveDate>,
    player: Box<dyn AlarmPlayer>,
}

impl AlarmEngine {
    /// Create an engine with the logging-only player.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_player(config, Box::new(SilentPlayer))
    }

    /// Create an engine that drives `player`.
    pub fn with_player(config: EngineConfig, player: Box<dyn AlarmPlayer>) -> Self {
        Self {
            config,
            armed: BTreeSet::new(),
            today: None,
            player,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Calendar day the engine last rolled over to.
    pub fn today(&self) -> Option<NaiveDate> {
        self.today
    }

    /// Keys of alarms waiting for acknowledgment.
    pub fn armed(&self) -> impl Iterator<Item = &AlarmKey> {
        self.armed.iter()
    }

    pub fn is_armed(&self, key: &AlarmKey) -> bool {
        self.armed.contains(key)
    }

    /// Armed alarms as schedule entries, ready to hand back to `acknowledge`.
    pub fn armed_entries(&self) -> Vec<ScheduleEntry> {
        self.armed
            .iter()
            .map(|key| ScheduleEntry::new(key.time, key.medicine.clone()))
            .collect()
    }

    /// Arm every untaken dose scheduled at `now`, returning the newly due entries.
    ///
    /// Doses that are already armed or already taken are skipped, so repeated
    /// polls within the same minute signal each dose once.
    pub fn poll(&mut self, store: &MedicineStore, now: DoseTime) -> Vec<ScheduleEntry> {
        let mut due = Vec::new();

        for entry in store.today_schedule() {
            if entry.time != now {
                continue;
            }
            if store.is_time_taken(&entry.medicine, &entry.time) {
                debug!(time = %entry.time, medicine = %entry.medicine, "Dose already taken");
                continue;
            }
            if !self.armed.insert(entry.key()) {
                continue;
            }

            self.player.start(&entry);
            due.push(entry);
        }

        if !due.is_empty() {
            info!(count = due.len(), now = %now, "Alarms armed");
        }
        due
    }

    /// Scheduled-task entry point: pick up changes other writers made to the
    /// store, handle a day change, then poll.
    pub fn tick(&mut self, store: &mut MedicineStore, now: NaiveDateTime) -> Vec<ScheduleEntry> {
        store.refresh();
        self.enter_day(store, now.date());
        self.poll(store, DoseTime::from_time(now.time()))
    }

    /// Roll over to `day` unless it is already the current day.
    ///
    /// Returns true when a rollover happened.
    pub fn enter_day(&mut self, store: &mut MedicineStore, day: NaiveDate) -> bool {
        if self.today == Some(day) {
            return false;
        }
        self.roll_over(store, day);
        true
    }

    /// Start a new calendar day.
    ///
    /// Armed alarms are dropped. With [`DayPolicy::ResetDaily`], taken state
    /// recorded before `day` is cleared from the store.
    pub fn roll_over(&mut self, store: &mut MedicineStore, day: NaiveDate) {
        let previous = self.today.replace(day);

        for key in std::mem::take(&mut self.armed) {
            self.player.stop(&key);
        }

        if self.config.day_policy == DayPolicy::ResetDaily {
            match store.reset_taken_before(day) {
                Ok(0) => {}
                Ok(reset) => info!(reset, day = %day, "Cleared taken doses from earlier days"),
                Err(e) => error!(error = %e, "Failed to clear taken doses"),
            }
        }

        debug!(?previous, day = %day, "Rolled over to new day");
    }

    /// Mark `entry` as taken and silence its alarm.
    ///
    /// The alarm is cleared even when no medicine matches or persisting
    /// fails. Returns whether the store recorded the dose.
    pub fn acknowledge(&mut self, store: &mut MedicineStore, entry: &ScheduleEntry) -> bool {
        let day = self.today.unwrap_or_else(|| Local::now().date_naive());

        let recorded = match store.mark_taken(&entry.medicine, entry.time, day) {
            Ok(true) => true,
            Ok(false) => {
                warn!(time = %entry.time, medicine = %entry.medicine, "No medicine matches acknowledged dose");
                false
            }
            Err(e) => {
                error!(error = %e, medicine = %entry.medicine, "Failed to persist acknowledged dose");
                false
            }
        };

        let key = entry.key();
        self.armed.remove(&key);
        self.player.stop(&key);
        recorded
    }

    /// Acknowledge every armed alarm. Returns how many were cleared.
    pub fn acknowledge_all(&mut self, store: &mut MedicineStore) -> usize {
        let entries = self.armed_entries();
        for entry in &entries {
            self.acknowledge(store, entry);
        }
        entries.len()
    }
}

impl Default for AlarmEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
