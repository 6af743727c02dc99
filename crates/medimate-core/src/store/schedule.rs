//! Schedule views and taken-state bookkeeping.

use chrono::NaiveDate;
use tracing::{debug, info};

use super::{MedicineStore, StoreResult};
use crate::models::{DashboardSummary, DoseStatus, DoseTime, MedicineRecord, ScheduleEntry};

impl MedicineStore {
    /// Flatten every medicine's times into one list sorted by time.
    ///
    /// Every entry is `NotTaken`; use [`MedicineStore::schedule_with_status`]
    /// for the view with taken state overlaid. Ties keep store order.
    pub fn today_schedule(&self) -> Vec<ScheduleEntry> {
        let mut schedule: Vec<ScheduleEntry> = self
            .records
            .iter()
            .flat_map(|record| {
                let display = record.display_name();
                record
                    .times
                    .iter()
                    .map(move |time| ScheduleEntry::new(*time, display.clone()))
            })
            .collect();
        schedule.sort_by_key(|entry| entry.time);
        schedule
    }

    /// Today's schedule with each entry's taken status filled in.
    pub fn schedule_with_status(&self) -> Vec<ScheduleEntry> {
        let mut schedule = self.today_schedule();
        for entry in &mut schedule {
            if self.is_time_taken(&entry.medicine, &entry.time) {
                entry.status = DoseStatus::Taken;
            }
        }
        schedule
    }

    /// Check whether the medicine displayed as `medicine` has taken `time`.
    pub fn is_time_taken(&self, medicine: &str, time: &DoseTime) -> bool {
        self.find_by_display(medicine)
            .map(|record| record.is_taken(time))
            .unwrap_or(false)
    }

    /// Medicines below the low-stock threshold.
    pub fn low_stock(&self) -> Vec<&MedicineRecord> {
        self.records.iter().filter(|r| r.is_low_stock()).collect()
    }

    /// Mark a dose as taken on `day` and persist.
    ///
    /// Returns false when no medicine has that display string or the time is
    /// not on its schedule. Marking an already-taken dose changes nothing.
    pub fn mark_taken(&mut self, medicine: &str, time: DoseTime, day: NaiveDate) -> StoreResult<bool> {
        self.refresh();
        let Some(position) = self
            .records
            .iter()
            .position(|r| r.display_name() == medicine)
        else {
            return Ok(false);
        };

        let mut next = self.records.clone();
        if !next[position].mark_taken(time, day) {
            return Ok(false);
        }

        if next[position] != self.records[position] {
            self.commit(next)?;
            info!(medicine = %medicine, time = %time, "Dose marked taken");
        }
        Ok(true)
    }

    /// Clear taken state recorded before `day` (or with no recorded day).
    ///
    /// Returns how many medicines were reset.
    pub fn reset_taken_before(&mut self, day: NaiveDate) -> StoreResult<usize> {
        self.refresh();
        let stale = self.records.iter().filter(|r| is_stale(r, day)).count();
        if stale == 0 {
            return Ok(0);
        }

        let mut next = self.records.clone();
        for record in next.iter_mut().filter(|r| is_stale(r, day)) {
            record.clear_taken();
        }
        self.commit(next)?;

        debug!(stale, day = %day, "Reset taken doses");
        Ok(stale)
    }

    /// Totals for the dashboard cards.
    pub fn summary(&self) -> DashboardSummary {
        let schedule = self.schedule_with_status();
        DashboardSummary {
            total_medicines: self.count(),
            doses_today: schedule.len(),
            doses_taken: schedule
                .iter()
                .filter(|entry| entry.status == DoseStatus::Taken)
                .count(),
            low_stock: self.low_stock().len(),
        }
    }
}

fn is_stale(record: &MedicineRecord, day: NaiveDate) -> bool {
    let has_taken = !record.taken_times.is_empty() || !record.status_per_time.is_empty();
    has_taken && record.taken_on.map_or(true, |taken_on| taken_on < day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MedicineInput;

    fn t(s: &str) -> DoseTime {
        s.parse().unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn seeded() -> MedicineStore {
        let mut store = MedicineStore::in_memory();
        store
            .add(MedicineInput::new("Paracetamol", "500mg", 20, vec![t("20:00"), t("08:00")]))
            .unwrap();
        store
            .add(MedicineInput::new("Vitamin D", "1000IU", 5, vec![t("12:00"), t("08:00")]))
            .unwrap();
        store
    }

    #[test]
    fn test_today_schedule_sorted() {
        let store = seeded();
        let schedule = store.today_schedule();
        let rendered: Vec<String> = schedule
            .iter()
            .map(|e| format!("{} {}", e.time, e.medicine))
            .collect();
        assert_eq!(
            rendered,
            vec![
                "08:00 Paracetamol - 500mg",
                "08:00 Vitamin D - 1000IU",
                "12:00 Vitamin D - 1000IU",
                "20:00 Paracetamol - 500mg",
            ]
        );
    }

    #[test]
    fn test_raw_schedule_ignores_taken() {
        let mut store = seeded();
        store.mark_taken("Paracetamol - 500mg", t("08:00"), day(1)).unwrap();

        assert!(store
            .today_schedule()
            .iter()
            .all(|e| e.status == DoseStatus::NotTaken));

        let overlaid = store.schedule_with_status();
        assert_eq!(overlaid[0].status, DoseStatus::Taken);
        assert_eq!(overlaid[1].status, DoseStatus::NotTaken);
    }

    #[test]
    fn test_record_without_times_contributes_nothing() {
        let mut store = seeded();
        let mut empty = store.records()[0].clone();
        empty.id = 9;
        empty.times.clear();
        let mut records = store.records().to_vec();
        records.push(empty);
        store = MedicineStore::with_records(records);
        assert_eq!(store.today_schedule().len(), 4);
    }

    #[test]
    fn test_low_stock() {
        let store = seeded();
        let low: Vec<&str> = store.low_stock().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(low, vec!["Vitamin D"]);
    }

    #[test]
    fn test_mark_taken_unknown_medicine() {
        let mut store = seeded();
        assert!(!store.mark_taken("Aspirin - 100mg", t("08:00"), day(1)).unwrap());
        assert!(store.records().iter().all(|r| r.taken_times.is_empty()));
    }

    #[test]
    fn test_reset_taken_before() {
        let mut store = seeded();
        store.mark_taken("Paracetamol - 500mg", t("08:00"), day(1)).unwrap();
        store.mark_taken("Vitamin D - 1000IU", t("08:00"), day(2)).unwrap();

        assert_eq!(store.reset_taken_before(day(2)).unwrap(), 1);
        assert!(!store.is_time_taken("Paracetamol - 500mg", &t("08:00")));
        assert!(store.is_time_taken("Vitamin D - 1000IU", &t("08:00")));

        assert_eq!(store.reset_taken_before(day(2)).unwrap(), 0);
    }

    #[test]
    fn test_reset_clears_undated_taken_times() {
        let mut store = seeded();
        let mut records = store.records().to_vec();
        records[0].taken_times.insert(t("08:00"));
        store = MedicineStore::with_records(records);

        assert_eq!(store.reset_taken_before(day(1)).unwrap(), 1);
        assert!(store.records()[0].taken_times.is_empty());
    }

    #[test]
    fn test_summary() {
        let mut store = seeded();
        store.mark_taken("Vitamin D - 1000IU", t("12:00"), day(1)).unwrap();

        let summary = store.summary();
        assert_eq!(summary.total_medicines, 2);
        assert_eq!(summary.doses_today, 4);
        assert_eq!(summary.doses_taken, 1);
        assert_eq!(summary.low_stock, 1);
    }
}
