//! Alarm reconciliation integration tests.

use medimate_core::alarm::AlarmEngine;
use medimate_core::models::{DoseTime, MedicineInput, ScheduleEntry};
use medimate_core::store::MedicineStore;
use proptest::prelude::*;

fn t(s: &str) -> DoseTime {
    s.parse().unwrap()
}

fn paracetamol() -> MedicineInput {
    MedicineInput::new("Paracetamol", "500mg", 20, vec![t("08:00"), t("20:00")])
}

#[test]
fn test_paracetamol_scenario() {
    let mut store = MedicineStore::in_memory();
    store.add(paracetamol()).unwrap();
    assert_eq!(store.count(), 1);

    let schedule = store.today_schedule();
    assert_eq!(schedule.len(), 2);
    assert_eq!(schedule[0].time.to_string(), "08:00");
    assert_eq!(schedule[1].time.to_string(), "20:00");

    let mut engine = AlarmEngine::default();
    let due = engine.poll(&store, t("08:00"));
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].key().to_string(), "08:00|Paracetamol - 500mg");
    assert!(engine.poll(&store, t("08:00")).is_empty());

    let entry = ScheduleEntry::new(t("08:00"), "Paracetamol - 500mg");
    engine.acknowledge(&mut store, &entry);

    let record = &store.records()[0];
    let taken: Vec<String> = record.taken_times.iter().map(|t| t.to_string()).collect();
    assert_eq!(taken, vec!["08:00"]);
    assert!(!engine.is_armed(&entry.key()));
}

#[test]
fn test_acknowledge_twice_is_idempotent() {
    let mut store = MedicineStore::in_memory();
    store.add(paracetamol()).unwrap();
    let mut engine = AlarmEngine::default();
    let entry = ScheduleEntry::new(t("08:00"), "Paracetamol - 500mg");

    engine.poll(&store, t("08:00"));
    engine.acknowledge(&mut store, &entry);
    let once = store.records().to_vec();

    engine.acknowledge(&mut store, &entry);
    assert_eq!(store.records(), once.as_slice());
}

#[test]
fn test_no_alarm_after_acknowledge() {
    let mut store = MedicineStore::in_memory();
    store.add(paracetamol()).unwrap();
    let mut engine = AlarmEngine::default();

    let due = engine.poll(&store, t("20:00"));
    engine.acknowledge(&mut store, &due[0]);

    for _ in 0..3 {
        assert!(engine.poll(&store, t("20:00")).is_empty());
    }
    assert_eq!(engine.armed().count(), 0);
}

#[test]
fn test_acknowledge_persists_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("medicines.json");

    let mut store = MedicineStore::open(&path);
    store.add(paracetamol()).unwrap();
    let mut engine = AlarmEngine::default();
    let due = engine.poll(&store, t("08:00"));
    engine.acknowledge(&mut store, &due[0]);

    let reopened = MedicineStore::open(&path);
    assert!(reopened.is_time_taken("Paracetamol - 500mg", &t("08:00")));

    // A fresh engine (process restart) does not re-arm the taken dose.
    let mut engine = AlarmEngine::default();
    assert!(engine.poll(&reopened, t("08:00")).is_empty());
}

fn dose_time() -> impl Strategy<Value = DoseTime> {
    (0u32..24, 0u32..60).prop_map(|(h, m)| DoseTime::from_hm(h, m).unwrap())
}

proptest! {
    #[test]
    fn prop_repeated_polls_signal_each_pair_once(
        times in prop::collection::vec(dose_time(), 1..6),
        now in dose_time(),
        repeats in 1usize..5,
    ) {
        let mut store = MedicineStore::in_memory();
        store.add(MedicineInput::new("Aspirin", "100mg", 30, times.clone())).unwrap();
        store.add(MedicineInput::new("Metformin", "850mg", 30, times.clone())).unwrap();

        let mut engine = AlarmEngine::default();
        let mut total = 0;
        for _ in 0..repeats {
            total += engine.poll(&store, now).len();
        }

        let expected = if times.contains(&now) { 2 } else { 0 };
        prop_assert_eq!(total, expected);
        prop_assert_eq!(engine.armed().count(), expected);
    }
}
