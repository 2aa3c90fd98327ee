//! Closed-loop runs of the controller against the simulated plant.

use ft_config::{PlantProfile, presets};
use ft_controls::{LogTag, MemorySink};
use ft_plant::{BootSource, FaultKind, ModeKind};
use ft_sim::{CycleEvent, NoSleep, RunRecord, SimConfig, simulate, simulate_with_progress};

fn run(profile: &PlantProfile, cycles: u64) -> (RunRecord, MemorySink) {
    let mut log = MemorySink::new();
    let record = simulate(profile, &SimConfig::with_cycles(cycles), &mut log, NoSleep::new())
        .expect("run should start");
    (record, log)
}

#[test]
fn compact_runs_nominally() {
    let profile = presets::compact();
    let (record, log) = run(&profile, 20);

    assert_eq!(record.cycles_run, 20);
    assert_eq!(record.reports.len(), 20);
    assert!(!record.halted());
    assert!(matches!(record.boot, BootSource::Storage { .. }));
    for (i, report) in record.reports.iter().enumerate() {
        assert_eq!(report.cycle, i as u64);
        assert_eq!(report.point_heat_w.len(), 2);
        assert!(!report.status.blocks_load(), "cycle {i}: {}", report.status);
        assert_eq!(report.mode, ModeKind::Full);
        assert!(report.generated_w > 0.0);
        assert!(report.storage_level_wh >= 0.0);
        assert!(report.storage_level_wh <= report.storage_capacity_wh);
    }
    // The compact build cannot cover its full load from heat alone.
    assert!(record.final_level_wh < profile.storage.initial_level_wh);
    assert!(log.contains(LogTag::Status, "booted from storage"));
    assert!(log.contains(LogTag::Status, "controller stopped after 20 cycles"));
}

#[test]
fn tower_runs_nominally() {
    let (record, _) = run(&presets::tower(), 15);

    assert_eq!(record.cycles_run, 15);
    assert!(!record.halted());
    let last = record.last_report().unwrap();
    assert_eq!(last.point_heat_w.len(), 4);
    assert_eq!(last.point_power_w.len(), 4);
    assert!(last.point_power_w.iter().all(|&p| p > 0.0));
    assert!(record.reports.iter().all(|r| !r.status.blocks_load()));
}

#[test]
fn waste_heat_returns_to_the_first_point() {
    let (record, _) = run(&presets::compact(), 3);
    // Cycle 0 sees no recirculated heat; cycle 1 does.
    assert!(record.reports[1].point_heat_w[0] > record.reports[0].point_heat_w[0]);
}

#[test]
fn every_cycle_is_summarized() {
    let (record, log) = run(&presets::compact(), 5);
    let summaries = log
        .with_tag(LogTag::Status)
        .filter(|e| e.message.starts_with("cycle "))
        .count();
    assert_eq!(summaries, 5);
    assert!(log.contains(LogTag::Diagnostic, "primary path"));
    assert!(record.reports[0].summary().contains("deficit"));
}

#[test]
fn decimated_records_keep_the_last_cycle() {
    let mut config = SimConfig::with_cycles(10);
    config.options.record_every = 4;
    let mut log = MemorySink::new();
    let record = simulate(&presets::compact(), &config, &mut log, NoSleep::new()).unwrap();

    let cycles: Vec<u64> = record.reports.iter().map(|r| r.cycle).collect();
    assert_eq!(cycles, vec![0, 4, 8, 9]);
    assert_eq!(record.cycles_run, 10);
}

#[test]
fn sleeps_between_cycles_but_not_after_the_last() {
    let mut log = MemorySink::new();
    let mut sleeper = NoSleep::new();
    simulate(&presets::compact(), &SimConfig::with_cycles(6), &mut log, &mut sleeper).unwrap();
    assert_eq!(sleeper.calls(), 5);
    assert_eq!(sleeper.total().as_secs_f64(), 5.0);
}

#[test]
fn boots_from_ac_when_storage_is_short() {
    let mut profile = presets::compact();
    profile.storage.initial_level_wh = 0.2;
    let (record, log) = run(&profile, 3);

    match record.boot {
        BootSource::Ac { power_w } => assert!((power_w - 65.0 * 0.88).abs() < 1e-9),
        other => panic!("expected AC boot, got {other:?}"),
    }
    assert!(log.contains(LogTag::Status, "booting from AC"));
}

#[test]
fn starved_storage_idles_and_raises_low_storage() {
    let mut profile = presets::compact();
    profile.storage.initial_level_wh = 0.52;
    let (record, log) = run(&profile, 20);

    assert!(!record.halted(), "low storage is not critical");
    assert!(record.reports.iter().all(|r| r.mode == ModeKind::Idle));
    assert!(record.reports.iter().all(|r| r.storage_level_wh >= 0.0));
    assert!(record.final_level_wh < 1e-9);

    let first = record
        .reports
        .iter()
        .position(|r| matches!(r.status.fault(), Some(FaultKind::LowStorage { .. })))
        .expect("storage should run out");
    assert!(first + 1 < record.reports.len());
    // A degraded cycle slows the loop to the fault cadence.
    assert_eq!(record.reports[0].interval_s, profile.schedule.cycle_time_s);
    assert!(record.reports[0].status.is_degraded());
    assert_eq!(
        record.reports[first + 1].interval_s,
        profile.schedule.fault_cycle_time_s
    );
    assert!(log.contains(LogTag::Warning, "at or below minimum"));
    assert!(log.contains(LogTag::Error, "LowStorage"));
}

#[test]
fn run_record_serializes_to_json() {
    let (record, _) = run(&presets::compact(), 2);
    let json = record.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["profile"], "compact");
    assert_eq!(value["cycles_run"], 2);
    assert_eq!(value["boot"]["source"], "storage");
    assert_eq!(value["reports"].as_array().unwrap().len(), 2);
    assert_eq!(value["reports"][0]["active_path"], "primary");
    assert!(value["shutdown_reason"].is_null());
}

#[test]
fn progress_sees_every_cycle_in_order() {
    let mut events = Vec::new();
    let mut on_event = |event: CycleEvent<'_>| match event {
        CycleEvent::Started { cycle } => events.push(("start", cycle)),
        CycleEvent::Finished { report } => events.push(("finish", report.cycle)),
    };
    let mut log = MemorySink::new();
    simulate_with_progress(
        &presets::compact(),
        &SimConfig::with_cycles(3),
        &mut log,
        NoSleep::new(),
        Some(&mut on_event),
    )
    .unwrap();

    assert_eq!(
        events,
        vec![
            ("start", 0),
            ("finish", 0),
            ("start", 1),
            ("finish", 1),
            ("start", 2),
            ("finish", 2),
        ]
    );
}
