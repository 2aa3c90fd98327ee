//! Scheduled faults driven through the simulated plant.

use ft_config::presets;
use ft_controls::{FlowPath, LogTag, MemorySink};
use ft_plant::FaultKind;
use ft_sim::{NoSleep, RunRecord, SimConfig, simulate};

fn run_injected(cycles: u64, specs: &[&str]) -> (RunRecord, MemorySink) {
    let config = SimConfig::with_cycles(cycles).inject(specs).unwrap();
    let mut log = MemorySink::new();
    let record = simulate(&presets::compact(), &config, &mut log, NoSleep::new()).unwrap();
    (record, log)
}

#[test]
fn stalled_primary_fails_over_to_secondary() {
    let (record, log) = run_injected(6, &["stall-flow@2+3"]);

    assert!(!record.halted());
    assert_eq!(record.reports[1].active_path, FlowPath::Primary);
    let stalled = &record.reports[2];
    assert_eq!(stalled.active_path, FlowPath::Secondary);
    assert!(stalled.status.is_warning());
    assert!(stalled.flow_rate > 0.4);
    assert!(
        record.reports[2..]
            .iter()
            .all(|r| r.active_path == FlowPath::Secondary)
    );
    assert!(log.contains(LogTag::Status, "flow switched to secondary path"));
}

#[test]
fn total_stall_halts_the_controller() {
    let config = SimConfig::with_cycles(20)
        .inject(["stall-flow:all@3+100"])
        .unwrap();
    let mut log = MemorySink::new();
    let mut sleeper = NoSleep::new();
    let record = simulate(&presets::compact(), &config, &mut log, &mut sleeper).unwrap();

    assert!(record.halted());
    assert_eq!(record.cycles_run, 4);
    assert_eq!(record.reports.len(), 4);
    assert!(record.final_status.is_critical());
    assert!(
        record
            .shutdown_reason
            .as_deref()
            .is_some_and(|r| r.contains("LowFlow"))
    );
    // No sleep after the halting cycle.
    assert_eq!(sleeper.calls(), 3);
    assert!(log.contains(LogTag::Error, "shutting down"));
}

#[test]
fn generator_fault_recovers_at_reduced_output() {
    let (record, log) = run_injected(4, &["generator:1@2"]);

    let before = record.reports[1].point_power_w[0];
    let during = record.reports[2].point_power_w[0];
    let after = record.reports[3].point_power_w[0];
    assert!(during > 0.0);
    assert!(during < 0.1 * before);
    assert!(after > 0.5 * before);
    assert!(!record.reports[2].status.is_fault());
    assert!(log.contains(LogTag::Error, "GeneratorFailure(point 1)"));
}

#[test]
fn hot_magnet_is_derated() {
    let (record, log) = run_injected(5, &["magnet-overheat:1@2+2"]);

    assert!(record.reports[2].status.is_warning());
    assert!(record.reports[2].magnet_power_w < record.reports[1].magnet_power_w);
    assert!(log.contains(LogTag::Warning, "magnet at point 1"));
    assert!(!record.halted());
}

#[test]
fn overheated_cpu_is_cooled_and_throttled() {
    let (record, log) = run_injected(5, &["overheat:cpu@2+3"]);

    assert!(!record.reports[1].cpu_throttled);
    let hot = &record.reports[2];
    assert!(hot.cpu_throttled);
    assert!(!hot.gpu_throttled);
    assert_eq!(hot.cpu_w, 17.5);
    assert!(!hot.status.is_fault(), "forced cooling recovers");
    assert!(log.contains(LogTag::Diagnostic, "cpu at"));
    assert!(log.contains(LogTag::Error, "Overheat(cpu)"));

    // Cooling holds the CPU under its limit once the storage band releases it.
    assert!(!record.reports[3].cpu_throttled);
    assert!(log.contains(LogTag::Status, "cpu released"));
}

#[test]
fn faded_battery_is_seen_at_the_next_poll() {
    let (record, log) = run_injected(12, &["battery-fade:0.5@3"]);

    assert!(record.reports[9].storage_capacity_wh > 59.0);
    let polled = &record.reports[10];
    assert!(polled.storage_capacity_wh < 30.001);
    assert!(polled.storage_level_wh <= polled.storage_capacity_wh);
    assert!(polled.status.is_warning());
    assert!(log.contains(LogTag::Warning, "battery degraded"));
    assert!(
        record
            .reports
            .iter()
            .all(|r| !matches!(r.status.fault(), Some(FaultKind::LowStorage { .. })))
    );
}
