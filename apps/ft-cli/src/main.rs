use clap::{Parser, Subcommand};
use ft_config::PlantProfile;
use ft_controls::{LogTag, MemorySink, TeeSink, TracingSink};
use ft_sim::{
    CycleEvent, NoSleep, RunRecord, SimConfig, SimResult, Sleeper, ThreadSleeper,
    simulate_with_progress,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ft-cli")]
#[command(about = "Ferrotherm CLI - heat-to-power plant controller", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the controller against a simulated plant
    Run {
        /// Built-in profile to run
        #[arg(long, conflicts_with = "profile", default_value = "compact")]
        preset: String,
        /// Profile file (YAML, or JSON by extension)
        #[arg(long)]
        profile: Option<PathBuf>,
        /// Number of cycles to run
        #[arg(long, default_value_t = 100)]
        cycles: u64,
        /// Keep cycling until the controller halts
        #[arg(long, conflicts_with = "cycles")]
        until_halt: bool,
        /// Sleep for the real cycle time between cycles
        #[arg(long)]
        realtime: bool,
        /// Print the run record as JSON
        #[arg(long)]
        json: bool,
        /// Keep only every N-th cycle report
        #[arg(long, default_value_t = 1)]
        record_every: u64,
        /// Scheduled fault, e.g. stall-flow@10+5 or generator:2@20 (repeatable)
        #[arg(long = "inject", value_name = "SPEC")]
        injections: Vec<String>,
    },
    /// Validate a profile file
    Validate {
        /// Path to the profile file
        profile_path: PathBuf,
    },
    /// List built-in profiles
    Presets,
    /// Write a built-in profile to a file for editing
    ExportPreset {
        /// Preset name
        name: String,
        /// Output file (YAML, or JSON by extension)
        output: PathBuf,
    },
}

fn main() -> SimResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            preset,
            profile,
            cycles,
            until_halt,
            realtime,
            json,
            record_every,
            injections,
        } => {
            let profile = match profile {
                Some(path) => ft_config::load_profile(&path)?,
                None => ft_config::preset(&preset)?,
            };
            let mut config = SimConfig::default().inject(&injections)?;
            config.options.max_cycles = if until_halt { None } else { Some(cycles) };
            config.options.record_every = record_every;
            cmd_run(&profile, &config, realtime, json)
        }
        Commands::Validate { profile_path } => cmd_validate(&profile_path),
        Commands::Presets => cmd_presets(),
        Commands::ExportPreset { name, output } => cmd_export_preset(&name, &output),
    }
}

fn cmd_run(profile: &PlantProfile, config: &SimConfig, realtime: bool, json: bool) -> SimResult<()> {
    if !json {
        println!("Running profile '{}' ({} thermal points)", profile.name, profile.point_count());
        for injection in &config.injections {
            println!("  injecting {injection}");
        }
    }

    let mut thread_sleeper = ThreadSleeper;
    let mut fast = NoSleep::new();
    let sleeper: &mut dyn Sleeper = if realtime {
        &mut thread_sleeper
    } else {
        &mut fast
    };

    tracing::debug!(options = ?config.options, realtime, "starting controller");
    let started = Instant::now();
    let mut faulted_cycles = 0u64;
    let mut on_event = |event: CycleEvent<'_>| {
        if let CycleEvent::Finished { report } = event {
            if report.status.is_fault() || report.status.is_critical() {
                faulted_cycles += 1;
            }
        }
    };
    let mut log = TeeSink::new(TracingSink, MemorySink::new());
    let record = simulate_with_progress(
        profile,
        config,
        &mut log,
        sleeper,
        Some(&mut on_event),
    )?;

    if json {
        println!("{}", record.to_json()?);
    } else {
        print_summary(&record, &log.second, faulted_cycles, started.elapsed().as_secs_f64());
    }
    Ok(())
}

fn print_summary(record: &RunRecord, log: &MemorySink, faulted_cycles: u64, wall_s: f64) {
    match &record.shutdown_reason {
        Some(reason) => println!("\n✗ Controller halted: {reason}"),
        None => println!("\n✓ Run completed"),
    }
    println!("  Cycles:        {}", record.cycles_run);
    println!("  Faulted:       {faulted_cycles}");
    println!(
        "  Log:           {} warnings, {} errors",
        log.with_tag(LogTag::Warning).count(),
        log.with_tag(LogTag::Error).count()
    );
    println!("  Final status:  {}", record.final_status);
    println!("  Final storage: {:.3} Wh", record.final_level_wh);

    if let Some(last) = record.last_report() {
        println!("  Last mode:     {} ({})", last.mode_name, last.mode);
        println!("  Last cycle:    {}", last.summary());
    }

    let reports = &record.reports;
    if !reports.is_empty() {
        let n = reports.len() as f64;
        let generated = reports.iter().map(|r| r.generated_w).sum::<f64>() / n;
        let consumed = reports.iter().map(|r| r.consumption_w).sum::<f64>() / n;
        println!("\nAverages over {} recorded cycles:", reports.len());
        println!("  Generated: {generated:.2} W");
        println!("  Consumed:  {consumed:.2} W");
        println!("  Coverage:  {:.1}%", 100.0 * ft_core::unit_ratio(generated, consumed));
    }
    println!("  Wall time: {wall_s:.3}s");
}

fn cmd_validate(profile_path: &Path) -> SimResult<()> {
    println!("Validating profile: {}", profile_path.display());
    let profile = ft_config::load_profile(profile_path)?;
    println!(
        "✓ Profile '{}' is valid ({} thermal points)",
        profile.name,
        profile.point_count()
    );
    Ok(())
}

fn cmd_presets() -> SimResult<()> {
    println!("Built-in profiles:");
    for name in ft_config::PRESET_NAMES {
        let profile = ft_config::preset(name)?;
        println!(
            "  {} - {} points, {:.0} Wh storage, {:.0} W full load",
            name,
            profile.point_count(),
            profile.storage.capacity_wh,
            profile.load.full_mode.total_w()
        );
    }
    Ok(())
}

fn cmd_export_preset(name: &str, output: &Path) -> SimResult<()> {
    let profile = ft_config::preset(name)?;
    match output.extension().and_then(|e| e.to_str()) {
        Some("json") => ft_config::save_json(output, &profile)?,
        _ => ft_config::save_yaml(output, &profile)?,
    }
    println!("✓ Wrote preset '{}' to {}", name, output.display());
    Ok(())
}
