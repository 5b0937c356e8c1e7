use anyhow::{Context, Result};
use cas9_search_core::metrics::TimeHistogram;
use cas9_search_core::sweep::StepRange;
use cas9_search_core::{run_sweep, RunSummary, SimConfig, SweepGrid, SweepRow, World};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const HISTOGRAM_BAR_WIDTH: usize = 40;

#[derive(Parser)]
#[command(name = "cas9-search")]
#[command(about = "Cas9 target-search simulation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one batch experiment and report kill density and event histograms
    Run {
        /// Path to config file (JSON); defaults are used when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for summary.json (optional)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Override the experiment duration in seconds
        #[arg(long)]
        duration: Option<f64>,
    },
    /// Sweep junk count against Cas9 = virus count and write a TSV table
    Sweep {
        /// Path to base config file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output TSV file
        #[arg(long, default_value = "batch_results.txt")]
        out: PathBuf,

        /// Worker threads (default: all cores)
        #[arg(long)]
        threads: Option<usize>,

        /// Junk counts as start:end:step (end exclusive)
        #[arg(long, value_parser = parse_step_range)]
        junk: Option<StepRange>,

        /// Cas9/virus counts as start:end:step (end exclusive)
        #[arg(long, value_parser = parse_step_range)]
        cas9_virus: Option<StepRange>,
    },
    /// Run in real time, paced by the wall clock, printing a status line
    Live {
        /// Path to config file (JSON); the 20 s interactive preset otherwise
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        junk: Option<usize>,

        #[arg(long)]
        virus: Option<usize>,

        #[arg(long)]
        cas9: Option<usize>,

        /// Cas9 speed per tick (1-20 is a sensible range)
        #[arg(long)]
        speed: Option<f64>,
    },
    /// Dump the default configuration to stdout
    DumpDefaultConfig,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_step_range(s: &str) -> Result<StepRange, String> {
    let parts: Vec<&str> = s.split(':').collect();
    let [start, end, step] = parts.as_slice() else {
        return Err(format!("expected start:end:step, got {s:?}"));
    };
    let parse = |v: &str| {
        v.trim()
            .parse::<usize>()
            .map_err(|e| format!("invalid number {v:?}: {e}"))
    };
    let range = StepRange {
        start: parse(*start)?,
        end: parse(*end)?,
        step: parse(*step)?,
    };
    if range.step == 0 {
        return Err("step must be positive".to_string());
    }
    Ok(range)
}

fn load_config(path: Option<&Path>, fallback: SimConfig) -> Result<SimConfig> {
    let config = match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open config file {}", path.display()))?;
            let config: SimConfig = serde_json::from_reader(BufReader::new(file))
                .context("failed to parse config")?;
            println!("Loaded config from {:?}", path);
            config
        }
        None => fallback,
    };
    config.validate().context("Config validation error")?;
    Ok(config)
}

fn print_histogram(title: &str, hist: &TimeHistogram) {
    println!("{title}");
    let max = hist.counts.iter().copied().max().unwrap_or(0).max(1);
    for (label, &count) in hist.labels().iter().zip(&hist.counts) {
        let bar = "#".repeat(count * HISTOGRAM_BAR_WIDTH / max);
        println!("  {label:>7} s | {count:>5} {bar}");
    }
}

fn print_summary(summary: &RunSummary) {
    println!(
        "Initial: junk={} virus={} cas9={}",
        summary.initial_junk, summary.initial_virus, summary.initial_cas9
    );
    println!(
        "Kills: {}  Junk checks: {}  Failed recognitions: {}",
        summary.kills, summary.junk_checks, summary.failed_recognitions
    );
    println!("Virus kill density: {:.6}", summary.kill_density);
    let width = summary.capture_histogram.bin_width;
    print_histogram(
        &format!("Cas9 virus kills per {width} s"),
        &summary.capture_histogram,
    );
    print_histogram(
        &format!("Cas9 junk-DNA checks per {width} s"),
        &summary.check_histogram,
    );
}

fn write_summary(out_dir: &Path, summary: &RunSummary) -> Result<()> {
    std::fs::create_dir_all(out_dir).context("failed to create output directory")?;
    let summary_path = out_dir.join("summary.json");
    let file = File::create(summary_path).context("failed to create summary file")?;
    serde_json::to_writer_pretty(file, summary).context("failed to write summary")?;
    Ok(())
}

fn write_sweep_tsv<W: Write>(mut writer: W, rows: &[SweepRow]) -> std::io::Result<()> {
    writeln!(writer, "init_cas9_virus\tinit_junk\tvirus_kill_density")?;
    for row in rows {
        writeln!(
            writer,
            "{}\t{}\t{:.6}",
            row.init_cas9_virus, row.init_junk, row.virus_kill_density
        )?;
    }
    writer.flush()
}

fn run_live(config: SimConfig) -> Result<()> {
    let mut world = World::new(config.clone()).context("failed to initialize world")?;
    let tick = Duration::from_secs_f64(config.dt);
    let start = Instant::now();
    let mut last_report = -1i64;
    println!("Experiment Running...");
    loop {
        let tick_started = Instant::now();
        let elapsed = start.elapsed().as_secs_f64();
        if elapsed >= config.experiment_duration {
            break;
        }
        world.step_at(elapsed);

        let whole_seconds = elapsed as i64;
        if whole_seconds != last_report {
            last_report = whole_seconds;
            let stats = world.population_stats();
            println!(
                "Time: {:02}:{:02}  Junk: {}  |  Virus: {}  |  Free Cas9: {}",
                whole_seconds / 60,
                whole_seconds % 60,
                stats.junk,
                stats.virus,
                stats.free_cas9
            );
        }

        thread::sleep(tick.saturating_sub(tick_started.elapsed()));
    }
    println!("Experiment Complete");
    let summary = world.summary();
    if summary.capture_times.is_empty() && summary.check_times.is_empty() {
        warn!("no kills or junk checks were recorded");
    }
    print_summary(&summary);
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::DumpDefaultConfig => {
            let config = SimConfig::default();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Run {
            config,
            out,
            duration,
        } => {
            let mut sim_config = load_config(config.as_deref(), SimConfig::default())?;
            if let Some(duration) = duration {
                sim_config.experiment_duration = duration;
                sim_config.validate().context("Config validation error")?;
            }
            println!(
                "Simulating {} s of model time (dt = {} s)...",
                sim_config.experiment_duration, sim_config.dt
            );
            let mut world = World::new(sim_config).context("failed to initialize world")?;
            let summary = world.run_to_completion();
            print_summary(&summary);

            if let Some(out_dir) = out {
                write_summary(&out_dir, &summary)?;
                println!("Run complete. Results saved to {:?}", out_dir);
            }
        }
        Commands::Sweep {
            config,
            out,
            threads,
            junk,
            cas9_virus,
        } => {
            let base = load_config(config.as_deref(), SimConfig::default())?;
            if let Some(n) = threads {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build_global()
                    .context("failed to configure thread pool")?;
            }
            let defaults = SweepGrid::default();
            let grid = SweepGrid {
                junk: junk.unwrap_or(defaults.junk),
                cas9_virus: cas9_virus.unwrap_or(defaults.cas9_virus),
            };
            let n_runs = grid.points().len();
            info!(runs = n_runs, threads = rayon::current_num_threads(), "starting sweep");
            let started = Instant::now();
            let rows = run_sweep(&base, &grid).context("sweep failed")?;

            for row in &rows {
                println!(
                    "Junk={:3}, Cas9/Virus={:2}, kill_density={:.3}",
                    row.init_junk, row.init_cas9_virus, row.virus_kill_density
                );
            }
            let file = File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            write_sweep_tsv(BufWriter::new(file), &rows).context("failed to write sweep results")?;
            info!(elapsed_s = started.elapsed().as_secs_f64(), "sweep finished");
            println!("\nAll simulations complete. Results saved to {}", out.display());
        }
        Commands::Live {
            config,
            junk,
            virus,
            cas9,
            speed,
        } => {
            let mut sim_config = load_config(config.as_deref(), SimConfig::interactive())?;
            if let Some(n) = junk {
                sim_config.num_junk = n;
            }
            if let Some(n) = virus {
                sim_config.num_virus = n;
            }
            if let Some(n) = cas9 {
                sim_config.num_cas9 = n;
            }
            if let Some(speed) = speed {
                sim_config.cas9_speed = speed;
            }
            sim_config.validate().context("Config validation error")?;
            run_live(sim_config)?;
        }
    }
    Ok(())
}
