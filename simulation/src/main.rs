//! Starmesh - LEO constellation forwarding simulation
//!
//! Runs the per-satellite decision engines over a simulated +Grid
//! constellation and prints delivery statistics.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use starmesh_core::NodeId;
use starmesh_logging::{FileConfig, LogConfig, StarmeshSubscriberBuilder};
use starmesh_routing::{MetricKind, Strategy};

use starmesh_simulation::{ConstellationBuilder, SimConfig, SimReport, Simulation};

#[derive(Parser)]
#[command(
    name = "starmesh-sim",
    about = "LEO constellation simulation with adaptive per-satellite forwarding",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write JSONL logs into this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Adaptive,
    Distance,
    Queue,
    Bandwidth,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Adaptive => Strategy::AdaptivePolicy,
            StrategyArg::Distance => Strategy::StaticMetric(MetricKind::ShortestDistance),
            StrategyArg::Queue => Strategy::StaticMetric(MetricKind::ShortestQueue),
            StrategyArg::Bandwidth => Strategy::StaticMetric(MetricKind::MaximumBandwidth),
        }
    }
}

#[derive(clap::Args)]
struct ScenarioArgs {
    /// JSON scenario file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulated duration in milliseconds
    #[arg(short, long)]
    duration_ms: Option<u64>,

    #[arg(short, long)]
    seed: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl ScenarioArgs {
    fn load(&self) -> anyhow::Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => SimConfig::from_file(path)?,
            None => SimConfig::default(),
        };
        if let Some(ms) = self.duration_ms {
            config = config.with_duration(Duration::from_millis(ms));
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scenario with a single strategy
    Run {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Strategy installed on every satellite
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Keep the policy not-ready for this many milliseconds
        #[arg(long)]
        warmup_ms: Option<u64>,
    },

    /// Run the same scenario under every strategy
    Compare {
        #[command(flatten)]
        scenario: ScenarioArgs,
    },

    /// Visualize a constellation and optionally dump one forwarding table
    Topology {
        #[arg(short, long, default_value = "6")]
        orbits: u32,

        #[arg(short, long, default_value = "11")]
        per_orbit: u32,

        #[arg(short, long, default_value = "12")]
        terminals: u32,

        /// Satellite whose forwarding state to print
        #[arg(long)]
        dump: Option<u32>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut logging = StarmeshSubscriberBuilder::new()
        .with_config(LogConfig::development())
        .with_level(if cli.verbose { "debug" } else { "info" });
    if let Some(dir) = &cli.log_dir {
        logging = logging.with_file_output(FileConfig {
            directory: dir.clone(),
            ..Default::default()
        });
    }
    let _guard = logging.init()?;

    match cli.command {
        Commands::Run {
            scenario,
            strategy,
            warmup_ms,
        } => {
            let mut config = scenario.load()?;
            if let Some(strategy) = strategy {
                config = config.with_strategy(strategy.into());
            }
            if let Some(ms) = warmup_ms {
                config.policy.warmup_ms = ms;
            }
            let report = Simulation::new(config)?.run()?;
            print_report(&report, scenario.json)?;
        }
        Commands::Compare { scenario } => {
            let base = scenario.load()?;
            let mut reports = Vec::new();
            for arg in [
                StrategyArg::Distance,
                StrategyArg::Queue,
                StrategyArg::Bandwidth,
                StrategyArg::Adaptive,
            ] {
                let config = base.clone().with_strategy(arg.into());
                reports.push(Simulation::new(config)?.run()?);
            }
            if scenario.json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                print_comparison(&reports);
            }
        }
        Commands::Topology {
            orbits,
            per_orbit,
            terminals,
            dump,
        } => {
            let constellation = ConstellationBuilder::new(orbits, per_orbit)
                .with_ground_terminals(terminals)
                .torus();
            println!("{}", constellation.visualize());
            if let Some(sat) = dump {
                let tables = constellation.static_tables();
                match tables.get(&NodeId(sat)) {
                    Some(table) => print!("{table}"),
                    None => eprintln!("Unknown satellite: {sat}"),
                }
            }
        }
    }

    Ok(())
}

fn print_report(report: &SimReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

fn print_comparison(reports: &[SimReport]) {
    println!(
        "{:<28} {:>10} {:>10} {:>8} {:>8} {:>8}",
        "strategy", "delivered", "latency", "hops", "dropped", "queries"
    );
    for report in reports {
        let n = &report.network;
        println!(
            "{:<28} {:>9.1}% {:>8.2}ms {:>8.2} {:>8} {:>8}",
            report.strategy,
            n.delivery_ratio() * 100.0,
            n.mean_latency_ms(),
            n.mean_hops(),
            n.dropped(),
            report.engines.policy_queries
        );
    }
}
