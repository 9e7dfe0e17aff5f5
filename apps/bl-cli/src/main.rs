use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use bl_demos::{
    AppResult, ConveyorControl, Demo, DemoConfig, PackingLine, WeightSorting, load_config,
    wait_all,
};
use bl_registry::Factory;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// How often the supervisor looks at the link and the clock.
const SUPERVISE_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "bl-cli")]
#[command(about = "Boxline - control sequences for a simulated factory floor", long_about = None)]
struct Cli {
    /// Path to a YAML config file (defaults apply otherwise)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Override the peer host
    #[arg(long, global = true)]
    host: Option<String>,
    /// Override the peer port
    #[arg(long, global = true)]
    port: Option<u16>,
    /// Stop after this many seconds instead of running until the link drops
    #[arg(long, global = true)]
    duration: Option<u64>,
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Keep a bounded number of boxes on each conveyor station
    Conveyor,
    /// Stack boxes onto pallets with the pick-and-place gantry
    Packing,
    /// Route boxes left, right or straight by weight
    Sorting,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => DemoConfig::default(),
    };
    if let Some(host) = cli.host {
        config.link.host = host;
    }
    if let Some(port) = cli.port {
        config.link.port = port;
    }

    let factory = Factory::new();
    let mut demos: Vec<Box<dyn Demo>> = match cli.command {
        Commands::Conveyor => config
            .conveyor
            .stations
            .iter()
            .map(|station| Box::new(ConveyorControl::new(&factory, station)) as Box<dyn Demo>)
            .collect(),
        Commands::Packing => vec![Box::new(PackingLine::new(&factory, &config.packing))],
        Commands::Sorting => vec![Box::new(WeightSorting::new(&factory, &config.sorting))],
    };

    info!(address = %config.link.address(), "Connecting to factory");
    factory.connect(&config.link)?;
    for demo in &mut demos {
        demo.start()?;
    }

    supervise(&factory, cli.duration.map(Duration::from_secs));

    for demo in &demos {
        demo.stop();
    }
    let result = wait_all(&mut demos);
    info!("Done");
    result
}

/// Block until the link drops or `limit` elapses.
fn supervise(factory: &Factory, limit: Option<Duration>) {
    let started = Instant::now();
    loop {
        if factory.is_link_lost() {
            warn!("Link to factory lost, stopping");
            return;
        }
        if limit.is_some_and(|limit| started.elapsed() >= limit) {
            info!("Run time elapsed, stopping");
            return;
        }
        thread::sleep(SUPERVISE_INTERVAL);
    }
}
