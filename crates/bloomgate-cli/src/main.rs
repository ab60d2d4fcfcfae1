mod config;
mod report;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use bloomgate_core::{generate, run_benchmark, BackingStore, BulkLoader, Entry, GatedCache};
use bloomgate_store::{BloomMembership, MemoryStore, RedisStore};

use config::{Config, PayloadKind, StoreKind};
use report::{format_duration, print_summary, report_json, TextReporter};

#[derive(Parser)]
#[command(
    name = "bloomgate",
    version,
    about = "Measure how much a Bloom filter in front of a key-value cache cuts lookup latency"
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Populate the store, then time lookups with the filter on and off
    Run(RunArgs),

    /// Check that the backing store answers
    Ping {
        /// Store endpoint (host:port or redis:// URL)
        #[arg(short, long)]
        endpoint: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the config file path and the effective settings
    Show,
}

#[derive(Args, Default)]
struct RunArgs {
    /// Backing store implementation
    #[arg(long, value_enum)]
    store: Option<StoreKind>,

    /// Store endpoint (host:port or redis:// URL)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Simulated round trip per call in microseconds (memory store)
    #[arg(long)]
    latency_us: Option<u64>,

    /// Number of entries to populate
    #[arg(short = 'n', long)]
    entries: Option<usize>,

    /// Payload size in bytes
    #[arg(long)]
    value_size: Option<usize>,

    /// Payload shape
    #[arg(long, value_enum)]
    payload: Option<PayloadKind>,

    /// Entry time-to-live in seconds
    #[arg(long)]
    ttl: Option<u64>,

    /// Lookups per trial
    #[arg(short, long)]
    requests: Option<usize>,

    /// Trials per filter mode
    #[arg(long)]
    runs: Option<usize>,

    /// Probability that a lookup targets a populated key
    #[arg(long)]
    hit_ratio: Option<f64>,

    /// Number of distinct out-of-range keys misses are drawn from
    #[arg(long)]
    miss_span: Option<usize>,

    /// In-flight write ceiling while populating
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Filter capacity
    #[arg(long)]
    expected_entries: Option<usize>,

    /// Filter target false-positive rate
    #[arg(long)]
    fp_rate: Option<f64>,

    /// Seed for key sampling (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl RunArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(v) = self.store {
            config.store.kind = v;
        }
        if let Some(v) = &self.endpoint {
            config.store.endpoint = v.clone();
        }
        if let Some(v) = self.latency_us {
            config.store.latency_us = v;
        }
        if let Some(v) = self.entries {
            config.workload.entries = v;
        }
        if let Some(v) = self.value_size {
            config.workload.value_size = v;
        }
        if let Some(v) = self.payload {
            config.workload.payload = v;
        }
        if let Some(v) = self.ttl {
            config.workload.ttl_secs = v;
        }
        if let Some(v) = self.requests {
            config.bench.requests = v;
        }
        if let Some(v) = self.runs {
            config.bench.runs = v;
        }
        if let Some(v) = self.hit_ratio {
            config.bench.hit_ratio = v;
        }
        if let Some(v) = self.miss_span {
            config.bench.miss_span = v;
        }
        if let Some(v) = self.concurrency {
            config.bench.concurrency = v;
        }
        if let Some(v) = self.expected_entries {
            config.filter.expected_entries = v;
        }
        if let Some(v) = self.fp_rate {
            config.filter.false_positive_rate = v;
        }
        if self.seed.is_some() {
            config.bench.seed = self.seed;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run(args) => {
            args.apply(&mut config);
            cmd_run(&config, args.json).await
        }
        Commands::Ping { endpoint } => {
            if let Some(e) = endpoint {
                config.store.endpoint = e;
            }
            cmd_ping(&config).await
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => cmd_config_show(&config, cli.config.as_deref()),
        },
    }
}

// ---------------------------------------------------------------------------
// Benchmark
// ---------------------------------------------------------------------------

async fn cmd_run(config: &Config, json: bool) -> Result<()> {
    config.validate()?;

    let entries: Arc<[Entry]> = generate(&config.workload_spec())?.into();
    let filter = BloomMembership::new(
        config.filter.expected_entries,
        config.filter.false_positive_rate,
    )?;
    let loader = BulkLoader::new(config.bench.concurrency)?;

    let seed = config.bench.seed.unwrap_or_else(rand::random);
    info!(seed, "key sampling seed");

    match config.store.kind {
        StoreKind::Redis => {
            let store = RedisStore::connect(&config.store.endpoint)
                .await
                .with_context(|| format!("connecting to {}", config.store.endpoint))?;
            run_with(store, filter, entries, &loader, config, seed, json).await
        }
        StoreKind::Memory => {
            let store = MemoryStore::with_latency(Duration::from_micros(config.store.latency_us));
            run_with(store, filter, entries, &loader, config, seed, json).await
        }
    }
}

async fn run_with<S: BackingStore + 'static>(
    store: S,
    filter: BloomMembership,
    entries: Arc<[Entry]>,
    loader: &BulkLoader,
    config: &Config,
    seed: u64,
    json: bool,
) -> Result<()> {
    if !json {
        println!(
            "Benchmark: {} entries, {} runs x {} lookups, {:.0}% hits, seed {seed}",
            config.workload.entries,
            config.bench.runs,
            config.bench.requests,
            config.bench.hit_ratio * 100.0
        );
        println!(
            "Filter: {} expected keys, {:.2}% target false positives, {} bits",
            filter.expected_entries(),
            filter.false_positive_rate() * 100.0,
            filter.bits()
        );
    }

    let cache = Arc::new(GatedCache::new(store, filter));
    let mut rng = StdRng::seed_from_u64(seed);
    let plan = config.bench_plan();

    if json {
        let report = run_benchmark(cache, entries, loader, plan, &mut rng, &mut ())
            .await
            .context("benchmark aborted")?;
        println!("{}", serde_json::to_string_pretty(&report_json(&report, seed))?);
    } else {
        let report = run_benchmark(cache, entries, loader, plan, &mut rng, &mut TextReporter)
            .await
            .context("benchmark aborted")?;
        print_summary(&report);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Ping
// ---------------------------------------------------------------------------

async fn cmd_ping(config: &Config) -> Result<()> {
    match config.store.kind {
        StoreKind::Redis => {
            let store = RedisStore::connect(&config.store.endpoint)
                .await
                .with_context(|| format!("connecting to {}", config.store.endpoint))?;
            let rtt = store.ping().await?;
            println!("{}: PONG in {}", store.url(), format_duration(rtt));
        }
        StoreKind::Memory => {
            println!(
                "memory store: in-process, simulated latency {}",
                format_duration(Duration::from_micros(config.store.latency_us))
            );
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn cmd_config_show(config: &Config, explicit: Option<&std::path::Path>) -> Result<()> {
    println!("Config: {}", config::show_config_path(explicit));
    println!();
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run_overrides() {
        let cli = Cli::try_parse_from([
            "bloomgate",
            "run",
            "--store",
            "memory",
            "-n",
            "10",
            "--runs",
            "1",
            "--requests",
            "20",
            "--seed",
            "5",
            "--json",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.store.kind, StoreKind::Memory);
        assert_eq!(config.workload.entries, 10);
        assert_eq!(config.bench.runs, 1);
        assert_eq!(config.bench.requests, 20);
        assert_eq!(config.bench.seed, Some(5));
        assert!(args.json);
        // Untouched settings keep their defaults.
        assert_eq!(config.bench.concurrency, 32);
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let mut config = Config::default();
        config.bench.seed = Some(9);
        RunArgs::default().apply(&mut config);
        assert_eq!(config.bench.seed, Some(9));
        assert_eq!(config.store.kind, StoreKind::Redis);
    }

    #[tokio::test]
    async fn test_memory_run_completes() {
        let mut config = Config::default();
        config.store.kind = StoreKind::Memory;
        config.workload.entries = 50;
        config.workload.value_size = 16;
        config.filter.expected_entries = 100;
        config.bench.runs = 2;
        config.bench.requests = 30;
        config.bench.seed = Some(1);

        cmd_run(&config, true).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_running() {
        let mut config = Config::default();
        config.store.kind = StoreKind::Memory;
        config.workload.entries = 2_000_000;
        assert!(cmd_run(&config, true).await.is_err());
    }
}
