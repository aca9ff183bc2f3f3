//! BB84 simulator binary.
//!
//! # Usage
//!
//! ```bash
//! # 1000 bits at 5% channel error, with and without an eavesdropper
//! bb84
//!
//! # Single run with Eve, fixed seed, first 20 rounds shown
//! bb84 run --eve --seed 42 --show-rounds 20
//!
//! # Average 50 runs on the probabilistic backend, JSON output
//! bb84 --config sim.toml run --trials 50 --backend probabilistic --json
//! ```

use anyhow::{Context, Result};
use bb84_sim::{
    BackendKind, DensityMatrixBackend, NoiseModel, ProbabilisticBackend, ProtocolResult,
    QubitBackend,
    config::SimulationConfig,
    protocols::{
        analysis::{Comparison, KeyReport, TrialSummary},
        bb84,
    },
};
use clap::{Args, Parser, Subcommand};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// BB84 quantum key distribution simulator
#[derive(Parser, Debug)]
#[command(name = "bb84")]
#[command(about = "Simulate BB84 key sifting with optional eavesdropping and channel noise")]
#[command(version)]
struct Cli {
    /// Path to a TOML simulation config
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the protocol and report key statistics
    Run(RunArgs),
    /// Run the same parameters without and with an eavesdropper
    Compare(SimArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    sim: SimArgs,

    /// Eve intercepts every qubit
    #[arg(long)]
    eve: bool,

    /// Print the first N rounds
    #[arg(long, value_name = "N")]
    show_rounds: Option<usize>,
}

#[derive(Args, Debug, Default)]
struct SimArgs {
    /// Number of qubits to transmit
    #[arg(short = 'n', long)]
    bits: Option<usize>,

    /// Channel bit-flip probability
    #[arg(short = 'e', long)]
    error_rate: Option<f64>,

    /// Seed for reproducible runs
    #[arg(short, long)]
    seed: Option<u64>,

    /// Qubit backend (density-matrix, probabilistic)
    #[arg(long)]
    backend: Option<BackendKind>,

    /// Channel noise model (encoded-bit-flip, pauli-x)
    #[arg(long)]
    noise_model: Option<NoiseModel>,

    /// Spread rounds over all cores
    #[arg(long)]
    parallel: bool,

    /// Number of runs to average over
    #[arg(short, long)]
    trials: Option<usize>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

impl SimArgs {
    fn apply(&self, config: &mut SimulationConfig) {
        if let Some(bits) = self.bits {
            config.n_bits = bits;
        }
        if let Some(rate) = self.error_rate {
            config.channel_error_rate = rate;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(noise_model) = self.noise_model {
            config.noise_model = noise_model;
        }
        if self.parallel {
            config.parallel = true;
        }
        if let Some(trials) = self.trials {
            config.trials = trials;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut config = match &cli.config {
        Some(path) => SimulationConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SimulationConfig::default(),
    };

    let command = cli
        .command
        .unwrap_or_else(|| Command::Compare(SimArgs::default()));

    match &command {
        Command::Run(args) => {
            args.sim.apply(&mut config);
            if args.eve {
                config.eavesdropper = true;
            }
        }
        Command::Compare(args) => args.apply(&mut config),
    }
    config.validate()?;

    let seed = config.seed.unwrap_or_else(|| rand::rng().random());
    tracing::info!(
        n_bits = config.n_bits,
        channel_error_rate = config.channel_error_rate,
        backend = %config.backend,
        noise_model = %config.noise_model,
        seed,
        "BB84 simulator starting"
    );

    match config.backend {
        BackendKind::DensityMatrix => execute(&command, &config, &DensityMatrixBackend::new(), seed),
        BackendKind::Probabilistic => execute(&command, &config, &ProbabilisticBackend::new(), seed),
    }
}

fn execute<B: QubitBackend + Sync>(
    command: &Command,
    config: &SimulationConfig,
    backend: &B,
    seed: u64,
) -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    match command {
        Command::Run(args) => {
            let results = (0..config.trials)
                .map(|_| run_once(config, backend, &mut rng))
                .collect::<Result<Vec<_>>>()?;

            if let Some(n) = args.show_rounds {
                print_rounds(&results[0], n);
            }

            if results.len() == 1 {
                let report = KeyReport::from_result(&results[0]);
                emit(&report, args.sim.json)
            } else {
                let summary =
                    TrialSummary::from_results(&results).context("no runs were performed")?;
                emit(&summary, args.sim.json)
            }
        }
        Command::Compare(args) => {
            let params = config.params()?;
            let comparisons = (0..config.trials)
                .map(|_| {
                    if config.parallel {
                        Comparison::run_parallel(&params, backend, rng.random())
                    } else {
                        Comparison::run_with_params(&params, backend, &mut rng)
                    }
                })
                .collect::<Result<Vec<_>, _>>()?;
            for comparison in &comparisons {
                emit(comparison, args.json)?;
            }
            Ok(())
        }
    }
}

fn run_once<B: QubitBackend + Sync>(
    config: &SimulationConfig,
    backend: &B,
    rng: &mut ChaCha8Rng,
) -> Result<ProtocolResult> {
    let params = config.params()?;
    let result = if config.parallel {
        bb84::run_parallel(&params, backend, rng.random())?
    } else {
        bb84::run_with_backend(&params, backend, rng)?
    };
    Ok(result)
}

fn emit<T: serde::Serialize + std::fmt::Display>(value: &T, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{value}");
        println!();
    }
    Ok(())
}

fn print_rounds(result: &ProtocolResult, n: usize) {
    let bit = |b: bool| if b { '1' } else { '0' };

    println!("round  alice  bob  eve  noise  kept");
    for round in result.rounds().take(n) {
        let eve = match (round.eve_basis, round.eve_bit) {
            (Some(basis), Some(b)) => format!("{}{}", bit(b), basis.symbol()),
            _ => "--".to_string(),
        };
        println!(
            "{:>5}  {}{}     {}{}   {:<3}  {:<5}  {}",
            round.index,
            bit(round.alice_bit),
            round.alice_basis.symbol(),
            bit(round.bob_bit),
            round.bob_basis.symbol(),
            eve,
            if round.noise_applied { "flip" } else { "" },
            if round.bases_match() { "yes" } else { "" },
        );
    }
    println!();
}
