//! rf-reel-sim - operator tool for slot machines
//!
//! Usage:
//!   rf-reel-sim validate <machine>           - Publish-time validation report
//!   rf-reel-sim simulate <machine> [opts]    - Parallel RTP / volatility run
//!   rf-reel-sim play <machine> [opts]        - Rounds through a live session

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use rf_reel_sim::{BatchSimulator, SimConfig};
use rf_reels::{
    Currency, DocumentParser, EngineConfig, MachineStore, MemoryMachineStore, MemoryWallet,
    RoundEngine, format_minor, parse_display, validate_configuration,
};

const PLAYER: &str = "player";

#[derive(Parser)]
#[command(name = "rf-reel-sim", about = "Validate, simulate and play slot machines")]
struct Cli {
    /// Engine configuration (.json, .yaml or .yml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a machine document
    Validate {
        /// Machine document (.json, .yaml or .yml)
        machine: PathBuf,
    },
    /// Simulate many spins in parallel
    Simulate {
        machine: PathBuf,
        /// Number of spins
        #[arg(short, long, default_value_t = 1_000_000)]
        spins: u64,
        /// Bet in minor units (defaults to the machine minimum)
        #[arg(short, long)]
        bet: Option<u64>,
        /// RNG seed
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Worker threads (0 = all cores)
        #[arg(short, long, default_value_t = 0)]
        threads: usize,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Play rounds against an in-memory wallet
    Play {
        machine: PathBuf,
        /// Starting balance in display units (e.g., 100.00)
        #[arg(long, default_value = "100.00")]
        balance: String,
        /// Bet per round in display units (e.g., 1.00)
        #[arg(long, default_value = "1.00")]
        bet: String,
        /// Rounds to play
        #[arg(short, long, default_value_t = 100)]
        rounds: u32,
        /// Master seed for reproducible rounds
        #[arg(long)]
        seed: Option<u64>,
        /// Currency code
        #[arg(long, default_value = "COIN")]
        currency: String,
        /// Minor-unit exponent of the currency
        #[arg(long, default_value_t = 2)]
        exponent: u8,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Validate { machine } => validate(&config, &machine),
        Commands::Simulate {
            machine,
            spins,
            bet,
            seed,
            threads,
            json,
        } => simulate(
            &config,
            &machine,
            SimConfig {
                spins,
                bet,
                seed,
                threads,
                ..SimConfig::default()
            },
            json,
        ),
        Commands::Play {
            machine,
            balance,
            bet,
            rounds,
            seed,
            currency,
            exponent,
        } => {
            let currency = Currency::new(currency, exponent);
            let balance = parse_display(&balance, &currency)
                .with_context(|| format!("Invalid balance '{balance}'"))?;
            let bet = parse_display(&bet, &currency)
                .with_context(|| format!("Invalid bet '{bet}'"))?;
            let config = match seed {
                Some(seed) => config.with_rng_seed(seed),
                None => config,
            };
            play(config, &machine, &currency, balance, bet, rounds)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn validate(config: &EngineConfig, path: &Path) -> Result<()> {
    let machine = DocumentParser::with_limits(config.limits.clone())
        .load(path)
        .with_context(|| format!("Failed to read machine {}", path.display()))?;

    match validate_configuration(&machine, config) {
        Ok(report) => {
            println!("Machine '{}' is valid", report.machine_id);
            println!(
                "  RTP:        {:.3}% exact, {:.3}% declared",
                report.exact_rtp, report.declared_rtp
            );
            println!(
                "  Volatility: {:?} measured (std dev {:.3}), {:?} declared",
                report.measured_volatility, report.volatility_std_dev, report.declared_volatility
            );
            println!(
                "  Hit rate:   {:.2}% over {} spins",
                report.hit_rate * 100.0,
                report.sample_spins
            );
            Ok(())
        }
        Err(errors) => {
            eprintln!("Machine '{}' is invalid:", machine.id);
            for error in &errors {
                eprintln!("  - {error}");
            }
            bail!("{} configuration error(s)", errors.len());
        }
    }
}

fn simulate(config: &EngineConfig, path: &Path, sim: SimConfig, json: bool) -> Result<()> {
    let store = MemoryMachineStore::new(config.clone());
    let machine = store
        .publish_document(path)
        .with_context(|| format!("Failed to publish {}", path.display()))?;

    let report = BatchSimulator::new(machine).with_config(sim).run()?;
    if json {
        println!("{}", report.to_json()?);
    } else {
        println!("{report}");
    }
    Ok(())
}

fn play(
    config: EngineConfig,
    path: &Path,
    currency: &Currency,
    balance: u64,
    bet: u64,
    rounds: u32,
) -> Result<()> {
    let store = MemoryMachineStore::new(config.clone());
    let machine_id = store
        .publish_document(path)
        .with_context(|| format!("Failed to publish {}", path.display()))?
        .id()
        .to_string();

    let engine = RoundEngine::new(config, MemoryWallet::new(), store);
    engine.wallet().deposit(PLAYER, currency, balance)?;

    let mut played = 0u32;
    let mut won = 0u64;
    for _ in 0..rounds {
        match engine.spin(PLAYER, &machine_id, bet, currency) {
            Ok(spin) => {
                played += 1;
                won = won.saturating_add(spin.total_win);
                if spin.is_win() {
                    println!(
                        "#{:<5} win {} {} ({} line(s), {} scatter(s))",
                        spin.sequence,
                        format_minor(spin.total_win, currency),
                        currency,
                        spin.winning_lines.len(),
                        spin.scatter_wins.len()
                    );
                }
            }
            Err(e) if e.is_rejection() => {
                println!("Stopped: {e}");
                break;
            }
            Err(e) => return Err(e).context("Round failed"),
        }
    }

    let final_balance = engine.wallet().balance(PLAYER, currency).unwrap_or(0);
    println!(
        "Played {} round(s) on '{}': won {} {}, balance {} {}",
        played,
        machine_id,
        format_minor(won, currency),
        currency,
        format_minor(final_balance, currency),
        currency
    );
    if let Ok(machine) = engine.store().load_machine(&machine_id) {
        log::info!(
            "Session finished on '{}' (exact RTP {:.3}%)",
            machine.id(),
            machine.report().exact_rtp
        );
    }
    Ok(())
}
