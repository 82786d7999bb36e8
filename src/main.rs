//! statenav: inspect a navigation configuration.
//!
//! ```text
//! statenav --config nav.toml check
//! statenav --config nav.toml states
//! statenav --config nav.toml match /shop/42
//! statenav --config nav.toml url shop.show id=42
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use statenav::config::{self, NavigationConfig};
use statenav::observability::logging::init_logging;
use statenav::registry::AddressOutcome;
use statenav::{MemoryAddress, Params, StateRegistry, TransitionOptions};

#[derive(Parser)]
#[command(name = "statenav")]
#[command(about = "Inspect and exercise a navigation configuration", long_about = None)]
struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = "statenav.toml")]
    config: PathBuf,

    /// Override the configured log level.
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration
    Check,
    /// List states in registration order
    States,
    /// Resolve an address to a state
    Match {
        url: String,
    },
    /// Generate the URL for a state
    Url {
        state: String,
        /// Parameters as key=value
        params: Vec<String>,
        /// Prefix the origin
        #[arg(long)]
        absolute: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let nav = config::load_config(&cli.config)?;
    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(&nav.observability.log_level);
    init_logging(level);
    tracing::debug!(path = %cli.config.display(), "Configuration loaded");

    match cli.command {
        Commands::Check => {
            let states = config::flatten(&nav);
            let routed = states.iter().filter(|s| s.pattern.is_some()).count();
            println!("OK: {} states, {} routes", states.len(), routed);
        }
        Commands::States => {
            for state in config::flatten(&nav) {
                println!(
                    "{:<32} {:<32} priority={}",
                    state.name,
                    state.pattern.as_deref().unwrap_or("-"),
                    state.priority
                );
            }
        }
        Commands::Match { url } => {
            let registry = build_registry(&nav)?;
            match registry.parse(Some(url.as_str()), TransitionOptions::new()).await? {
                AddressOutcome::Unknown => {
                    println!("no state matches {}", url);
                    return Ok(ExitCode::FAILURE);
                }
                AddressOutcome::Ignored | AddressOutcome::Transition(_) => {}
            }
            if let Some(state) = registry.get_current() {
                let params = serde_json::to_string(state.params().values())?;
                println!("{} {}", state.full_name(), params);
            }
        }
        Commands::Url {
            state,
            params,
            absolute,
        } => {
            let registry = build_registry(&nav)?;
            let params = parse_params(&params)?;
            println!("{}", registry.generate_url(&state, &params, absolute)?);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn build_registry(config: &NavigationConfig) -> Result<Arc<StateRegistry>, config::ConfigError> {
    let registry = Arc::new(StateRegistry::new());
    config::register_all(&registry, config)?;
    let address = MemoryAddress::new(config.address.mode).with_base(config.address.base.clone());
    registry.set_address(Arc::new(address));
    Ok(registry)
}

fn parse_params(raw: &[String]) -> Result<Params, String> {
    raw.iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| format!("expected key=value, got '{}'", pair))
        })
        .collect()
}
