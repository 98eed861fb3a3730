//! ai-adapter - cost-aware routing between a cloud text model and local
//! speech-to-text.
//!
//! Serves the router over HTTP and offers offline configuration checks.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ai_adapter::api;
use ai_adapter::config::Config;
use ai_adapter::provider::{Provider, ProviderRegistry, Registration};

#[derive(Parser)]
#[command(name = "ai-adapter")]
#[command(about = "Cost-aware routing between a cloud text model and local speech-to-text")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Path to configuration file (environment and defaults only when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override listen address
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Validate configuration and provider preconditions
    Check {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show registered providers, their capabilities and rates
    Providers {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn init_tracing(level: &str) {
    let default_filter = format!("ai_adapter={level},tower_http={level}");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn print_registrations(registrations: &[Registration]) {
    for registration in registrations {
        match registration {
            Registration::Registered {
                name,
                capabilities,
                key_source,
            } => match key_source {
                Some(source) => println!("  {name}: registered {capabilities:?} (key: {source})"),
                None => println!("  {name}: registered {capabilities:?}"),
            },
            Registration::Disabled { name } => println!("  {name}: disabled"),
            Registration::Unavailable { name, error } => {
                println!("  {name}: unavailable ({error})")
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, listen } => {
            let mut cfg = Config::load(config.as_deref())?;
            init_tracing(&cfg.logging.level);

            if let Some(addr) = listen {
                tracing::info!(listen = %addr, "Override listen address");
                cfg.server.listen = addr;
            }

            tracing::info!(
                cost_optimization = cfg.routing.enable_cost_optimization,
                max_units_per_day = cfg.routing.max_units_per_day,
                fallback_to_local = cfg.routing.fallback_to_local,
                cost_threshold_usd = cfg.routing.cost_threshold_usd,
                "Loaded configuration"
            );

            api::run_server(cfg).await
        }

        Commands::Check { config } => {
            let cfg = Config::load(config.as_deref())?;
            init_tracing(&cfg.logging.level);

            let client = reqwest::Client::new();
            let (registry, registrations) = ProviderRegistry::from_config(&cfg.providers, &client);

            println!("Configuration OK");
            println!("  listen: {}", cfg.server.listen);
            println!(
                "  routing: cost_optimization={} max_units_per_day={} fallback_to_local={} cost_threshold_usd={}",
                cfg.routing.enable_cost_optimization,
                cfg.routing.max_units_per_day,
                cfg.routing.fallback_to_local,
                cfg.routing.cost_threshold_usd,
            );
            println!("Providers:");
            print_registrations(&registrations);

            if registry.is_empty() {
                anyhow::bail!("no provider could be registered");
            }
            Ok(())
        }

        Commands::Providers { config } => {
            let cfg = Config::load(config.as_deref())?;
            init_tracing(&cfg.logging.level);

            let client = reqwest::Client::new();
            let (registry, registrations) = ProviderRegistry::from_config(&cfg.providers, &client);

            if registry.is_empty() {
                println!("No providers registered.");
            } else {
                println!(
                    "{:<12} {:<20} {:>14} {:>14}  capabilities",
                    "name", "model", "input $/1M", "output $/1M"
                );
                for provider in registry.iter() {
                    let prices = provider.price_table();
                    println!(
                        "{:<12} {:<20} {:>14.4} {:>14.4}  {:?}",
                        provider.name(),
                        provider.model(),
                        prices.input_per_million,
                        prices.output_per_million,
                        provider.capabilities(),
                    );
                }
            }

            let skipped: Vec<_> = registrations
                .into_iter()
                .filter(|r| !r.is_registered())
                .collect();
            if !skipped.is_empty() {
                println!();
                println!("Not registered:");
                print_registrations(&skipped);
            }
            Ok(())
        }
    }
}
