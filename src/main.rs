use clap::Parser;
use eleitoral::cli::{Cli, Commands};
use eleitoral::types::config::Config;
use eleitoral::EleitoralResult;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> EleitoralResult<()> {
    let cli = Cli::parse();

    // Load configuration first (no logging yet)
    let config = if cli.config.exists() {
        Config::load(&cli.config).unwrap_or_else(|_| Config::default_config())
    } else {
        Config::default_config()
    };

    // Determine log level: CLI flags take precedence over config
    let log_level = if cli.quiet {
        "error".to_string()
    } else if cli.verbose {
        "debug".to_string()
    } else {
        config.general.log_level.clone()
    };

    let filter = EnvFilter::from_default_env().add_directive(
        format!("eleitoral={}", log_level)
            .parse()
            .unwrap_or_else(|_| "eleitoral=info".parse().expect("fallback directive is valid")),
    );

    if config.general.log_format == "json" {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    tracing::debug!("Configuration loaded from: {}", cli.config.display());

    match cli.command {
        Commands::Init { path } => {
            eleitoral::cli::commands::init(path).await?;
        }
        Commands::Config => {
            eleitoral::cli::commands::show_config(&config)?;
        }
        Commands::Doctor => {
            eleitoral::cli::commands::doctor(&cli.config, &config).await?;
        }
        Commands::Version => {
            eleitoral::cli::commands::version();
        }
        Commands::Tally {
            votes,
            slates,
            json,
        } => {
            eleitoral::cli::commands::tally(&votes, slates.as_deref(), json, &config)?;
        }
        Commands::Sweep { json } => {
            eleitoral::cli::commands::sweep(json, &config).await?;
        }
    }

    Ok(())
}
