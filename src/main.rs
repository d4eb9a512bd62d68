// Command-line entry point for running unattended builds
use clap::{Parser, Subcommand};
use std::io::stderr;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

mod cmd;
mod config;

use cmd::actions::ActionsArgs;
use cmd::run::RunArgs;
use cmd::validate::ValidateArgs;
use config::KilnConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Unattended imaging build runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (kiln.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output - shows more detailed logs
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs a build definition
    Run(RunArgs),
    /// Resolves and validates a build definition without running it
    Validate(ValidateArgs),
    /// Lists the available action types
    Actions(ActionsArgs),
}

/// Filter directives used when RUST_LOG is not set
fn default_directives(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!(
        "kiln={level},kiln_actions={level},kiln_workflow={level},reqwest=warn,hyper=warn,rustls=warn",
        level = level
    )
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    if let Err(e) = color_eyre::install() {
        eprintln!("Failed to install error handler: {}", e);
    }

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(cli.verbose)));
    registry().with(filter).with(fmt::layer().with_writer(stderr)).init();
    debug!("Logger initialized");

    let config = match KilnConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            eprintln!("{:?}", e);
            return ExitCode::from(cmd::EXIT_USAGE);
        }
    };

    let result = match cli.command {
        Commands::Run(args) => cmd::run::run_build(args, &config).await,
        Commands::Validate(args) => cmd::validate::validate_definition(args, &config).await,
        Commands::Actions(args) => cmd::actions::list_actions(args, &config).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("{:?}", e);
            ExitCode::from(cmd::EXIT_USAGE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "kiln",
            "run",
            "build.yaml",
            "--resume",
            "--max-retries",
            "5",
            "--checkpoint",
            "/tmp/state.json",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.definition, PathBuf::from("build.yaml"));
                assert!(args.resume);
                assert_eq!(args.max_retries, Some(5));
                assert_eq!(args.checkpoint, Some(PathBuf::from("/tmp/state.json")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["kiln", "validate", "build.yaml", "--config", "kiln.yaml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("kiln.yaml")));
        assert!(matches!(cli.command, Commands::Validate(_)));
    }

    #[test]
    fn test_missing_definition_is_usage_error() {
        let err = Cli::try_parse_from(["kiln", "run"]).unwrap_err();
        assert_eq!(err.exit_code(), i32::from(cmd::EXIT_USAGE));
    }

    #[test]
    fn test_default_directives() {
        assert!(default_directives(false).starts_with("kiln=info,"));
        assert!(default_directives(true).contains("kiln_workflow=debug"));
    }
}
