//! cfgdeploy - Entry Point
//!
//! Idempotent configuration deploys: publish only when the local document
//! differs from the deployed one, then follow the rollout.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};

use cfgdeploy::app::options::{
    DiffOptions, GetOptions, RunOptions, StatusOptions, DEFAULT_TIMEOUT_SECS,
};
use cfgdeploy::app::run::{run_diff, run_get, run_reconcile, run_status};
use cfgdeploy::config::DEFAULT_CONFIG_FILE;
use cfgdeploy::errors::DeployError;
use cfgdeploy::logs::{init_logging, LogLevel, LogOptions};
use cfgdeploy::render;
use cfgdeploy::utils::version_info;

use tracing::{error, warn};

const EXIT_FAILURE: u8 = 1;
const EXIT_CONFIG: u8 = 2;
const EXIT_DIFF_FOUND: u8 = 3;
const EXIT_TIMEOUT: u8 = 4;
const EXIT_ROLLED_BACK: u8 = 5;
const EXIT_IN_PROGRESS: u8 = 6;

#[derive(Parser)]
#[command(name = "cfgdeploy", about, disable_version_flag = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Print build information and exit
    #[arg(long)]
    version: bool,

    /// Debug-level logs
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Explicit log level (overrides --verbose and --silent)
    #[arg(long, global = true, env = "CFGDEPLOY_LOG_LEVEL")]
    log_level: Option<LogLevel>,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish and roll out the data file if it changed
    Run {
        /// Deploy config file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Wait until the rollout starts baking
        #[arg(long)]
        wait_bake: bool,

        /// Wait until the rollout completes
        #[arg(long)]
        wait_deploy: bool,

        /// Wait bound in seconds
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, allow_negative_numbers = true)]
        timeout: i64,

        /// Deploy even when nothing changed
        #[arg(short, long)]
        force: bool,

        /// Only print errors
        #[arg(short, long)]
        silent: bool,
    },

    /// Show differences between the data file and the deployed version
    Diff {
        /// Deploy config file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Exit with status 3 when differences exist
        #[arg(long)]
        exit_nonzero: bool,

        /// Only print the diff and errors
        #[arg(short, long)]
        silent: bool,
    },

    /// Show a rollout's state, optionally waiting on it
    Status {
        /// Deploy config file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Rollout number; defaults to the latest
        #[arg(short, long)]
        deployment: Option<u64>,

        /// Wait until the rollout starts baking
        #[arg(long)]
        wait_bake: bool,

        /// Wait until the rollout completes
        #[arg(long)]
        wait_deploy: bool,

        /// Wait bound in seconds
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, allow_negative_numbers = true)]
        timeout: i64,
    },

    /// Print the content of the latest finished rollout
    Get {
        /// Deploy config file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("{}", e),
        }
        return ExitCode::SUCCESS;
    }

    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        return ExitCode::from(EXIT_CONFIG);
    };

    let silent = matches!(
        command,
        Commands::Run { silent: true, .. } | Commands::Diff { silent: true, .. }
    );
    let mut log_options = LogOptions::from_flags(silent, cli.verbose, cli.json_logs);
    if let Some(level) = cli.log_level {
        log_options.log_level = level;
    }
    if let Err(e) = init_logging(log_options) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match run_command(command).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            if let Some(DeployError::Timeout { .. }) =
                e.downcast_ref::<DeployError>().map(DeployError::root)
            {
                warn!("The rollout keeps running; follow it with `cfgdeploy status --wait-deploy`");
            }
            ExitCode::from(exit_code(&e))
        }
    }
}

async fn run_command(command: Commands) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Run {
            config,
            wait_bake,
            wait_deploy,
            timeout,
            force,
            silent,
        } => {
            let options = RunOptions {
                config_path: config,
                wait_bake,
                wait_deploy,
                timeout_secs: timeout,
                force,
                silent,
                ..Default::default()
            };
            let outcome = run_reconcile(&options).await?;
            if !options.silent {
                println!("{}", render::format_outcome(&outcome));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Diff {
            config,
            exit_nonzero,
            silent,
        } => {
            let options = DiffOptions {
                config_path: config,
                exit_nonzero,
                silent,
            };
            let result = run_diff(&options).await?;
            if result.has_changes || !options.silent {
                print!("{}", render::format_diff(&result));
            }
            if result.has_changes && options.exit_nonzero {
                return Ok(ExitCode::from(EXIT_DIFF_FOUND));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Status {
            config,
            deployment,
            wait_bake,
            wait_deploy,
            timeout,
        } => {
            let options = StatusOptions {
                config_path: config,
                rollout_number: deployment,
                wait_bake,
                wait_deploy,
                timeout_secs: timeout,
                ..Default::default()
            };
            let report = run_status(&options).await?;
            println!("{}", render::format_details(&report.details));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Get { config, output } => {
            let options = GetOptions {
                config_path: config,
                output,
            };
            let content = run_get(&options).await?;
            if options.output.is_none() {
                std::io::stdout().write_all(&content)?;
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    let Some(err) = err.downcast_ref::<DeployError>() else {
        return EXIT_FAILURE;
    };

    match err.root() {
        DeployError::Config(_) => EXIT_CONFIG,
        DeployError::Timeout { .. } => EXIT_TIMEOUT,
        DeployError::RolledBack { .. } => EXIT_ROLLED_BACK,
        DeployError::AlreadyInProgress => EXIT_IN_PROGRESS,
        _ => EXIT_FAILURE,
    }
}
