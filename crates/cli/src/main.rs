mod run;
mod settings;
mod tap;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Scheduling API probe runner.
#[derive(Parser)]
#[command(name = "carewalk", version, about = "End-to-end probe runs against a scheduling API")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the booking workflow once and report per-step results
    Run {
        /// Path to a TOML config file (otherwise CAREWALK_* env vars)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Minimum success rate (percent) for exit code 0
        #[arg(long, default_value = "75")]
        min_success_rate: u8,

        /// Maximum booking attempts across slot candidates
        #[arg(long, default_value = "8")]
        max_attempts: usize,

        /// Pause between booking attempts, in milliseconds
        #[arg(long, default_value = "2000")]
        backoff_ms: u64,

        /// Stop at the first hard error instead of continuing
        #[arg(long)]
        halt_on_error: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Run {
            config,
            min_success_rate,
            max_attempts,
            backoff_ms,
            halt_on_error,
        } => run::cmd_run(
            config.as_deref(),
            min_success_rate,
            max_attempts,
            backoff_ms,
            halt_on_error,
            cli.output,
            cli.quiet,
        ),
    };
    process::exit(code);
}
