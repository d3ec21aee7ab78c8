//! micprobe CLI - microphone frequency-response measurements from the terminal.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "micprobe")]
#[command(author, version, about = "Microphone frequency-response measurement", long_about = None)]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate stimulus WAV files
    Generate(commands::generate::GenerateArgs),

    /// List audio devices on every host
    Devices(commands::devices::DevicesArgs),

    /// Record a take set for one microphone
    Record(commands::record::RecordArgs),

    /// Capture a single noise or silence reference
    Noise(commands::record::NoiseArgs),

    /// Turn recorded takes into response curves
    Process(commands::process::ProcessArgs),

    /// Show or edit settings
    Config(commands::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    tracing_log::LogTracer::init().ok();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .unwrap_or_else(micprobe_config::paths::config_file);

    match cli.command {
        Commands::Generate(args) => commands::generate::run(args, &config_path),
        Commands::Devices(args) => commands::devices::run(args),
        Commands::Record(args) => commands::record::run(args, &config_path),
        Commands::Noise(args) => commands::record::run_noise(args, &config_path),
        Commands::Process(args) => commands::process::run(args, &config_path),
        Commands::Config(args) => commands::config::run(args, &config_path),
    }
}
