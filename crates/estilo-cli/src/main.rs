//! Estilo CLI - command-line interface for the estilo stylophone synthesizer.

mod commands;
mod config;
mod term;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "estilo")]
#[command(author, version, about = "Estilo stylophone synthesizer CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a short demo phrase on the default output device
    Play(commands::play::PlayArgs),

    /// Render a scripted phrase to a WAV file
    Render(commands::render::RenderArgs),

    /// Play live from the terminal keyboard
    Live(commands::live::LiveArgs),

    /// List waveform kinds and their topologies
    Kinds(commands::kinds::KindsArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play(args) => commands::play::run(args),
        Commands::Render(args) => commands::render::run(args),
        Commands::Live(args) => commands::live::run(args),
        Commands::Kinds(args) => commands::kinds::run(args),
    }
}
