//! shipwright CLI - build pipeline driver and release archiver

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shipwright::commands;
use shipwright::config::{BuildContext, Config};
use shipwright::platform::Platform;

/// shipwright - build pipeline driver and release archiver
#[derive(Debug, Parser)]
#[command(name = "shipwright")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long, global = true)]
    root: Option<String>,

    /// Target platform override (linux, windows, macos)
    #[arg(short, long, global = true)]
    platform: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the full build pipeline and publish the distributable archive
    Archive,

    /// Build and install third-party libraries
    Thirdparty(commands::thirdparty::ThirdPartyArgs),
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let cli = Cli::parse();

    // Determine the project root
    let root = if let Some(ref path) = cli.root {
        camino::Utf8PathBuf::from(path)
    } else {
        std::env::current_dir()
            .ok()
            .and_then(|p| camino::Utf8PathBuf::try_from(p).ok())
            .unwrap_or_else(|| camino::Utf8PathBuf::from("."))
    };

    // Build the context once; everything downstream borrows it
    let mut config = Config::load(&root).into_diagnostic()?;
    if let Some(ref platform) = cli.platform {
        config.platform = Some(Platform::from(platform.as_str()));
    }
    let ctx = BuildContext::new(root, config);

    match cli.command {
        Commands::Archive => commands::archive::run(&ctx),
        Commands::Thirdparty(args) => commands::thirdparty::run(&ctx, args),
    }
}
