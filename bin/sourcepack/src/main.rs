//! Sourcepack CLI
//!
//! Builds a repository of source modules into publishable bundles.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use clap::Parser;
use color_eyre::eyre::Result;

/// Command-line interface for Sourcepack.
#[derive(Parser)]
#[command(
    name = "sourcepack",
    version,
    about = "Bundles source modules and publishes their registry"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "sourcepack.toml")]
    config: std::path::PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Compile and bundle every module, then write the manifest and catalogue
    Bundle {
        /// Publish into this subfolder of the output directory
        #[arg(long, default_value = "")]
        folder: String,
    },
    /// Validate configuration and module layout
    Check {
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    sourcepack::init_tracing(cli.verbose);

    match cli.command {
        Commands::Bundle { folder } => {
            sourcepack::cmd::bundle::run(&cli.config, &folder)?;
        }
        Commands::Check { strict } => {
            sourcepack::cmd::check::run(&cli.config, strict)?;
        }
    }

    Ok(())
}
