use abctl::commands::{LocalCommands, handle_local_command};
use abctl::paths::Paths;
use abctl::telemetry;
use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*};

/// Manage a local Airbyte installation
#[derive(Parser, Debug)]
#[command(name = "abctl", version, about, long_about = None)]
struct Cli {
    /// Home directory abctl keeps its state under (default: the user's home)
    #[clap(long, global = true, env = "ABCTL_HOME")]
    home: Option<String>,

    /// Enable debug logging
    #[clap(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage the local Airbyte installation
    Local {
        #[command(subcommand)]
        command: LocalCommands,
    },
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(telemetry::log_filter(cli.verbose))
        .init();

    match cli.command {
        Commands::Local { command } => {
            let paths = Paths::discover(cli.home.as_deref())?;
            handle_local_command(command, &paths).await
        }
        Commands::Version => {
            println!("abctl {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
