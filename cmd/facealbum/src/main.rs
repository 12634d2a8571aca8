//! facealbum - batch face clustering and album preview.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{CompareCommand, RunCommand};

/// facealbum - cluster face embeddings into per-person albums.
///
/// Reads a batch of uploads (owner, image id, upload time, detected faces),
/// assigns every face to a person cluster and prints the resulting albums.
#[derive(Parser)]
#[command(name = "facealbum")]
#[command(about = "Cluster face embeddings into per-person albums")]
#[command(version)]
pub struct Cli {
    /// Clustering config file (YAML or JSON)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Output file (default: stdout)
    #[arg(short = 'o', long, global = true)]
    pub output: Option<String>,

    /// Output as JSON instead of YAML
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cluster a batch of uploads and print albums
    Run(RunCommand),
    /// Compare two embeddings
    Compare(CompareCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays parseable.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Run(cmd) => cmd.run(&cli).await,
        Commands::Compare(cmd) => cmd.run(&cli),
    }
}
