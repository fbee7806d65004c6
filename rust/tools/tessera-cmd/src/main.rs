use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod utils;

#[derive(Parser)]
#[command(name = "tessera-cmd")]
#[command(about = "Command-line utility for aligned tensor buffers")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v for debug, -vv for trace); `RUST_LOG` takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocate aligned buffers and report where they landed
    Alloc {
        /// Size of each buffer in bytes
        #[arg(short, long)]
        capacity: usize,

        /// Required alignment of the first byte (a power of two)
        #[arg(short, long, default_value_t = tessera_bytes::DEFAULT_ALIGNMENT)]
        alignment: usize,

        /// Number of buffers to allocate
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },

    /// Build a tensor against the in-process engine and describe it
    Tensor(commands::tensor::TensorArgs),

    /// List the tensor element types and whether a byte buffer can back them
    Types,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Alloc {
            capacity,
            alignment,
            count,
        } => commands::alloc::run(capacity, alignment, count),
        Commands::Tensor(args) => commands::tensor::run(args),
        Commands::Types => commands::types::run(),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
