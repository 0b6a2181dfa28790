mod cmd_encode;
mod cmd_errors;
mod cmd_validate;
mod store;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "compound")]
#[command(about = "Encode record fixtures as JSON:API compound documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encode records from a store fixture as a compound document
    Encode(cmd_encode::EncodeArgs),
    /// Encode a list of error objects as an error document
    Errors {
        /// Input file holding an array of error objects
        #[arg(short, long)]
        input: PathBuf,

        /// Prefix for sub-URL links
        #[arg(long, default_value = "")]
        url_prefix: String,
    },
    /// Validate a compound document
    Validate {
        /// Input file
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encode(args) => cmd_encode::run(args, cli.pretty),
        Commands::Errors { input, url_prefix } => cmd_errors::run(input, url_prefix, cli.pretty),
        Commands::Validate { input } => cmd_validate::run(input),
    }
}
