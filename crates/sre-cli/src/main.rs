// SPDX-License-Identifier: MIT OR Apache-2.0
//! `sre` — the skill runtime command line.

#![deny(unsafe_code)]

mod commands;

use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Exit code for runtime errors and verification mismatches.
const EXIT_FAILURE: i32 = 1;

#[derive(Parser, Debug)]
#[command(name = "sre", version, about = "Skill runtime environment CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a committed order offline and compare digests.
    ///
    /// Exits 0 when the digests match, 1 on mismatch.
    Verify {
        /// Order identifier to verify.
        #[arg(long)]
        order: String,

        /// Committed digest to compare the replay against (64 hex chars);
        /// defaults to the all-zero seed digest.
        #[arg(long)]
        committed_hash: Option<String>,
    },

    /// Stream chain events to stdout as JSON lines.
    Listen {
        /// Subscribe on mainnet (requires HELIUS_API_KEY).
        #[arg(long, conflicts_with_all = ["devnet", "test"])]
        mainnet: bool,

        /// Subscribe on devnet (requires HELIUS_API_KEY). The default
        /// network when neither --mainnet nor --test is given.
        #[arg(long, conflicts_with = "test")]
        devnet: bool,

        /// Emit synthetic events instead of connecting anywhere.
        #[arg(long)]
        test: bool,

        /// Seconds between synthetic events in --test mode.
        #[arg(long, default_value_t = 5)]
        interval: u64,

        /// Stop after this many events (test mode only).
        #[arg(long)]
        limit: Option<u64>,
    },

    /// Mock data utilities.
    Mock {
        #[command(subcommand)]
        command: MockCommands,
    },
}

#[derive(Subcommand, Debug)]
enum MockCommands {
    /// Write seeded order/skill fixtures to disk.
    Generate {
        /// Number of order records.
        #[arg(long, default_value_t = 10)]
        orders: usize,

        /// Number of skill records.
        #[arg(long, default_value_t = 5)]
        skills: usize,

        /// Seed for reproducible output.
        #[arg(long)]
        seed: Option<u64>,

        /// Output directory.
        #[arg(long, default_value = "data/mock")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            // Single-line JSON on stderr, per the CLI error contract.
            eprintln!("{}", json!({"error": err.to_string()}));
            EXIT_FAILURE
        }
    };
    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Commands::Verify {
            order,
            committed_hash,
        } => commands::verify(&order, committed_hash.as_deref()).await,
        Commands::Listen {
            mainnet,
            test,
            interval,
            limit,
            ..
        } => commands::listen(mainnet, test, interval, limit).await,
        Commands::Mock {
            command:
                MockCommands::Generate {
                    orders,
                    skills,
                    seed,
                    out,
                },
        } => commands::mock_generate(orders, skills, seed, &out),
    }
}
