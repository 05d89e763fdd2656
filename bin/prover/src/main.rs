//! Taiko prover binary.

use clap::Parser;
use taiko_prover::{Cli, ProverConfig};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let config = ProverConfig::try_from(Cli::parse())?;
    taiko_prover::run(config).await
}
