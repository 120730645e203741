//! Leadscout CLI — sponsor and speaker discovery for events.
//!
//! Turns an event description into a ranked shortlist of outreach leads,
//! with drafted messages for each.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
