use anyhow::Result;
use clap::{Parser, Subcommand};

mod engine_args;
mod extract;
mod serve;

pub use engine_args::EngineArgs;
pub use extract::ExtractCommand;
pub use serve::ServeCommand;

#[derive(Parser, Debug)]
#[command(name = "trackscrape")]
#[command(about = "Extract an artist's top tracks from its rendered artist page")]
pub struct Args {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP API server (default)
    Serve(ServeCommand),
    /// Extract one artist page and print the result as JSON
    Extract(ExtractCommand),
}

impl Args {
    pub async fn run(self) -> Result<()> {
        let command = self
            .command
            .unwrap_or(Command::Serve(ServeCommand::default()));

        match command {
            Command::Serve(cmd) => cmd.run().await,
            Command::Extract(cmd) => cmd.run().await,
        }
    }
}
