use std::net::SocketAddr;

use anyhow::Result;
use clap::Parser;
use tokio::{signal, sync::watch};
use tracing::info;

use super::EngineArgs;
use crate::backend::ChromeSource;
use crate::server::{AppState, run_server};

#[derive(Parser, Debug)]
pub struct ServeCommand {
    /// HTTP server port
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Include full error chains in API error responses
    #[arg(long, env = "TRACKSCRAPE_DIAGNOSTIC")]
    pub diagnostic: bool,

    #[command(flatten)]
    pub engine: EngineArgs,
}

impl Default for ServeCommand {
    fn default() -> Self {
        // Same as `serve` with no flags, so env overrides still apply.
        Self::parse_from(["serve"])
    }
}

impl ServeCommand {
    pub async fn run(self) -> Result<()> {
        // Shutdown signal
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let extractor = self.engine.extractor()?;
        let source = ChromeSource::new(self.engine.browser_config());
        let state = AppState::new(extractor, source, self.diagnostic);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!(
            diagnostic = self.diagnostic,
            "HTTP server listening on http://localhost:{}", self.port
        );

        let mut server = tokio::spawn(run_server(addr, state, shutdown_rx));

        tokio::select! {
            joined = &mut server => return joined?,
            ctrl_c = signal::ctrl_c() => ctrl_c?,
        }

        info!("shutting down");
        let _ = shutdown_tx.send(true);
        server.await??;

        info!("done");
        Ok(())
    }
}
