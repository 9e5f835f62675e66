use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use super::EngineArgs;
use crate::backend::{ChromeSource, DocumentSource};
use crate::engine::ArtistId;
use crate::server::artist_report;

#[derive(Parser, Debug)]
pub struct ExtractCommand {
    /// Artist ID (22 alphanumeric characters)
    pub artist_id: String,

    /// Extract from a saved artist page instead of launching a browser
    #[arg(long)]
    pub html: Option<PathBuf>,

    /// Write the JSON result to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub engine: EngineArgs,
}

impl ExtractCommand {
    pub async fn run(self) -> Result<()> {
        let id: ArtistId = self.artist_id.parse()?;

        let result = match &self.html {
            Some(path) => {
                // A saved page is fully rendered; there is nothing to wait for.
                let engine = EngineArgs {
                    locate_timeout: 0,
                    ..self.engine.clone()
                };
                let source = DocumentSource::from_file(path).await?;
                engine.extractor()?.extract(&source, &id).await?
            }
            None => {
                let source = ChromeSource::new(self.engine.browser_config());
                self.engine.extractor()?.extract(&source, &id).await?
            }
        };

        let json = serde_json::to_string_pretty(&artist_report(&id, &result))?;
        match &self.output {
            Some(path) => {
                tokio::fs::write(path, json)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!(path = %path.display(), tracks = result.total_tracks(), "result written");
            }
            None => println!("{json}"),
        }

        Ok(())
    }
}
