use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::catalog::SelectorCatalog;
use super::error::ExtractError;
use super::expand::{ExpandOptions, ensure_expanded};
use super::metadata::{artist_name, monthly_listeners};
use super::normalize::normalize;
use super::page::{Page, PageLease, PageSource};
use super::resolver::resolve_first;
use super::rows::extract_tracks;
use super::types::{ArtistId, ExtractionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Acquiring,
    Locating,
    Expanding,
    Extracting,
    Normalizing,
    Done,
    Failed,
}

/// Timing and expansion knobs for one extraction.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub expand: ExpandOptions,
    pub load_timeout: Duration,
    /// How long the track container may take to render.
    pub locate_timeout: Duration,
    pub locate_poll: Duration,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            expand: ExpandOptions::default(),
            load_timeout: Duration::from_secs(90),
            locate_timeout: Duration::from_secs(10),
            locate_poll: Duration::from_millis(500),
        }
    }
}

/**
    Entry point for extracting one artist page.

    Cheap to share between requests; every call acquires its own page.
*/
#[derive(Debug, Clone)]
pub struct Extractor {
    catalog: Arc<SelectorCatalog>,
    options: ExtractOptions,
    base_url: String,
}

impl Extractor {
    pub fn new(
        catalog: Arc<SelectorCatalog>,
        options: ExtractOptions,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            options,
            base_url: base_url.into(),
        }
    }

    pub fn artist_url(&self, id: &ArtistId) -> String {
        format!("{}{}", self.base_url, id)
    }

    pub async fn extract<S: PageSource>(
        &self,
        source: &S,
        id: &ArtistId,
    ) -> Result<ExtractionResult, ExtractError> {
        let url = self.artist_url(id);
        info!(artist_id = %id, url = %url, "starting extraction");
        Pipeline::new(&self.catalog, &self.options)
            .run(source, &url)
            .await
    }
}

/// One run of the extraction stages over a single page.
pub struct Pipeline<'a> {
    catalog: &'a SelectorCatalog,
    options: &'a ExtractOptions,
    stage: Stage,
}

impl<'a> Pipeline<'a> {
    pub fn new(catalog: &'a SelectorCatalog, options: &'a ExtractOptions) -> Self {
        Self {
            catalog,
            options,
            stage: Stage::Acquiring,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn enter(&mut self, stage: Stage) {
        debug!(from = ?self.stage, to = ?stage, "stage transition");
        self.stage = stage;
    }

    fn fail<T>(&mut self, error: ExtractError) -> Result<T, ExtractError> {
        warn!(stage = ?self.stage(), error = %error, "extraction failed");
        self.enter(Stage::Failed);
        Err(error)
    }

    pub async fn run<S: PageSource>(
        &mut self,
        source: &S,
        url: &str,
    ) -> Result<ExtractionResult, ExtractError> {
        self.enter(Stage::Acquiring);

        let acquired = tokio::time::timeout(self.options.load_timeout, source.acquire(url)).await;
        let page = match acquired {
            Ok(Ok(page)) => page,
            Ok(Err(source)) => {
                return self.fail(ExtractError::Load {
                    url: url.to_string(),
                    source,
                });
            }
            Err(_) => {
                return self.fail(ExtractError::LoadTimeout {
                    url: url.to_string(),
                    timeout: self.options.load_timeout,
                });
            }
        };

        let lease = PageLease::new(page);
        let result = self.process(lease.page()).await;
        lease.release().await;

        match result {
            Ok(result) => {
                self.enter(Stage::Done);
                info!(
                    artist = result.artist_name(),
                    tracks = result.total_tracks(),
                    total_streams = result.total_streams(),
                    "extraction complete"
                );
                Ok(result)
            }
            Err(e) => self.fail(e),
        }
    }

    async fn process<P: Page>(&mut self, page: &P) -> Result<ExtractionResult, ExtractError> {
        self.enter(Stage::Locating);
        self.locate_container(page).await?;

        self.enter(Stage::Expanding);
        ensure_expanded(page, self.catalog, &self.options.expand).await;
        if let Err(e) = page.scroll_through().await {
            warn!(error = %e, "scrolling through page failed");
        }

        self.enter(Stage::Extracting);
        let records = extract_tracks(page, self.catalog).await;

        self.enter(Stage::Normalizing);
        let tracks = records.into_iter().map(normalize).collect();
        let name = artist_name(page, self.catalog).await;
        let listeners = monthly_listeners(page, self.catalog).await;

        Ok(ExtractionResult::new(name, listeners, tracks))
    }

    /// Poll the container cascade until it matches or the budget runs out.
    async fn locate_container<P: Page>(&self, page: &P) -> Result<(), ExtractError> {
        let candidates = &self.catalog.track_container;
        let deadline = Instant::now() + self.options.locate_timeout;

        loop {
            if resolve_first(page, candidates, None).await.is_match() {
                debug!("track container located");
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ExtractError::ContainerNotFound {
                    tried: candidates.len(),
                });
            }
            tokio::time::sleep(self.options.locate_poll).await;
        }
    }
}
