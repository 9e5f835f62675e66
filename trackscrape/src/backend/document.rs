use std::future::{Future, ready};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::engine::page::{Activation, ActivationPath, NodePath, Page, PageError, PageSource};

/**
    A page backed by a static HTML document, e.g. a saved artist page.

    Nothing on a static page reacts to activation, so expansion always finds
    nothing to click. The parsed tree is not `Send`, so every operation
    re-parses the stored source and resolves synchronously.
*/
#[derive(Debug, Clone)]
pub struct DocumentPage {
    source: Arc<str>,
}

impl DocumentPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            source: Arc::from(html.into()),
        }
    }

    fn parse(&self) -> Html {
        Html::parse_document(&self.source)
    }

    fn select(&self, scope: Option<&NodePath>, selector: &str) -> Result<Vec<NodePath>, PageError> {
        let parsed = parse_selector(selector)?;
        let html = self.parse();

        let count = match scope {
            None => html.select(&parsed).count(),
            Some(path) => {
                let scope = resolve(&html, path)?;
                descendants(scope, &parsed).count()
            }
        };

        Ok((0..count)
            .map(|index| NodePath::child(scope, selector, index))
            .collect())
    }

    fn text(&self, node: &NodePath) -> Result<String, PageError> {
        let html = self.parse();
        let element = resolve(&html, node)?;
        // Collapse whitespace the way rendered text would.
        Ok(element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" "))
    }

    fn attribute(&self, node: &NodePath, name: &str) -> Result<Option<String>, PageError> {
        let html = self.parse();
        let element = resolve(&html, node)?;
        Ok(element.value().attr(name).map(ToString::to_string))
    }
}

fn parse_selector(selector: &str) -> Result<Selector, PageError> {
    Selector::parse(selector).map_err(|_| PageError::InvalidSelector(selector.to_string()))
}

/// Matches strictly below `scope`.
fn descendants<'a, 'b>(
    scope: ElementRef<'a>,
    selector: &'b Selector,
) -> impl Iterator<Item = ElementRef<'a>> {
    let id = scope.id();
    scope.select(selector).filter(move |e| e.id() != id)
}

fn resolve<'a>(html: &'a Html, path: &NodePath) -> Result<ElementRef<'a>, PageError> {
    let mut current: Option<ElementRef<'a>> = None;

    for step in path.steps() {
        let selector = parse_selector(&step.selector)?;
        let next = match current {
            None => html.select(&selector).nth(step.index),
            Some(scope) => descendants(scope, &selector).nth(step.index),
        };
        current = Some(next.ok_or_else(|| PageError::Detached(path.to_string()))?);
    }

    current.ok_or_else(|| PageError::Detached("empty node path".to_string()))
}

impl Page for DocumentPage {
    fn query_all(
        &self,
        scope: Option<&NodePath>,
        selector: &str,
    ) -> impl Future<Output = Result<Vec<NodePath>, PageError>> + Send {
        ready(self.select(scope, selector))
    }

    fn read_text(&self, node: &NodePath) -> impl Future<Output = Result<String, PageError>> + Send {
        ready(self.text(node))
    }

    fn read_attribute(
        &self,
        node: &NodePath,
        name: &str,
    ) -> impl Future<Output = Result<Option<String>, PageError>> + Send {
        ready(self.attribute(node, name))
    }

    fn activate(
        &self,
        _selector: &str,
        _path: ActivationPath,
    ) -> impl Future<Output = Result<Activation, PageError>> + Send {
        ready(Ok(Activation::NotFound))
    }

    fn wait(&self, _duration: Duration) -> impl Future<Output = ()> + Send {
        ready(())
    }

    fn release(&self) -> impl Future<Output = ()> + Send {
        ready(())
    }
}

/// Serves the same static document for every URL.
#[derive(Debug, Clone)]
pub struct DocumentSource {
    html: Arc<str>,
}

impl DocumentSource {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: Arc::from(html.into()),
        }
    }

    pub async fn from_file(path: &Path) -> Result<Self> {
        let html = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read HTML file {}", path.display()))?;
        Ok(Self::new(html))
    }
}

impl PageSource for DocumentSource {
    type Page = DocumentPage;

    fn acquire(&self, url: &str) -> impl Future<Output = Result<DocumentPage, PageError>> + Send {
        debug!(url, bytes = self.html.len(), "serving static document");
        ready(Ok(DocumentPage {
            source: Arc::clone(&self.html),
        }))
    }
}
