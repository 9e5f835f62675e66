//! Page doubles and fixtures shared by the engine tests.

use std::future::{Future, pending};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::catalog::SelectorCatalog;
use super::page::{Activation, ActivationPath, NodePath, Page, PageError, PageSource};
use crate::backend::DocumentPage;
use crate::backend::guard::{CloseGuard, Shutdown};

const TEST_CATALOG: &str = r#"
track_container:
  - '.tracks'
track_rows:
  - ['.row']
  - ['div[role="row"]']
track_name:
  - '.title'
  - '.title-fallback'
row_links:
  - 'a'
row_leaves:
  - 'span'
row_cells:
  - '.cell'
track_image:
  - 'img'
track_link:
  - 'a[href*="/track/"]'
expand:
  - 'button.more'
  - 'button.show-all'
artist_name:
  - 'h1'
monthly_listeners:
  - '.listeners'
listener_text_scan:
  - 'span'
  - 'p'
generic_track_links:
  - 'a[href*="/track/"]'
"#;

pub const ROW_SELECTOR: &str = ".row";
const EXPAND_SELECTOR: &str = "button.more";

pub fn test_catalog() -> SelectorCatalog {
    SelectorCatalog::from_yaml(TEST_CATALOG).unwrap()
}

const NUMBER_WORDS: [&str; 12] = [
    "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine", "Ten", "Eleven",
    "Twelve",
];

/// Plays of row `i` (1-based) in [`artist_page`].
pub fn row_streams(i: usize) -> u64 {
    (i * 1_000_000 + i * 1_000) as u64
}

/**
    Artist page with `rows` track rows, numbered from 1.

    Row `i` is "Track <i as word>" with `i,00i,000` plays, duration `3:0i`
    and track id `trk` followed by `i` zero-padded to 20 digits.
*/
pub fn artist_page(rows: usize) -> String {
    let mut html = String::from(
        r#"<html><body>
        <h1>Test Artist</h1>
        <div class="listeners">1,234,567 monthly listeners</div>
        <div class="tracks">"#,
    );

    for i in 1..=rows {
        let word = NUMBER_WORDS.get(i - 1).copied().unwrap_or("Extra");
        html.push_str(&format!(
            r#"
            <div class="row">
                <img src="https://img.example/{i}.jpg">
                <a href="/track/trk{i:020}"><span class="title">Track {word}</span></a>
                <span class="cell">{i},{i:03},000</span>
                <span class="cell">3:{i:02}</span>
            </div>"#
        ));
    }

    html.push_str("</div></body></html>");
    html
}

// ── Probe ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct ProbeState {
    queries: Mutex<Vec<String>>,
    releases: AtomicUsize,
}

/// Records what the engine did to a page.
#[derive(Clone, Default)]
pub struct Probe(Arc<ProbeState>);

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queries(&self) -> Vec<String> {
        self.0.queries.lock().unwrap().clone()
    }

    pub fn releases(&self) -> usize {
        self.0.releases.load(Ordering::SeqCst)
    }
}

pub struct ProbedPage<P> {
    inner: P,
    probe: Probe,
}

impl<P: Page> ProbedPage<P> {
    pub fn new(inner: P, probe: Probe) -> Self {
        Self { inner, probe }
    }
}

impl<P: Page> Page for ProbedPage<P> {
    async fn query_all(
        &self,
        scope: Option<&NodePath>,
        selector: &str,
    ) -> Result<Vec<NodePath>, PageError> {
        self.probe
            .0
            .queries
            .lock()
            .unwrap()
            .push(selector.to_string());
        self.inner.query_all(scope, selector).await
    }

    async fn read_text(&self, node: &NodePath) -> Result<String, PageError> {
        self.inner.read_text(node).await
    }

    async fn read_attribute(
        &self,
        node: &NodePath,
        name: &str,
    ) -> Result<Option<String>, PageError> {
        self.inner.read_attribute(node, name).await
    }

    async fn activate(
        &self,
        selector: &str,
        path: ActivationPath,
    ) -> Result<Activation, PageError> {
        self.inner.activate(selector, path).await
    }

    async fn wait(&self, duration: Duration) {
        self.inner.wait(duration).await
    }

    async fn release(&self) {
        self.probe.0.releases.fetch_add(1, Ordering::SeqCst);
        self.inner.release().await
    }
}

// ── FailingRow ──────────────────────────────────────────────────────────────

/// Fails every operation inside one track row, as if it were detached.
pub struct FailingRow<P> {
    inner: P,
    row: NodePath,
}

impl<P: Page> FailingRow<P> {
    pub fn new(inner: P, row_index: usize) -> Self {
        Self {
            inner,
            row: NodePath::child(None, ROW_SELECTOR, row_index),
        }
    }

    fn check(&self, node: &NodePath) -> Result<(), PageError> {
        if node.starts_with(&self.row) {
            Err(PageError::Detached(format!("{:?}", node.steps())))
        } else {
            Ok(())
        }
    }
}

impl<P: Page> Page for FailingRow<P> {
    async fn query_all(
        &self,
        scope: Option<&NodePath>,
        selector: &str,
    ) -> Result<Vec<NodePath>, PageError> {
        if let Some(scope) = scope {
            self.check(scope)?;
        }
        self.inner.query_all(scope, selector).await
    }

    async fn read_text(&self, node: &NodePath) -> Result<String, PageError> {
        self.check(node)?;
        self.inner.read_text(node).await
    }

    async fn read_attribute(
        &self,
        node: &NodePath,
        name: &str,
    ) -> Result<Option<String>, PageError> {
        self.check(node)?;
        self.inner.read_attribute(node, name).await
    }

    async fn activate(
        &self,
        selector: &str,
        path: ActivationPath,
    ) -> Result<Activation, PageError> {
        self.inner.activate(selector, path).await
    }

    async fn wait(&self, duration: Duration) {
        self.inner.wait(duration).await
    }

    async fn release(&self) {
        self.inner.release().await
    }
}

// ── GrowingPage ─────────────────────────────────────────────────────────────

/// A row list that grows by `step` rows per primary activation of the
/// expand button.
pub struct GrowingPage {
    rows: AtomicUsize,
    step: usize,
    button_present: bool,
    primary: AtomicUsize,
    direct: AtomicUsize,
}

impl GrowingPage {
    pub fn new(initial_rows: usize, step: usize, button_present: bool) -> Self {
        Self {
            rows: AtomicUsize::new(initial_rows),
            step,
            button_present,
            primary: AtomicUsize::new(0),
            direct: AtomicUsize::new(0),
        }
    }

    pub fn primary_activations(&self) -> usize {
        self.primary.load(Ordering::SeqCst)
    }

    pub fn direct_activations(&self) -> usize {
        self.direct.load(Ordering::SeqCst)
    }
}

impl Page for GrowingPage {
    async fn query_all(
        &self,
        scope: Option<&NodePath>,
        selector: &str,
    ) -> Result<Vec<NodePath>, PageError> {
        let count = match selector {
            ROW_SELECTOR => self.rows.load(Ordering::SeqCst),
            EXPAND_SELECTOR if self.button_present => 1,
            _ => 0,
        };
        Ok((0..count)
            .map(|i| NodePath::child(scope, selector, i))
            .collect())
    }

    async fn read_text(&self, _node: &NodePath) -> Result<String, PageError> {
        Ok(String::new())
    }

    async fn read_attribute(
        &self,
        _node: &NodePath,
        _name: &str,
    ) -> Result<Option<String>, PageError> {
        Ok(None)
    }

    async fn activate(
        &self,
        selector: &str,
        path: ActivationPath,
    ) -> Result<Activation, PageError> {
        if !self.button_present || selector != EXPAND_SELECTOR {
            return Ok(Activation::NotFound);
        }
        match path {
            ActivationPath::Primary => {
                self.primary.fetch_add(1, Ordering::SeqCst);
                self.rows.fetch_add(self.step, Ordering::SeqCst);
            }
            ActivationPath::Direct => {
                self.direct.fetch_add(1, Ordering::SeqCst);
            }
        }
        Ok(Activation::Performed)
    }

    async fn release(&self) {}
}

// ── Sources ─────────────────────────────────────────────────────────────────

/// Hands out one prepared page.
pub struct StaticSource<P> {
    page: Mutex<Option<P>>,
}

impl<P: Page> StaticSource<P> {
    pub fn new(page: P) -> Self {
        Self {
            page: Mutex::new(Some(page)),
        }
    }
}

impl StaticSource<DocumentPage> {
    pub fn html(html: impl Into<String>) -> Self {
        Self::new(DocumentPage::new(html))
    }
}

impl<P: Page> PageSource for StaticSource<P> {
    type Page = P;

    async fn acquire(&self, _url: &str) -> Result<P, PageError> {
        let page = self.page.lock().unwrap().take();
        page.ok_or_else(|| PageError::Browser("page already acquired".to_string()))
    }
}

/// Never finishes loading.
pub struct StalledSource;

impl PageSource for StalledSource {
    type Page = DocumentPage;

    fn acquire(&self, _url: &str) -> impl Future<Output = Result<DocumentPage, PageError>> + Send {
        pending()
    }
}

/// Fails to load with a browser error.
pub struct BrokenSource;

impl PageSource for BrokenSource {
    type Page = DocumentPage;

    async fn acquire(&self, _url: &str) -> Result<DocumentPage, PageError> {
        Err(PageError::Browser("connection refused".to_string()))
    }
}

// ── Launched browsers ───────────────────────────────────────────────────────

/// Counts browser shutdowns.
#[derive(Clone, Default)]
pub struct Closes(Arc<AtomicUsize>);

impl Closes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Stand-in for a launched browser that records its shutdown.
pub struct RecordedBrowser {
    closes: Closes,
    hang: bool,
}

impl RecordedBrowser {
    pub fn new(closes: &Closes) -> Self {
        Self {
            closes: closes.clone(),
            hang: false,
        }
    }

    /// Never finishes shutting down.
    pub fn hanging(closes: &Closes) -> Self {
        Self {
            hang: true,
            ..Self::new(closes)
        }
    }
}

impl Shutdown for RecordedBrowser {
    async fn shutdown(self) {
        if self.hang {
            pending::<()>().await;
        }
        self.closes.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Launches a browser, then never finishes navigating.
#[derive(Default)]
pub struct LaunchingSource {
    pub closes: Closes,
}

impl PageSource for LaunchingSource {
    type Page = DocumentPage;

    async fn acquire(&self, _url: &str) -> Result<DocumentPage, PageError> {
        let mut browser = CloseGuard::new(Duration::from_secs(1));
        browser.hold(RecordedBrowser::new(&self.closes));
        pending::<()>().await;
        drop(browser);
        Err(PageError::Browser("navigation never finishes".to_string()))
    }
}
