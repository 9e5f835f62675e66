use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

/// One step of a [`NodePath`]: the `index`-th match of `selector`
/// within the previous step's element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathStep {
    pub selector: String,
    pub index: usize,
}

/**
    Handle to a single element of a rendered page.

    Backends do not hand out live element references; instead a node is the
    list of `(selector, index)` steps that reaches it from the document. The
    handle stays valid as long as the page structure above it is unchanged.
*/
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath {
    steps: Vec<PathStep>,
}

impl NodePath {
    /// The node reached by taking match `index` of `selector` under `scope`
    /// (or under the document when `scope` is `None`).
    pub fn child(scope: Option<&NodePath>, selector: &str, index: usize) -> Self {
        let mut steps = scope.map(|s| s.steps.clone()).unwrap_or_default();
        steps.push(PathStep {
            selector: selector.to_string(),
            index,
        });
        Self { steps }
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// True if `self` is `ancestor` or lies below it.
    pub fn starts_with(&self, ancestor: &NodePath) -> bool {
        self.steps.starts_with(&ancestor.steps)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(" > ")?;
            }
            write!(f, "{}[{}]", step.selector, step.index)?;
        }
        Ok(())
    }
}

/// Failure of a single page interaction.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("page operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid selector '{0}'")]
    InvalidSelector(String),
    #[error("node is no longer attached: {0}")]
    Detached(String),
    #[error("browser error: {0}")]
    Browser(String),
    #[error("page has already been released")]
    Released,
}

/// Outcome of an expand action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Performed,
    NotFound,
}

/// How an activation is delivered to the page.
///
/// Pages differ in which one their event handlers react to, so the expansion
/// controller issues both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationPath {
    /// Input-level click dispatched by the automation driver.
    Primary,
    /// `element.click()` evaluated inside the page.
    Direct,
}

/**
    A live, queryable rendered page.

    The engine only reads from a page and triggers expand actions on it; it
    never creates or destroys one. Every operation is expected to be bounded
    by a timeout inside the backend.
*/
pub trait Page: Send + Sync + 'static {
    /// All nodes matching `selector` under `scope`, in document order.
    fn query_all(
        &self,
        scope: Option<&NodePath>,
        selector: &str,
    ) -> impl Future<Output = Result<Vec<NodePath>, PageError>> + Send;

    /// Rendered text of a node.
    fn read_text(&self, node: &NodePath) -> impl Future<Output = Result<String, PageError>> + Send;

    fn read_attribute(
        &self,
        node: &NodePath,
        name: &str,
    ) -> impl Future<Output = Result<Option<String>, PageError>> + Send;

    /// Activate the first element matching `selector`.
    fn activate(
        &self,
        selector: &str,
        path: ActivationPath,
    ) -> impl Future<Output = Result<Activation, PageError>> + Send;

    /// Settle delay.
    fn wait(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    /// Scroll through the whole document once so lazily rendered content appears.
    fn scroll_through(&self) -> impl Future<Output = Result<(), PageError>> + Send {
        async { Ok(()) }
    }

    /// Release the underlying resource. Must be idempotent.
    fn release(&self) -> impl Future<Output = ()> + Send;
}

/// Acquires rendered pages for a target URL.
pub trait PageSource: Send + Sync {
    type Page: Page;

    fn acquire(&self, url: &str) -> impl Future<Output = Result<Self::Page, PageError>> + Send;
}

/**
    Scoped ownership of an acquired page.

    Call [`PageLease::release`] on every normal exit path. If the lease is
    dropped without that (the request future was cancelled mid-pipeline), the
    release is spawned onto the current runtime instead.
*/
pub struct PageLease<P: Page> {
    page: Arc<P>,
    released: bool,
}

impl<P: Page> PageLease<P> {
    pub fn new(page: P) -> Self {
        Self {
            page: Arc::new(page),
            released: false,
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub async fn release(mut self) {
        self.released = true;
        self.page.release().await;
        debug!("page released");
    }
}

impl<P: Page> Drop for PageLease<P> {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let page = Arc::clone(&self.page);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("page lease dropped early, releasing in background");
                handle.spawn(async move {
                    page.release().await;
                });
            }
            Err(_) => warn!("page lease dropped outside a runtime, page not released"),
        }
    }
}
