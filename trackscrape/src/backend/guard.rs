use std::future::Future;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, warn};

/// Something launched that has to be shut down explicitly, like a browser.
pub trait Shutdown: Send + 'static {
    fn shutdown(self) -> impl Future<Output = ()> + Send;
}

/**
    Owns a launched browser until it is closed.

    Dropping the guard while it still holds the browser, e.g. when the load
    timeout cancels an acquire halfway through navigation, closes it on a
    background task. Every close is bounded by `close_timeout`.
*/
pub struct CloseGuard<B: Shutdown> {
    inner: Option<B>,
    close_timeout: Duration,
}

impl<B: Shutdown> CloseGuard<B> {
    pub fn new(close_timeout: Duration) -> Self {
        Self {
            inner: None,
            close_timeout,
        }
    }

    /// Take ownership of `inner`, closing whatever was held before.
    pub fn hold(&mut self, inner: B) -> &B {
        if let Some(previous) = self.inner.take() {
            spawn_close(previous, self.close_timeout);
        }
        self.inner.insert(inner)
    }

    pub fn is_held(&self) -> bool {
        self.inner.is_some()
    }

    /// Close now. A second call does nothing.
    pub async fn close(&mut self) {
        if let Some(inner) = self.inner.take() {
            close_bounded(inner, self.close_timeout).await;
        }
    }
}

impl<B: Shutdown> Drop for CloseGuard<B> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            debug!("guard dropped with browser still open");
            spawn_close(inner, self.close_timeout);
        }
    }
}

fn spawn_close<B: Shutdown>(inner: B, limit: Duration) {
    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(close_bounded(inner, limit));
        }
        Err(_) => warn!("no runtime left to close browser"),
    }
}

async fn close_bounded<B: Shutdown>(inner: B, limit: Duration) {
    match tokio::time::timeout(limit, inner.shutdown()).await {
        Ok(()) => debug!("browser closed"),
        Err(_) => warn!(timeout = ?limit, "browser did not close in time"),
    }
}
