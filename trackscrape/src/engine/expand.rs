use std::time::Duration;

use tracing::{debug, info, warn};

use super::catalog::SelectorCatalog;
use super::page::{Activation, ActivationPath, Page};
use super::resolver::{self, Resolution};
use super::rows::find_rows;

/// Bounds for the expansion retry loop.
#[derive(Debug, Clone)]
pub struct ExpandOptions {
    pub target_rows: usize,
    pub max_attempts: usize,
    /// Wait after each activation before re-counting rows.
    pub settle: Duration,
    /// Wait between unsuccessful attempts, and once after the loop.
    pub retry_pause: Duration,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            target_rows: 10,
            max_attempts: 3,
            settle: Duration::from_secs(3),
            retry_pause: Duration::from_secs(2),
        }
    }
}

async fn count_rows<P: Page>(page: &P, catalog: &SelectorCatalog) -> usize {
    match find_rows(page, catalog).await {
        Resolution::Match(rows) => rows.len(),
        Resolution::NotFound => 0,
    }
}

/**
    Make sure the page shows at least `target_rows` track rows.

    Pages often truncate the list behind a "see more" button. When fewer rows
    than the target are visible, every expand candidate present on the page
    is activated (through both activation paths), rows are re-counted after a
    settle delay, and the whole round repeats up to `max_attempts` times.

    Never fails: the row count reached is returned either way.
*/
pub async fn ensure_expanded<P: Page>(
    page: &P,
    catalog: &SelectorCatalog,
    options: &ExpandOptions,
) -> usize {
    let target = options.target_rows;
    let mut count = count_rows(page, catalog).await;

    if count >= target {
        debug!(count, target, "track list already complete");
        return count;
    }

    info!(count, target, "track list truncated, expanding");

    let mut attempt = 0;
    while count < target && attempt < options.max_attempts {
        attempt += 1;

        for selector in catalog.expand.iter() {
            match resolver::query(page, None, selector).await {
                Ok(nodes) if !nodes.is_empty() => {}
                Ok(_) => continue,
                Err(e) => {
                    debug!(selector, error = %e, "expand affordance lookup failed");
                    continue;
                }
            }

            debug!(attempt, selector, "activating expand affordance");
            for path in [ActivationPath::Primary, ActivationPath::Direct] {
                match page.activate(selector, path).await {
                    Ok(Activation::Performed) => {}
                    Ok(Activation::NotFound) => {
                        debug!(selector, ?path, "expand affordance gone")
                    }
                    Err(e) => warn!(selector, ?path, error = %e, "activation failed"),
                }
            }

            page.wait(options.settle).await;
            count = count_rows(page, catalog).await;
            debug!(attempt, count, "rows after activation");

            if count >= target {
                break;
            }
        }

        if count < target && attempt < options.max_attempts {
            page.wait(options.retry_pause).await;
        }
    }

    if count >= target {
        info!(count, attempt, "track list expanded");
    } else {
        warn!(
            count,
            target,
            attempts = attempt,
            "could not expand track list, continuing with available rows"
        );
    }

    page.wait(options.retry_pause).await;
    count
}
