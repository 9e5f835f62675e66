use tracing::debug;

use super::catalog::{CandidateList, SelectorCatalog};
use super::page::Page;
use super::resolver::{self, Resolution, resolve_text};
use super::types::{NOT_AVAILABLE, UNKNOWN_ARTIST};

const LISTENER_PHRASE: &str = "monthly listeners";

/// Upper bound on nodes read per scan selector.
const SCAN_LIMIT: usize = 400;

pub async fn artist_name<P: Page>(page: &P, catalog: &SelectorCatalog) -> String {
    resolve_text(page, &catalog.artist_name, None)
        .await
        .unwrap_or(UNKNOWN_ARTIST.to_string())
}

/**
    Monthly-listener label, e.g. `"1,234,567 monthly listeners"`.

    Falls back to the shortest text on the page containing the phrase, which
    is the innermost element carrying it.
*/
pub async fn monthly_listeners<P: Page>(page: &P, catalog: &SelectorCatalog) -> String {
    if let Resolution::Match(text) = resolve_text(page, &catalog.monthly_listeners, None).await {
        return text;
    }

    debug!("monthly listener selectors missed, scanning page text");
    scan_for_phrase(page, &catalog.listener_text_scan, LISTENER_PHRASE)
        .await
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

async fn scan_for_phrase<P: Page>(
    page: &P,
    candidates: &CandidateList,
    phrase: &str,
) -> Option<String> {
    let mut best: Option<String> = None;

    for selector in candidates.iter() {
        let Ok(nodes) = resolver::query(page, None, selector).await else {
            continue;
        };

        for node in nodes.iter().take(SCAN_LIMIT) {
            let Ok(text) = page.read_text(node).await else {
                continue;
            };
            let text = text.trim();
            if !text.to_lowercase().contains(phrase) {
                continue;
            }
            if best.as_ref().is_none_or(|b| text.len() < b.len()) {
                best = Some(text.to_string());
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DocumentPage;
    use crate::engine::testing::{artist_page, test_catalog};

    #[tokio::test]
    async fn test_metadata_from_selectors() {
        let page = DocumentPage::new(artist_page(2));
        let catalog = test_catalog();

        assert_eq!(artist_name(&page, &catalog).await, "Test Artist");
        assert_eq!(
            monthly_listeners(&page, &catalog).await,
            "1,234,567 monthly listeners"
        );
    }

    #[tokio::test]
    async fn test_listener_phrase_scan() {
        let html = r#"
            <div class="header">
                <div>Verified artist <span>98,765 Monthly Listeners</span></div>
            </div>
        "#;
        let page = DocumentPage::new(html);

        assert_eq!(
            monthly_listeners(&page, &test_catalog()).await,
            "98,765 Monthly Listeners"
        );
    }

    #[tokio::test]
    async fn test_metadata_defaults() {
        let page = DocumentPage::new("<html><body><p>nothing here</p></body></html>");
        let catalog = test_catalog();

        assert_eq!(artist_name(&page, &catalog).await, "Unknown Artist");
        assert_eq!(monthly_listeners(&page, &catalog).await, "N/A");
    }
}
