use tracing::{debug, trace};

use super::catalog::CandidateList;
use super::page::{NodePath, Page, PageError};

/// Outcome of a selector cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    Match(T),
    NotFound,
}

impl<T> Resolution<T> {
    pub fn is_match(&self) -> bool {
        matches!(self, Resolution::Match(_))
    }

    pub fn unwrap_or(self, default: T) -> T {
        match self {
            Resolution::Match(value) => value,
            Resolution::NotFound => default,
        }
    }

    #[cfg(test)]
    pub fn into_option(self) -> Option<T> {
        match self {
            Resolution::Match(value) => Some(value),
            Resolution::NotFound => None,
        }
    }
}

/// Query a single selector. An unparsable selector matches nothing.
pub async fn query<P: Page>(
    page: &P,
    scope: Option<&NodePath>,
    selector: &str,
) -> Result<Vec<NodePath>, PageError> {
    match page.query_all(scope, selector).await {
        Err(PageError::InvalidSelector(sel)) => {
            debug!(selector = %sel, "skipping invalid selector");
            Ok(Vec::new())
        }
        other => other,
    }
}

/**
    Resolve a node set: the full match of the first candidate that yields at
    least one node. Later candidates are never queried once one matches.

    A candidate whose query fails is treated as a miss.
*/
pub async fn resolve_all<P: Page>(
    page: &P,
    candidates: &CandidateList,
    scope: Option<&NodePath>,
) -> Resolution<Vec<NodePath>> {
    for selector in candidates.iter() {
        match query(page, scope, selector).await {
            Ok(nodes) if !nodes.is_empty() => {
                debug!(selector, count = nodes.len(), "selector matched");
                return Resolution::Match(nodes);
            }
            Ok(_) => trace!(selector, "selector matched nothing"),
            Err(e) => debug!(selector, error = %e, "selector query failed"),
        }
    }
    Resolution::NotFound
}

/// First node of the first matching candidate.
pub async fn resolve_first<P: Page>(
    page: &P,
    candidates: &CandidateList,
    scope: Option<&NodePath>,
) -> Resolution<NodePath> {
    match resolve_all(page, candidates, scope).await {
        Resolution::Match(mut nodes) => Resolution::Match(nodes.swap_remove(0)),
        Resolution::NotFound => Resolution::NotFound,
    }
}

/// Text of the first candidate whose first node has non-empty text.
pub async fn resolve_text<P: Page>(
    page: &P,
    candidates: &CandidateList,
    scope: Option<&NodePath>,
) -> Resolution<String> {
    for selector in candidates.iter() {
        let nodes = match query(page, scope, selector).await {
            Ok(nodes) => nodes,
            Err(e) => {
                debug!(selector, error = %e, "selector query failed");
                continue;
            }
        };
        let Some(first) = nodes.first() else {
            continue;
        };

        match page.read_text(first).await {
            Ok(text) if !text.trim().is_empty() => {
                debug!(selector, "text resolved");
                return Resolution::Match(text.trim().to_string());
            }
            Ok(_) => trace!(selector, "matched node has no text"),
            Err(e) => debug!(selector, error = %e, "failed to read node text"),
        }
    }
    Resolution::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DocumentPage;
    use crate::engine::testing::{Probe, ProbedPage};

    const PAGE: &str = r#"
        <html><body>
            <section class="primary"><div class="row">a</div><div class="row">b</div></section>
            <section class="secondary"><div class="row">c</div></section>
            <h1 class="empty"> </h1>
            <h1 class="title">Artist</h1>
        </body></html>
    "#;

    fn page() -> (ProbedPage<DocumentPage>, Probe) {
        let probe = Probe::new();
        (ProbedPage::new(DocumentPage::new(PAGE), probe.clone()), probe)
    }

    #[tokio::test]
    async fn test_first_match_stops_cascade() {
        let (page, probe) = page();
        let candidates = CandidateList::new([".primary .row", ".row", ".missing"]).unwrap();

        let result = resolve_all(&page, &candidates, None).await;

        match result {
            Resolution::Match(nodes) => assert_eq!(nodes.len(), 2),
            Resolution::NotFound => panic!("expected a match"),
        }
        assert_eq!(probe.queries(), vec![".primary .row".to_string()]);
    }

    #[tokio::test]
    async fn test_later_candidate_used_after_misses() {
        let (page, probe) = page();
        let candidates = CandidateList::new([".missing", ".secondary .row", ".row"]).unwrap();

        let nodes = resolve_all(&page, &candidates, None).await.into_option().unwrap();

        assert_eq!(nodes.len(), 1);
        assert_eq!(page.read_text(&nodes[0]).await.unwrap(), "c");
        assert_eq!(
            probe.queries(),
            vec![".missing".to_string(), ".secondary .row".to_string()]
        );
    }

    #[tokio::test]
    async fn test_exhausted_cascade_is_not_found() {
        let (page, probe) = page();
        let candidates = CandidateList::new([".a", ".b", ".c"]).unwrap();

        assert_eq!(
            resolve_all(&page, &candidates, None).await,
            Resolution::NotFound
        );
        assert_eq!(probe.queries().len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_selector_is_a_miss() {
        let (page, _) = page();
        let candidates = CandidateList::new(["div:contains('x')", ".secondary .row"]).unwrap();

        let nodes = resolve_all(&page, &candidates, None).await.into_option().unwrap();
        assert_eq!(nodes.len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_text_skips_empty_text() {
        let (page, _) = page();
        let candidates = CandidateList::new(["h1.empty", "h1.title"]).unwrap();

        assert_eq!(
            resolve_text(&page, &candidates, None).await,
            Resolution::Match("Artist".to_string())
        );
    }

    #[tokio::test]
    async fn test_resolve_within_scope() {
        let (page, _) = page();
        let sections = CandidateList::new(["section.secondary"]).unwrap();
        let rows = CandidateList::new([".row"]).unwrap();

        let section = resolve_first(&page, &sections, None).await.into_option().unwrap();
        let scoped = resolve_all(&page, &rows, Some(&section))
            .await
            .into_option()
            .unwrap();

        assert_eq!(scoped.len(), 1);
        assert!(scoped[0].starts_with(&section));
    }
}
