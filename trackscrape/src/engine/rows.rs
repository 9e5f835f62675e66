use tracing::{debug, info, warn};

use super::catalog::{CandidateList, SelectorCatalog};
use super::classify::{RowFragments, classify, is_numeric};
use super::normalize::track_id_from_link;
use super::page::{NodePath, Page, PageError};
use super::resolver::{self, Resolution, resolve_all, resolve_first};
use super::types::TrackRecord;

/// Track rows from the first row family that yields any.
pub async fn find_rows<P: Page>(page: &P, catalog: &SelectorCatalog) -> Resolution<Vec<NodePath>> {
    for (family, candidates) in catalog.track_rows.iter().enumerate() {
        if let Resolution::Match(rows) = resolve_all(page, candidates, None).await {
            debug!(family, count = rows.len(), "row family matched");
            return Resolution::Match(rows);
        }
    }
    Resolution::NotFound
}

/**
    Read every track on the page, in on-page order.

    A row that cannot be read becomes a placeholder record; it never stops
    the remaining rows. When no row family matches at all, bare track links
    anywhere on the page are used as minimal records.
*/
pub async fn extract_tracks<P: Page>(page: &P, catalog: &SelectorCatalog) -> Vec<TrackRecord> {
    let rows = match find_rows(page, catalog).await {
        Resolution::Match(rows) => rows,
        Resolution::NotFound => {
            warn!("no track rows found, falling back to generic link extraction");
            return extract_from_links(page, catalog).await;
        }
    };

    let mut tracks = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let track = match extract_row(page, catalog, row).await {
            Ok(track) => track,
            Err(e) => {
                warn!(row = index + 1, error = %e, "failed to extract row");
                TrackRecord::placeholder(index)
            }
        };
        tracks.push(track);
    }

    info!(count = tracks.len(), "extracted track rows");
    tracks
}

pub async fn extract_row<P: Page>(
    page: &P,
    catalog: &SelectorCatalog,
    row: &NodePath,
) -> Result<TrackRecord, PageError> {
    let fragments = collect_fragments(page, catalog, row).await?;
    let fields = classify(&fragments);

    let image = match resolve_first(page, &catalog.track_image, Some(row)).await {
        Resolution::Match(node) => page.read_attribute(&node, "src").await?,
        Resolution::NotFound => None,
    };

    let track_id = match resolve_first(page, &catalog.track_link, Some(row)).await {
        Resolution::Match(node) => page
            .read_attribute(&node, "href")
            .await?
            .and_then(|href| track_id_from_link(&href)),
        Resolution::NotFound => None,
    };

    Ok(TrackRecord {
        name: fields.name,
        image,
        stream_count: fields.stream_count,
        duration: fields.duration,
        track_id,
    })
}

/// Gather the labelled text fragments of one row for classification.
pub async fn collect_fragments<P: Page>(
    page: &P,
    catalog: &SelectorCatalog,
    row: &NodePath,
) -> Result<RowFragments, PageError> {
    let mut named = Vec::new();
    for selector in catalog.track_name.iter() {
        let nodes = resolver::query(page, Some(row), selector).await?;
        let Some(first) = nodes.first() else {
            continue;
        };
        let text = page.read_text(first).await?.trim().to_string();
        if text.is_empty() {
            continue;
        }
        let settled = !is_numeric(&text);
        named.push(text);
        if settled {
            // Later selectors cannot win over a usable name.
            break;
        }
    }

    let cells = match resolve_all(page, &catalog.row_cells, Some(row)).await {
        Resolution::Match(nodes) => read_texts(page, &nodes).await?,
        Resolution::NotFound => Vec::new(),
    };

    Ok(RowFragments {
        named,
        links: texts_of(page, &catalog.row_links, row).await?,
        leaves: texts_of(page, &catalog.row_leaves, row).await?,
        cells,
    })
}

/// Texts of every node matched by any candidate, candidates in order.
async fn texts_of<P: Page>(
    page: &P,
    candidates: &CandidateList,
    row: &NodePath,
) -> Result<Vec<String>, PageError> {
    let mut texts = Vec::new();
    for selector in candidates.iter() {
        let nodes = resolver::query(page, Some(row), selector).await?;
        texts.extend(read_texts(page, &nodes).await?);
    }
    Ok(texts)
}

async fn read_texts<P: Page>(page: &P, nodes: &[NodePath]) -> Result<Vec<String>, PageError> {
    let mut texts = Vec::with_capacity(nodes.len());
    for node in nodes {
        texts.push(page.read_text(node).await?.trim().to_string());
    }
    Ok(texts)
}

async fn extract_from_links<P: Page>(page: &P, catalog: &SelectorCatalog) -> Vec<TrackRecord> {
    let links = match resolve_all(page, &catalog.generic_track_links, None).await {
        Resolution::Match(links) => links,
        Resolution::NotFound => {
            warn!("no track links found on page");
            return Vec::new();
        }
    };

    let mut tracks = Vec::with_capacity(links.len());
    for link in &links {
        let name = page.read_text(link).await.ok();
        let track_id = page
            .read_attribute(link, "href")
            .await
            .ok()
            .flatten()
            .and_then(|href| track_id_from_link(&href));
        tracks.push(TrackRecord::from_link(name, track_id));
    }

    info!(count = tracks.len(), "extracted tracks from bare links");
    tracks
}
