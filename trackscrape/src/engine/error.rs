use std::time::Duration;

use thiserror::Error;

use super::page::PageError;

/// Errors that abort an extraction request.
///
/// Everything else (unresolved fields, unreadable rows, incomplete
/// expansion) degrades to sentinel values instead.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid artist ID '{0}': expected 22 alphanumeric characters")]
    InvalidArtistId(String),
    #[error("page {url} did not load within {timeout:?}")]
    LoadTimeout { url: String, timeout: Duration },
    #[error("failed to load page {url}")]
    Load {
        url: String,
        #[source]
        source: PageError,
    },
    #[error("could not find the track list with any of {tried} known selectors")]
    ContainerNotFound { tried: usize },
}
