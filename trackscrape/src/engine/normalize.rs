use super::types::{NormalizedTrack, TrackRecord};

/// Parse a displayed play count. Thousands separators are stripped; anything
/// else that does not parse (abbreviations like `1.2M`, `N/A`, empty) is 0.
pub fn clean_stream_count(text: &str) -> u64 {
    text.trim().replace(',', "").parse().unwrap_or(0)
}

/// Track identifier from a permalink: its last path segment.
pub fn track_id_from_link(href: &str) -> Option<String> {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    path.split('/')
        .rfind(|segment| !segment.is_empty())
        .map(ToString::to_string)
}

pub fn normalize(record: TrackRecord) -> NormalizedTrack {
    let stream_count_numeric = clean_stream_count(&record.stream_count);
    NormalizedTrack {
        record,
        stream_count_numeric,
    }
}

pub fn total_streams(tracks: &[NormalizedTrack]) -> u64 {
    tracks
        .iter()
        .fold(0u64, |sum, t| sum.saturating_add(t.stream_count_numeric))
}
