use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::engine::{ArtistId, ExtractionResult, PageSource};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct ArtistQuery {
    #[serde(rename = "artistId", default)]
    pub artist_id: String,
}

/// JSON body for a successful extraction.
pub fn artist_report(id: &ArtistId, result: &ExtractionResult) -> Value {
    json!({
        "success": true,
        "artist": {
            "id": id,
            "name": result.artist_name(),
            "monthlyListeners": result.monthly_listeners(),
        },
        "tracks": result.tracks(),
        "stats": {
            "totalTracks": result.total_tracks(),
            "totalStreams": result.total_streams(),
        },
        "debug": {
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        },
    })
}

/// Extract one artist page: `GET /api?artistId=<id>`.
pub async fn artist<S: PageSource + 'static>(
    State(state): State<AppState<S>>,
    Query(query): Query<ArtistQuery>,
) -> Response {
    let Ok(id) = query.artist_id.parse::<ArtistId>() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid artist ID" })),
        )
            .into_response();
    };

    info!(artist_id = %id, "fetching artist page");

    match state.extractor.extract(state.source.as_ref(), &id).await {
        Ok(result) => (StatusCode::OK, Json(artist_report(&id, &result))).into_response(),
        Err(e) => {
            error!(artist_id = %id, error = %e, "extraction failed");

            let mut body = json!({
                "success": false,
                "error": e.to_string(),
            });
            if state.diagnostic {
                body["details"] = Value::String(format!("{:?}", anyhow::Error::new(e)));
            }
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "OK" }))
}
