use std::collections::HashMap;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use crate::api_state::ApiState;

/// Indexes the retrieval pipeline depends on; defined at startup by
/// `ensure_indexes`.
const REQUIRED_INDEXES: &[&str] = &["idx_movie_chunk_identity", "idx_embedding_movie_chunk"];

#[derive(Deserialize)]
struct TableInfo {
    #[serde(default)]
    indexes: HashMap<String, String>,
}

/// Readiness probe: returns 200 when the database answers and the
/// `movie_chunk` indexes are defined, else 503.
pub async fn ready(State(state): State<ApiState>) -> impl IntoResponse {
    let outcome = match state.db.client.query("INFO FOR TABLE movie_chunk").await {
        Ok(mut response) => response
            .take::<Option<TableInfo>>(0)
            .map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match outcome {
        Ok(info) => {
            let indexes = info.map(|table| table.indexes).unwrap_or_default();
            let missing: Vec<&str> = REQUIRED_INDEXES
                .iter()
                .copied()
                .filter(|name| !indexes.contains_key(*name))
                .collect();

            if missing.is_empty() {
                (
                    StatusCode::OK,
                    Json(json!({
                        "status": "ok",
                        "checks": { "db": "ok", "chunk_indexes": "ok" }
                    })),
                )
            } else {
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({
                        "status": "error",
                        "checks": { "db": "ok", "chunk_indexes": "missing" },
                        "missing_indexes": missing
                    })),
                )
            }
        }
        Err(reason) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "error",
                "checks": { "db": "fail" },
                "reason": reason
            })),
        ),
    }
}
