use tracing::debug;

use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::{movie_chunk::MovieChunk, StoredObject},
    },
};

/// Cap on raw chunk matches before entity aggregation.
pub const KEYWORD_RESULT_LIMIT: usize = 30;

/// Finds chunks whose precomputed `search_text` haystack contains any of the
/// question's lowercased tokens. Tokens keep their diacritics; the haystack
/// is stored lowercased, so matching is case-insensitive but accent-exact.
pub async fn find_chunks_by_keywords(
    query: &str,
    db: &SurrealDbClient,
    limit: usize,
) -> Result<Vec<MovieChunk>, AppError> {
    let tokens: Vec<String> = query
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let conditions: Vec<String> = (0..tokens.len())
        .map(|i| format!("string::contains(search_text, $token_{i})"))
        .collect();
    let sql = format!(
        "SELECT * FROM {table} WHERE {conditions} LIMIT $limit",
        table = MovieChunk::table_name(),
        conditions = conditions.join(" OR ")
    );

    debug!(token_count = tokens.len(), limit, "Executing keyword chunk search");

    let mut query_builder = db.query(sql).bind(("limit", limit as i64));
    for (i, token) in tokens.into_iter().enumerate() {
        query_builder = query_builder.bind((format!("token_{i}"), token));
    }

    let chunks: Vec<MovieChunk> = query_builder.await?.take(0)?;
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::storage::types::{movie::CastCrew, movie_chunk::MovieMetadata};
    use uuid::Uuid;

    fn chunk_for(title: &str, overview: &str) -> MovieChunk {
        let metadata = MovieMetadata {
            title: title.into(),
            overview: overview.into(),
            release_date: None,
            vote_average: None,
            genres: Vec::new(),
            keywords: Vec::new(),
            cast_crew: CastCrew::default(),
        };
        MovieChunk::new(title.into(), 0, 1, overview.into(), Vec::new(), metadata)
    }

    #[tokio::test]
    async fn matches_any_token_case_insensitively() {
        let namespace = "keyword_test_ns";
        let database = &Uuid::new_v4().to_string();
        let db = SurrealDbClient::memory(namespace, database)
            .await
            .expect("failed to create in-memory surreal");

        db.store_item(chunk_for("Heat", "A heist thriller in Los Angeles"))
            .await
            .expect("insert failed");
        db.store_item(chunk_for("Amelie", "A whimsical Parisian romance"))
            .await
            .expect("insert failed");

        let results = find_chunks_by_keywords("HEIST movie", &db, KEYWORD_RESULT_LIMIT)
            .await
            .expect("keyword search failed");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].movie_title, "Heat");
    }

    #[tokio::test]
    async fn blank_query_returns_nothing_without_querying() {
        let namespace = "keyword_test_ns_blank";
        let database = &Uuid::new_v4().to_string();
        let db = SurrealDbClient::memory(namespace, database)
            .await
            .expect("failed to create in-memory surreal");

        let results = find_chunks_by_keywords("  ?! ", &db, KEYWORD_RESULT_LIMIT)
            .await
            .expect("keyword search failed");
        assert!(results.is_empty());
    }
}
