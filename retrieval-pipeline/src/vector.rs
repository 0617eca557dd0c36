use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use serde::Deserialize;
use surrealdb::sql::Thing;
use tracing::{debug, warn};

use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::{
            movie_chunk::{deserialize_flexible_id, MovieChunk},
            StoredObject,
        },
    },
    utils::embedding::EmbeddingProvider,
};

use crate::{ScoredChunk, SearchSource};

/// Neighbours requested from the vector index.
pub const VECTOR_RESULT_LIMIT: usize = 20;
/// HNSW search effort.
const KNN_EF: usize = 100;

#[derive(Debug, Deserialize)]
struct KnnScoreRow {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    id: String,
    distance: Option<f32>,
}

/// Semantic chunk search backed by the HNSW index, with an exhaustive
/// cosine scan as fallback when the index cannot serve the query.
///
/// Queries probe the index until it yields a definitive signal: a non-empty
/// native result caches the index as usable, a structural error caches the
/// scan path. An unindexed table answers a KNN query with zero rows rather
/// than an error, so an empty native result proves nothing and the scan
/// answers instead, leaving the probe undecided.
pub struct VectorSearchEngine {
    db: Arc<SurrealDbClient>,
    embedder: Arc<EmbeddingProvider>,
    index_available: OnceLock<bool>,
}

impl VectorSearchEngine {
    pub fn new(db: Arc<SurrealDbClient>, embedder: Arc<EmbeddingProvider>) -> Self {
        Self {
            db,
            embedder,
            index_available: OnceLock::new(),
        }
    }

    /// Returns up to [`VECTOR_RESULT_LIMIT`] chunks scored by similarity in
    /// `[0, 1]`, best first. An embedding failure degrades to an empty
    /// result so the keyword arm can still answer.
    pub async fn search(&self, query: &str) -> Result<Vec<ScoredChunk>, AppError> {
        let embedding = match self.embedder.embed(query).await {
            Ok(embedding) if !embedding.is_empty() => embedding,
            Ok(_) => {
                debug!("Embedding backend returned an empty vector, skipping vector search");
                return Ok(Vec::new());
            }
            Err(error) => {
                warn!("Embedding generation failed, skipping vector search: {error}");
                return Ok(Vec::new());
            }
        };

        match self.index_available.get() {
            Some(true) => self.knn(embedding).await,
            Some(false) => self.scan(&embedding).await,
            None => match self.knn(embedding.clone()).await {
                Ok(results) if !results.is_empty() => {
                    let _ = self.index_available.set(true);
                    Ok(results)
                }
                Ok(_) => self.scan(&embedding).await,
                Err(error) => {
                    warn!("Vector index unavailable, falling back to exhaustive scan: {error}");
                    let _ = self.index_available.set(false);
                    self.scan(&embedding).await
                }
            },
        }
    }

    async fn knn(&self, embedding: Vec<f32>) -> Result<Vec<ScoredChunk>, AppError> {
        let sql = format!(
            "SELECT id, vector::distance::knn() AS distance FROM {table} \
             WHERE embedding <|{take},{ef}|> $embedding ORDER BY distance",
            table = MovieChunk::table_name(),
            take = VECTOR_RESULT_LIMIT,
            ef = KNN_EF,
        );

        let mut response = self.db.query(sql).bind(("embedding", embedding)).await?;
        let score_rows: Vec<KnnScoreRow> = response.take(0)?;
        if score_rows.is_empty() {
            return Ok(Vec::new());
        }

        let thing_ids: Vec<Thing> = score_rows
            .iter()
            .map(|row| Thing::from((MovieChunk::table_name(), row.id.as_str())))
            .collect();
        let mut items_response = self
            .db
            .query("SELECT * FROM type::table($table) WHERE id IN $things")
            .bind(("table", MovieChunk::table_name().to_owned()))
            .bind(("things", thing_ids))
            .await?;
        let items: Vec<MovieChunk> = items_response.take(0)?;

        let mut item_map: HashMap<String, MovieChunk> = items
            .into_iter()
            .map(|item| (item.get_id().to_owned(), item))
            .collect();

        let mut results = Vec::with_capacity(score_rows.len());
        for row in score_rows {
            if let Some(chunk) = item_map.remove(&row.id) {
                let similarity = (1.0 - row.distance.unwrap_or(1.0)).clamp(0.0, 1.0);
                results.push(ScoredChunk {
                    chunk,
                    score: Some(similarity),
                    source: SearchSource::Vector,
                });
            }
        }
        Ok(results)
    }

    async fn scan(&self, embedding: &[f32]) -> Result<Vec<ScoredChunk>, AppError> {
        let chunks: Vec<MovieChunk> = self
            .db
            .query("SELECT * FROM type::table($table)")
            .bind(("table", MovieChunk::table_name().to_owned()))
            .await?
            .take(0)?;

        debug!(candidates = chunks.len(), "Scoring chunks with exhaustive cosine scan");

        let mut scored: Vec<ScoredChunk> = chunks
            .into_iter()
            .filter(|chunk| !chunk.embedding.is_empty())
            .map(|chunk| {
                let similarity = cosine_similarity(embedding, &chunk.embedding);
                ScoredChunk {
                    chunk,
                    score: Some(similarity),
                    source: SearchSource::Vector,
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(VECTOR_RESULT_LIMIT);
        Ok(scored)
    }
}

/// Cosine similarity of two vectors. Mismatched lengths and zero-magnitude
/// vectors score `0.0` rather than erroring.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::storage::types::{movie::CastCrew, movie_chunk::MovieMetadata};
    use uuid::Uuid;

    #[test]
    fn cosine_handles_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn cosine_is_one_for_parallel_vectors() {
        let similarity = cosine_similarity(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert!((similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_is_zero_for_orthogonal_vectors() {
        let similarity = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]);
        assert!(similarity.abs() < 1e-6);
    }

    fn chunk_with_embedding(title: &str, embedding: Vec<f32>) -> MovieChunk {
        let metadata = MovieMetadata {
            title: title.into(),
            overview: "overview".into(),
            release_date: None,
            vote_average: None,
            genres: Vec::new(),
            keywords: Vec::new(),
            cast_crew: CastCrew::default(),
        };
        MovieChunk::new(title.into(), 0, 1, "text".into(), embedding, metadata)
    }

    #[tokio::test]
    async fn knn_search_orders_by_similarity() {
        let namespace = "vector_test_ns";
        let database = &Uuid::new_v4().to_string();
        let db = Arc::new(
            SurrealDbClient::memory(namespace, database)
                .await
                .expect("failed to create in-memory surreal"),
        );
        db.ensure_indexes(3).await.expect("failed to define indexes");

        db.store_item(chunk_with_embedding("Close", vec![1.0, 0.0, 0.0]))
            .await
            .expect("insert failed");
        db.store_item(chunk_with_embedding("Far", vec![0.0, 1.0, 0.0]))
            .await
            .expect("insert failed");

        let engine = VectorSearchEngine::new(db, Arc::new(EmbeddingProvider::new_hashed(3)));
        let results = engine.knn(vec![1.0, 0.0, 0.0]).await.expect("knn failed");

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.movie_title, "Close");
        assert!(results[0].score.unwrap() > results[1].score.unwrap());
    }

    #[tokio::test]
    async fn missing_index_serves_embedded_chunks_via_scan() {
        let namespace = "vector_unindexed_test_ns";
        let database = &Uuid::new_v4().to_string();
        let db = Arc::new(
            SurrealDbClient::memory(namespace, database)
                .await
                .expect("failed to create in-memory surreal"),
        );
        // No indexes defined: the KNN query succeeds with zero rows, which
        // must not be mistaken for a working index.
        db.store_item(chunk_with_embedding("Lone", vec![1.0, 0.0, 0.0]))
            .await
            .expect("insert failed");

        let engine = VectorSearchEngine::new(db, Arc::new(EmbeddingProvider::new_hashed(3)));

        let first = engine.search("lone movie").await.expect("search failed");
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].chunk.movie_title, "Lone");

        // The scan keeps answering on repeat queries too.
        let second = engine.search("lone movie").await.expect("search failed");
        assert_eq!(second.len(), 1);
        assert_ne!(engine.index_available.get(), Some(&true));
    }

    #[tokio::test]
    async fn scan_orders_by_cosine_and_skips_unembedded_chunks() {
        let namespace = "vector_scan_test_ns";
        let database = &Uuid::new_v4().to_string();
        let db = Arc::new(
            SurrealDbClient::memory(namespace, database)
                .await
                .expect("failed to create in-memory surreal"),
        );

        db.store_item(chunk_with_embedding("Close", vec![0.9, 0.1, 0.0]))
            .await
            .expect("insert failed");
        db.store_item(chunk_with_embedding("Far", vec![0.0, 0.0, 1.0]))
            .await
            .expect("insert failed");
        db.store_item(chunk_with_embedding("Unembedded", Vec::new()))
            .await
            .expect("insert failed");

        let engine = VectorSearchEngine::new(db, Arc::new(EmbeddingProvider::new_hashed(3)));
        let results = engine.scan(&[1.0, 0.0, 0.0]).await.expect("scan failed");

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.movie_title, "Close");
        assert_eq!(results[1].chunk.movie_title, "Far");
    }
}
