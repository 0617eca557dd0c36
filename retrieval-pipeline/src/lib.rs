use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::{
            movie::Movie,
            movie_chunk::{MovieChunk, MovieMetadata},
        },
    },
    utils::embedding::EmbeddingProvider,
};

pub mod aggregate;
pub mod keyword;
pub mod strategy;
pub mod vector;

use aggregate::{aggregate_by_movie, AGGREGATE_RESULT_LIMIT};
use keyword::{find_chunks_by_keywords, KEYWORD_RESULT_LIMIT};
use strategy::{classify, SearchStrategy};
use vector::VectorSearchEngine;

/// Which search arm produced a piece of evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    Vector,
    Regex,
}

/// A chunk hit before entity aggregation. Keyword hits carry no score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: MovieChunk,
    pub score: Option<f32>,
    pub source: SearchSource,
}

/// A distinct movie surviving aggregation, ready for answer synthesis.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedMovie {
    #[serde(flatten)]
    pub metadata: MovieMetadata,
    pub score: Option<f32>,
    pub source: SearchSource,
}

impl RetrievedMovie {
    fn from_movie(movie: &Movie, representative: &ScoredChunk) -> Self {
        Self {
            metadata: MovieMetadata::from(movie),
            score: representative.score,
            source: representative.source,
        }
    }

    fn from_chunk(representative: &ScoredChunk) -> Self {
        Self {
            metadata: representative.chunk.metadata.clone(),
            score: representative.score,
            source: representative.source,
        }
    }
}

/// Entry point for evidence retrieval: strategy detection, the keyword and
/// vector search arms, and chunk-to-movie aggregation.
pub struct HybridRetrievalEngine {
    db: Arc<SurrealDbClient>,
    vector: VectorSearchEngine,
}

impl HybridRetrievalEngine {
    pub fn new(db: Arc<SurrealDbClient>, embedder: Arc<EmbeddingProvider>) -> Self {
        let vector = VectorSearchEngine::new(db.clone(), embedder);
        Self { db, vector }
    }

    /// Retrieves up to [`AGGREGATE_RESULT_LIMIT`] distinct movies relevant to
    /// the question. A blank question short-circuits to an empty result.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedMovie>, AppError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let strategy = classify(query);
        debug!(?strategy, "Retrieving evidence");

        match strategy {
            SearchStrategy::Keyword => self.keyword_arm(query).await,
            SearchStrategy::Semantic => {
                let movies = self.vector_arm(query).await?;
                if movies.is_empty() {
                    // Nothing semantic matched; exact matching may still hit
                    // a title or a name.
                    self.keyword_arm(query).await
                } else {
                    Ok(movies)
                }
            }
            SearchStrategy::Hybrid => {
                let (vector_movies, keyword_movies) =
                    tokio::join!(self.vector_arm(query), self.keyword_arm(query));
                let vector_movies = vector_movies.unwrap_or_else(|error| {
                    warn!("Vector arm failed during hybrid retrieval: {error}");
                    Vec::new()
                });
                let keyword_movies = keyword_movies.unwrap_or_else(|error| {
                    warn!("Keyword arm failed during hybrid retrieval: {error}");
                    Vec::new()
                });
                Ok(merge_arms(vector_movies, keyword_movies))
            }
        }
    }

    async fn keyword_arm(&self, query: &str) -> Result<Vec<RetrievedMovie>, AppError> {
        let chunks = find_chunks_by_keywords(query, &self.db, KEYWORD_RESULT_LIMIT).await?;
        let scored = chunks
            .into_iter()
            .map(|chunk| ScoredChunk {
                chunk,
                score: None,
                source: SearchSource::Regex,
            })
            .collect();
        aggregate_by_movie(scored, &self.db, AGGREGATE_RESULT_LIMIT).await
    }

    async fn vector_arm(&self, query: &str) -> Result<Vec<RetrievedMovie>, AppError> {
        let scored = self.vector.search(query).await?;
        aggregate_by_movie(scored, &self.db, AGGREGATE_RESULT_LIMIT).await
    }
}

/// Union of the two arms, vector hits first, deduplicated by title and
/// bounded to the aggregation limit.
fn merge_arms(
    vector_movies: Vec<RetrievedMovie>,
    keyword_movies: Vec<RetrievedMovie>,
) -> Vec<RetrievedMovie> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();
    for movie in vector_movies.into_iter().chain(keyword_movies) {
        if seen.insert(movie.metadata.title.clone()) {
            merged.push(movie);
        }
    }
    merged.truncate(AGGREGATE_RESULT_LIMIT);
    merged
}
