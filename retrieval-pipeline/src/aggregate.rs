use std::collections::HashMap;

use tracing::debug;

use common::{
    error::AppError,
    storage::{db::SurrealDbClient, types::movie::Movie},
};

use crate::{RetrievedMovie, ScoredChunk};

/// Cap on movies returned to answer synthesis.
pub const AGGREGATE_RESULT_LIMIT: usize = 5;

/// A canonical record must carry a real synopsis before it is preferred
/// over chunk-level evidence.
const FULL_OVERVIEW_MIN_CHARS: usize = 50;

/// Collapses chunk hits into distinct movies.
///
/// One representative chunk survives per title: the highest-scoring one,
/// with scored chunks always beating unscored ones and the first-seen chunk
/// winning ties. Titles are then resolved against the `movie` table so the
/// answer context gets canonical metadata; movies whose records are too thin
/// are dropped, and if nothing canonical survives the chunk representatives
/// themselves are returned.
pub async fn aggregate_by_movie(
    chunks: Vec<ScoredChunk>,
    db: &SurrealDbClient,
    limit: usize,
) -> Result<Vec<RetrievedMovie>, AppError> {
    if chunks.is_empty() {
        return Ok(Vec::new());
    }

    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, ScoredChunk> = HashMap::new();
    for candidate in chunks {
        let key = candidate.chunk.movie_title.clone();
        match best.get(&key) {
            None => {
                order.push(key.clone());
                best.insert(key, candidate);
            }
            Some(existing) => {
                let replace = match (candidate.score, existing.score) {
                    (Some(new), Some(old)) => new > old,
                    (Some(_), None) => true,
                    _ => false,
                };
                if replace {
                    best.insert(key, candidate);
                }
            }
        }
    }

    let movies = Movie::find_by_titles(order.clone(), limit, db).await?;
    let movie_map: HashMap<&str, &Movie> =
        movies.iter().map(|m| (m.title.as_str(), m)).collect();

    let full_titles: Vec<&String> = order
        .iter()
        .filter(|title| {
            movie_map.get(title.as_str()).is_some_and(|movie| {
                movie.overview.chars().count() > FULL_OVERVIEW_MIN_CHARS
                    && movie.has_structured_metadata()
            })
        })
        .collect();

    debug!(
        distinct_titles = order.len(),
        resolved = movies.len(),
        full_records = full_titles.len(),
        "Aggregated chunk hits into movies"
    );

    let mut results: Vec<RetrievedMovie> = if !full_titles.is_empty() {
        full_titles
            .into_iter()
            .map(|title| {
                let representative = &best[title];
                RetrievedMovie::from_movie(movie_map[title.as_str()], representative)
            })
            .collect()
    } else if !movies.is_empty() {
        order
            .iter()
            .filter_map(|title| {
                movie_map
                    .get(title.as_str())
                    .map(|movie| RetrievedMovie::from_movie(movie, &best[title]))
            })
            .collect()
    } else {
        order
            .iter()
            .map(|title| RetrievedMovie::from_chunk(&best[title]))
            .collect()
    };

    results.truncate(limit);
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SearchSource;
    use common::storage::types::{
        movie::{CastCrew, Credit},
        movie_chunk::{MovieChunk, MovieMetadata},
    };
    use uuid::Uuid;

    fn scored(title: &str, score: Option<f32>) -> ScoredChunk {
        let metadata = MovieMetadata {
            title: title.into(),
            overview: format!("chunk-level synopsis of {title}"),
            release_date: Some("2010-07-16".into()),
            vote_average: Some(8.0),
            genres: vec!["Drama".into()],
            keywords: Vec::new(),
            cast_crew: CastCrew::default(),
        };
        ScoredChunk {
            chunk: MovieChunk::new(title.into(), 0, 1, "text".into(), Vec::new(), metadata),
            score,
            source: SearchSource::Vector,
        }
    }

    fn full_movie(title: &str) -> Movie {
        Movie::new(
            title.into(),
            "A long canonical overview that easily clears the minimum synopsis \
             length required for a full record."
                .into(),
            Some("2010-07-16".into()),
            Some(8.8),
            vec!["Sci-Fi".into()],
            vec!["dream".into()],
            CastCrew {
                cast: vec![Credit {
                    name: "Leonardo DiCaprio".into(),
                    role: "Cobb".into(),
                }],
                crew: vec![Credit {
                    name: "Christopher Nolan".into(),
                    role: "Director".into(),
                }],
            },
        )
    }

    #[tokio::test]
    async fn keeps_best_chunk_per_title_and_bounds_results() {
        let namespace = "aggregate_test_ns";
        let database = &Uuid::new_v4().to_string();
        let db = SurrealDbClient::memory(namespace, database)
            .await
            .expect("failed to create in-memory surreal");

        let mut chunks = vec![
            scored("Inception", Some(0.4)),
            scored("Inception", Some(0.9)),
            scored("Inception", None),
        ];
        for i in 0..6 {
            chunks.push(scored(&format!("Movie {i}"), Some(0.5)));
        }

        let results = aggregate_by_movie(chunks, &db, AGGREGATE_RESULT_LIMIT)
            .await
            .expect("aggregation failed");

        assert_eq!(results.len(), AGGREGATE_RESULT_LIMIT);
        let inception = results
            .iter()
            .find(|m| m.metadata.title == "Inception")
            .expect("Inception should survive aggregation");
        assert_eq!(inception.score, Some(0.9));
    }

    #[tokio::test]
    async fn prefers_canonical_records_when_available() {
        let namespace = "aggregate_full_test_ns";
        let database = &Uuid::new_v4().to_string();
        let db = SurrealDbClient::memory(namespace, database)
            .await
            .expect("failed to create in-memory surreal");

        db.store_item(full_movie("Inception"))
            .await
            .expect("insert failed");

        let results = aggregate_by_movie(
            vec![scored("Inception", Some(0.8)), scored("Ghost", Some(0.7))],
            &db,
            AGGREGATE_RESULT_LIMIT,
        )
        .await
        .expect("aggregation failed");

        // "Ghost" resolves to nothing; only the canonical record survives.
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].metadata.title, "Inception");
        assert_eq!(results[0].metadata.director(), Some("Christopher Nolan"));
        assert!(results[0].metadata.overview.contains("canonical overview"));
    }

    #[tokio::test]
    async fn falls_back_to_chunk_evidence_when_no_record_resolves() {
        let namespace = "aggregate_chunk_test_ns";
        let database = &Uuid::new_v4().to_string();
        let db = SurrealDbClient::memory(namespace, database)
            .await
            .expect("failed to create in-memory surreal");

        let results = aggregate_by_movie(
            vec![scored("Unknown Film", Some(0.6))],
            &db,
            AGGREGATE_RESULT_LIMIT,
        )
        .await
        .expect("aggregation failed");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].metadata.title, "Unknown Film");
        assert!(results[0].metadata.overview.contains("chunk-level synopsis"));
    }
}
