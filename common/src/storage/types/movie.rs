use uuid::Uuid;

use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};

/// One cast or crew entry. For crew members `role` is the job title
/// ("Director", "Producer", ...); for cast members it is the character.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credit {
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CastCrew {
    pub cast: Vec<Credit>,
    pub crew: Vec<Credit>,
}

stored_object!(Movie, "movie", {
    title: String,
    overview: String,
    release_date: Option<String>,
    vote_average: Option<f32>,
    genres: Vec<String>,
    keywords: Vec<String>,
    cast_crew: CastCrew
});

impl Movie {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        title: String,
        overview: String,
        release_date: Option<String>,
        vote_average: Option<f32>,
        genres: Vec<String>,
        keywords: Vec<String>,
        cast_crew: CastCrew,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            title,
            overview,
            release_date,
            vote_average,
            genres,
            keywords,
            cast_crew,
        }
    }

    /// Whether the record carries enough structure to serve as a canonical
    /// entity-level answer (as opposed to a bare chunk representative).
    pub fn has_structured_metadata(&self) -> bool {
        !self.cast_crew.cast.is_empty()
            || !self.cast_crew.crew.is_empty()
            || !self.genres.is_empty()
    }

    /// Exact-match lookup by a list of titles, bounded.
    pub async fn find_by_titles(
        titles: Vec<String>,
        limit: usize,
        db: &SurrealDbClient,
    ) -> Result<Vec<Movie>, AppError> {
        if titles.is_empty() {
            return Ok(Vec::new());
        }

        let movies: Vec<Movie> = db
            .query("SELECT * FROM type::table($table) WHERE title IN $titles LIMIT $limit")
            .bind(("table", Self::table_name()))
            .bind(("titles", titles))
            .bind(("limit", limit as i64))
            .await?
            .take(0)?;

        Ok(movies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_movie() -> Movie {
        Movie::new(
            "Inception".into(),
            "A thief who steals corporate secrets through dream-sharing technology.".into(),
            Some("2010-07-16".into()),
            Some(8.3),
            vec!["Science Fiction".into(), "Action".into()],
            vec!["dream".into(), "heist".into()],
            CastCrew {
                cast: vec![
                    Credit {
                        name: "Leonardo DiCaprio".into(),
                        role: "Cobb".into(),
                    },
                    Credit {
                        name: "Joseph Gordon-Levitt".into(),
                        role: "Arthur".into(),
                    },
                ],
                crew: vec![Credit {
                    name: "Christopher Nolan".into(),
                    role: "Director".into(),
                }],
            },
        )
    }

    #[test]
    fn structured_metadata_requires_credits_or_genres() {
        let movie = sample_movie();
        assert!(movie.has_structured_metadata());

        let mut bare = sample_movie();
        bare.genres.clear();
        bare.cast_crew = CastCrew::default();
        assert!(!bare.has_structured_metadata());
    }

    #[tokio::test]
    async fn find_by_titles_returns_matches_only() {
        let namespace = "test_ns";
        let database = &Uuid::new_v4().to_string();
        let db = SurrealDbClient::memory(namespace, database)
            .await
            .expect("Failed to start in-memory surrealdb");

        let movie = sample_movie();
        db.store_item(movie.clone())
            .await
            .expect("Failed to store movie");

        let found = Movie::find_by_titles(vec!["Inception".into(), "Missing".into()], 5, &db)
            .await
            .expect("Lookup failed");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Inception");

        let none = Movie::find_by_titles(Vec::new(), 5, &db)
            .await
            .expect("Empty lookup failed");
        assert!(none.is_empty());
    }
}
