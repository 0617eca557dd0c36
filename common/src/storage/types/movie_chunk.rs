use uuid::Uuid;

use crate::{stored_object, utils::text::chunk_text};

use super::movie::{CastCrew, Movie};

/// Denormalized copy of the owning movie's descriptive fields, carried on
/// every chunk so retrieval can build entity summaries without a second
/// lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MovieMetadata {
    pub title: String,
    pub overview: String,
    pub release_date: Option<String>,
    pub vote_average: Option<f32>,
    pub genres: Vec<String>,
    pub keywords: Vec<String>,
    pub cast_crew: CastCrew,
}

impl MovieMetadata {
    pub fn director(&self) -> Option<&str> {
        self.cast_crew
            .crew
            .iter()
            .find(|credit| credit.role == "Director")
            .map(|credit| credit.name.as_str())
    }

    pub fn top_cast(&self, count: usize) -> String {
        self.cast_crew
            .cast
            .iter()
            .take(count)
            .map(|credit| credit.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

}

impl From<&Movie> for MovieMetadata {
    fn from(movie: &Movie) -> Self {
        Self {
            title: movie.title.clone(),
            overview: movie.overview.clone(),
            release_date: movie.release_date.clone(),
            vote_average: movie.vote_average,
            genres: movie.genres.clone(),
            keywords: movie.keywords.clone(),
            cast_crew: movie.cast_crew.clone(),
        }
    }
}

stored_object!(MovieChunk, "movie_chunk", {
    movie_title: String,
    chunk_index: u32,
    chunk_total: u32,
    chunk_text: String,
    embedding: Vec<f32>,
    metadata: MovieMetadata,
    search_text: String
});

impl MovieChunk {
    pub fn new(
        movie_title: String,
        chunk_index: u32,
        chunk_total: u32,
        text: String,
        embedding: Vec<f32>,
        metadata: MovieMetadata,
    ) -> Self {
        let now = Utc::now();
        let search_text = build_search_text(&metadata);
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            movie_title,
            chunk_index,
            chunk_total,
            chunk_text: text,
            embedding,
            metadata,
            search_text,
        }
    }

    /// Splits a movie's overview into overlapping windows and pairs each
    /// window with its embedding. Indices are contiguous `0..total`.
    pub fn explode(movie: &Movie, embeddings: Vec<Vec<f32>>) -> Vec<MovieChunk> {
        let windows = chunk_text(&movie.overview);
        let total = windows.len() as u32;
        let metadata = MovieMetadata::from(movie);

        windows
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (text, embedding))| {
                Self::new(
                    movie.title.clone(),
                    index as u32,
                    total,
                    text,
                    embedding,
                    metadata.clone(),
                )
            })
            .collect()
    }
}

/// Lowercased haystack for keyword matching: title, overview, genre names,
/// keyword names, cast names and crew names.
fn build_search_text(metadata: &MovieMetadata) -> String {
    let mut parts = vec![metadata.title.clone(), metadata.overview.clone()];
    parts.extend(metadata.genres.iter().cloned());
    parts.extend(metadata.keywords.iter().cloned());
    parts.extend(metadata.cast_crew.cast.iter().map(|c| c.name.clone()));
    parts.extend(metadata.cast_crew.crew.iter().map(|c| c.name.clone()));
    parts.join(" ").to_lowercase()
}
