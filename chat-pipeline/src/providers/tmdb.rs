use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{
    query_builder::{build_tmdb_query, TmdbQuery},
    ExternalResult, ExternalSearch,
};

const SEARCH_TIMEOUT: Duration = Duration::from_secs(5);
const DETAIL_TIMEOUT: Duration = Duration::from_secs(3);
const RESULT_LIMIT: usize = 5;
/// Discover only considers movies with a meaningful vote sample.
const MIN_VOTE_COUNT: u32 = 200;

#[derive(Debug, Deserialize)]
struct TmdbPage {
    #[serde(default)]
    results: Vec<TmdbListItem>,
}

#[derive(Debug, Deserialize)]
struct TmdbListItem {
    id: u64,
    title: String,
    release_date: Option<String>,
    vote_average: Option<f32>,
    overview: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbDetail {
    title: String,
    release_date: Option<String>,
    vote_average: Option<f32>,
    overview: Option<String>,
    #[serde(default)]
    genres: Vec<TmdbGenre>,
    credits: Option<TmdbCredits>,
}

#[derive(Debug, Deserialize)]
struct TmdbGenre {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TmdbCredits {
    #[serde(default)]
    cast: Vec<TmdbCastMember>,
    #[serde(default)]
    crew: Vec<TmdbCrewMember>,
}

#[derive(Debug, Deserialize)]
struct TmdbCastMember {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TmdbCrewMember {
    name: String,
    job: String,
}

/// TMDB metadata lookup: Discover for genre questions, title search
/// otherwise, each hit enriched with a credits detail call.
pub struct TmdbSearch {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl TmdbSearch {
    pub fn new(api_key: Option<String>, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url,
        }
    }

    async fn fetch_page(
        &self,
        api_key: &str,
        request: &TmdbQuery,
    ) -> Result<TmdbPage, reqwest::Error> {
        let mut params: Vec<(&str, String)> = vec![
            ("api_key", api_key.to_owned()),
            ("language", "vi-VN".to_owned()),
            ("page", "1".to_owned()),
        ];
        let endpoint = match request {
            TmdbQuery::Discover {
                genre_id,
                sort_by,
                year,
            } => {
                params.push(("with_genres", genre_id.to_string()));
                params.push(("sort_by", (*sort_by).to_owned()));
                params.push(("vote_count.gte", MIN_VOTE_COUNT.to_string()));
                if let Some(year) = year {
                    params.push(("primary_release_year", year.to_string()));
                }
                "discover/movie"
            }
            TmdbQuery::SearchTitle { query } => {
                params.push(("query", query.clone()));
                params.push(("include_adult", "false".to_owned()));
                "search/movie"
            }
        };

        debug!(endpoint, "Querying TMDB");
        self.http
            .get(format!("{}/{}", self.base_url, endpoint))
            .query(&params)
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    async fn fetch_detail(&self, api_key: &str, movie_id: u64) -> Result<TmdbDetail, reqwest::Error> {
        self.http
            .get(format!("{}/movie/{}", self.base_url, movie_id))
            .query(&[
                ("api_key", api_key),
                ("language", "vi-VN"),
                ("append_to_response", "credits"),
            ])
            .timeout(DETAIL_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    fn detail_result(item_id: u64, detail: &TmdbDetail) -> ExternalResult {
        let year = release_year(detail.release_date.as_deref());
        let rating = rating_line(detail.vote_average);
        let director = detail
            .credits
            .as_ref()
            .and_then(|credits| credits.crew.iter().find(|member| member.job == "Director"))
            .map_or("N/A", |member| member.name.as_str());
        let cast = detail
            .credits
            .as_ref()
            .map(|credits| {
                credits
                    .cast
                    .iter()
                    .take(3)
                    .map(|member| member.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .filter(|names| !names.is_empty())
            .unwrap_or_else(|| "N/A".to_owned());
        let genres = if detail.genres.is_empty() {
            "N/A".to_owned()
        } else {
            detail
                .genres
                .iter()
                .take(2)
                .map(|genre| genre.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        let overview = detail.overview.as_deref().unwrap_or("Chưa có mô tả");

        ExternalResult {
            title: format!("{} ({})", detail.title, year),
            link: movie_link(item_id),
            snippet: format!(
                "{genres}\n**Đạo diễn:** {director}\n**Diễn viên:** {cast}\n{rating}\n\n{overview}"
            ),
        }
    }

    fn list_result(item: &TmdbListItem) -> ExternalResult {
        let year = release_year(item.release_date.as_deref());
        let rating = rating_line(item.vote_average);
        let overview = item.overview.as_deref().unwrap_or("Chưa có mô tả");
        ExternalResult {
            title: format!("{} ({})", item.title, year),
            link: movie_link(item.id),
            snippet: format!("{rating}\n{overview}"),
        }
    }
}

fn release_year(release_date: Option<&str>) -> String {
    release_date
        .and_then(|date| date.split('-').next())
        .filter(|year| !year.is_empty())
        .unwrap_or("N/A")
        .to_owned()
}

fn rating_line(vote_average: Option<f32>) -> String {
    vote_average.map_or_else(String::new, |average| format!("⭐ {average:.1}/10"))
}

fn movie_link(movie_id: u64) -> String {
    format!("https://www.themoviedb.org/movie/{movie_id}")
}

#[async_trait]
impl ExternalSearch for TmdbSearch {
    fn label(&self) -> &'static str {
        "tmdb"
    }

    async fn search(&self, query: &str) -> Option<Vec<ExternalResult>> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("TMDB api key not configured, skipping stage");
            return None;
        };
        let Some(request) = build_tmdb_query(query) else {
            debug!("No usable genre or title in question, skipping TMDB");
            return None;
        };

        let page = match self.fetch_page(api_key, &request).await {
            Ok(page) => page,
            Err(error) => {
                warn!("TMDB request failed: {error}");
                return None;
            }
        };

        let mut results = Vec::new();
        for item in page.results.iter().take(RESULT_LIMIT) {
            match self.fetch_detail(api_key, item.id).await {
                Ok(detail) => results.push(Self::detail_result(item.id, &detail)),
                Err(error) => {
                    warn!(movie_id = item.id, "TMDB detail lookup failed: {error}");
                    results.push(Self::list_result(item));
                }
            }
        }

        debug!(count = results.len(), "TMDB results assembled");
        (!results.is_empty()).then_some(results)
    }
}
