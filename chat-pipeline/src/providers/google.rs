use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ExternalResult, ExternalSearch};

const SEARCH_TIMEOUT: Duration = Duration::from_secs(5);
const RESULT_LIMIT: usize = 5;

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    title: String,
    link: String,
    snippet: Option<String>,
}

/// Last escalation stage: Google web search through the SerpAPI JSON
/// endpoint.
pub struct GoogleSearch {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl GoogleSearch {
    pub fn new(api_key: Option<String>, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url,
        }
    }
}

#[async_trait]
impl ExternalSearch for GoogleSearch {
    fn label(&self) -> &'static str {
        "google"
    }

    async fn search(&self, query: &str) -> Option<Vec<ExternalResult>> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("SerpAPI key not configured, skipping stage");
            return None;
        };

        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("api_key", api_key),
                ("num", "5"),
            ])
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await;

        let parsed: SerpResponse = match response {
            Ok(response) => match response.error_for_status() {
                Ok(response) => match response.json().await {
                    Ok(parsed) => parsed,
                    Err(error) => {
                        warn!("SerpAPI returned an unreadable body: {error}");
                        return None;
                    }
                },
                Err(error) => {
                    warn!("SerpAPI request rejected: {error}");
                    return None;
                }
            },
            Err(error) => {
                warn!("SerpAPI request failed: {error}");
                return None;
            }
        };

        let results: Vec<ExternalResult> = parsed
            .organic_results
            .into_iter()
            .take(RESULT_LIMIT)
            .map(|item| ExternalResult {
                title: item.title,
                link: item.link,
                snippet: item.snippet.unwrap_or_default(),
            })
            .collect();

        debug!(count = results.len(), "Google results assembled");
        (!results.is_empty()).then_some(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organic_results_deserialize_with_optional_snippets() {
        let body = r#"{
            "organic_results": [
                {"title": "Inception - Wikipedia", "link": "https://vi.wikipedia.org/wiki/Inception", "snippet": "Phim khoa học viễn tưởng"},
                {"title": "Inception (2010)", "link": "https://www.imdb.com/title/tt1375666/"}
            ]
        }"#;
        let parsed: SerpResponse = serde_json::from_str(body).expect("deserialization failed");
        assert_eq!(parsed.organic_results.len(), 2);
        assert!(parsed.organic_results[1].snippet.is_none());
    }

    #[test]
    fn empty_body_deserializes_to_no_results() {
        let parsed: SerpResponse = serde_json::from_str("{}").expect("deserialization failed");
        assert!(parsed.organic_results.is_empty());
    }

    #[tokio::test]
    async fn missing_api_key_is_a_miss() {
        let search = GoogleSearch::new(None, "https://serpapi.com/search.json".to_owned());
        assert!(search.search("phim hay").await.is_none());
    }
}
