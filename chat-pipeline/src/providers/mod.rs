use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod google;
pub mod query_builder;
pub mod tmdb;

/// One hit from an external source, already flattened to what synthesis and
/// the listing fallback need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

/// An escalation stage beyond the local database. Every failure mode
/// (missing credentials, timeouts, unusable responses) is reported as a
/// miss so the controller can move on to the next stage.
#[async_trait]
pub trait ExternalSearch: Send + Sync {
    fn label(&self) -> &'static str;

    async fn search(&self, query: &str) -> Option<Vec<ExternalResult>>;
}
