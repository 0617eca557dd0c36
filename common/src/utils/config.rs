use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Remote embedding endpoint speaking `{"inputs": ...}`.
    Remote,
    /// OpenAI-compatible embeddings API.
    Openai,
    /// Deterministic in-process vectors, for tests and offline use.
    Hashed,
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    pub surrealdb_address: String,
    pub surrealdb_username: String,
    pub surrealdb_password: String,
    pub surrealdb_namespace: String,
    pub surrealdb_database: String,
    pub http_port: u16,

    pub openrouter_api_key: String,
    #[serde(default = "default_openrouter_base_url")]
    pub openrouter_base_url: String,
    #[serde(default = "default_model_priority")]
    pub model_priority: Vec<String>,

    #[serde(default = "default_embedding_backend")]
    pub embedding_backend: EmbeddingBackend,
    #[serde(default = "default_embedding_api_url")]
    pub embedding_api_url: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    pub tmdb_api_key: Option<String>,
    #[serde(default = "default_tmdb_base_url")]
    pub tmdb_base_url: String,
    pub serp_api_key: Option<String>,
    #[serde(default = "default_serp_base_url")]
    pub serp_base_url: String,

    #[serde(default = "default_max_history")]
    pub max_history: usize,
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
    #[serde(default)]
    pub hide_overview: bool,
}

fn default_openrouter_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

/// Ordered by preference; the invoker walks this list top to bottom.
fn default_model_priority() -> Vec<String> {
    vec![
        "meta-llama/llama-3.3-70b-instruct:free".to_string(),
        "z-ai/glm-4.5-air:free".to_string(),
        "qwen/qwen-2.5-vl-7b-instruct:free".to_string(),
        "xiaomi/mimo-v2-flash:free".to_string(),
    ]
}

fn default_embedding_backend() -> EmbeddingBackend {
    EmbeddingBackend::Remote
}

fn default_embedding_api_url() -> String {
    "http://localhost:8000/embed".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimensions() -> usize {
    384
}

fn default_tmdb_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_serp_base_url() -> String {
    "https://serpapi.com/search.json".to_string()
}

fn default_max_history() -> usize {
    10
}

fn default_session_idle_secs() -> u64 {
    3600
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
