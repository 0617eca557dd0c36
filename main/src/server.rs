use std::{sync::Arc, time::Duration};

use api_router::{api_routes_v1, api_state::ApiState};
use axum::{extract::FromRef, Router};
use chat_pipeline::{
    fallback::{FallbackInvoker, OpenRouterBackend},
    providers::{google::GoogleSearch, tmdb::TmdbSearch},
    EscalationController, SessionStore,
};
use common::{
    storage::db::SurrealDbClient,
    utils::{config::get_config, embedding::EmbeddingProvider},
};
use retrieval_pipeline::HybridRetrievalEngine;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Clone, FromRef)]
struct AppState {
    api_state: ApiState,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    // Get config
    let config = get_config()?;

    let db = Arc::new(
        SurrealDbClient::new(
            &config.surrealdb_address,
            &config.surrealdb_username,
            &config.surrealdb_password,
            &config.surrealdb_namespace,
            &config.surrealdb_database,
        )
        .await?,
    );

    // Ensure db is initialized
    db.ensure_indexes(config.embedding_dimensions).await?;

    let openrouter_client = Arc::new(async_openai::Client::with_config(
        async_openai::config::OpenAIConfig::new()
            .with_api_key(&config.openrouter_api_key)
            .with_api_base(&config.openrouter_base_url),
    ));

    let embedding_provider = Arc::new(EmbeddingProvider::from_config(
        &config,
        Some(openrouter_client),
    )?);
    info!(
        embedding_backend = embedding_provider.backend_label(),
        embedding_dimension = embedding_provider.dimension(),
        "Embedding provider initialized"
    );

    let retrieval = Arc::new(HybridRetrievalEngine::new(db.clone(), embedding_provider));
    let sessions = Arc::new(SessionStore::new(
        config.max_history,
        Duration::from_secs(config.session_idle_secs),
    ));
    let invoker = Arc::new(FallbackInvoker::new(
        Arc::new(OpenRouterBackend::new(
            &config.openrouter_api_key,
            &config.openrouter_base_url,
        )),
        config.model_priority.clone(),
    ));
    let tmdb = Arc::new(TmdbSearch::new(
        config.tmdb_api_key.clone(),
        config.tmdb_base_url.clone(),
    ));
    let web = Arc::new(GoogleSearch::new(
        config.serp_api_key.clone(),
        config.serp_base_url.clone(),
    ));
    let chat = Arc::new(EscalationController::new(
        retrieval,
        sessions.clone(),
        invoker,
        tmdb,
        web,
        config.hide_overview,
    ));

    let api_state = ApiState::new(db, sessions, chat);

    // Create Axum router
    let app = Router::new()
        .merge(api_routes_v1())
        .with_state(AppState { api_state });

    info!("Starting server listening on 0.0.0.0:{}", config.http_port);
    let serve_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
