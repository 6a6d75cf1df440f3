use axum::routing::get;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use match_analyzer::app_state::AppState;
use match_analyzer::auth::TokenVerifier;
use match_analyzer::config::AppConfig;
use match_analyzer::db::{self, PgJobStore};
use match_analyzer::routes;
use match_analyzer::services::{
    inference::InferenceClient, ollama::OllamaBackend, orchestrator::JobOrchestrator,
    pdf::PdfiumExtractor,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing match-analyzer server");

    let prometheus_handle =
        routes::metrics::install_recorder().expect("Failed to install Prometheus metrics recorder");

    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    let store = Arc::new(PgJobStore::new(db_pool));

    tracing::info!(
        base_url = %config.ollama_base_url,
        model = %config.ollama_model,
        "Initializing Ollama backend"
    );
    let backend =
        OllamaBackend::new(&config.ollama_base_url).expect("Failed to initialize Ollama client");
    let inference = InferenceClient::new(Arc::new(backend), config.inference_config());
    let orchestrator =
        JobOrchestrator::new(store.clone(), inference, config.orchestrator_config());

    let extractor = PdfiumExtractor::new(config.pdfium_lib_path.clone());
    let tokens = TokenVerifier::new(config.jwt_secret.as_bytes());

    let state = AppState::new(
        store,
        orchestrator,
        extractor,
        tokens,
        config.max_upload_bytes,
    );

    let body_limit = config.max_upload_bytes + routes::BODY_LIMIT_SLACK;
    let app = routes::router(state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(body_limit));

    tracing::info!("Starting match-analyzer on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
