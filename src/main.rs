/// API сервер оценки квартир

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use flat_price::{AppSettings, FlatPrediction, FsArtifactStore, MinimalListingRequest, PriceService};

#[derive(Clone)]
struct AppState {
    service: Arc<PriceService>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Инициализация логирования
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = AppSettings::from_env();
    let config = settings.pipeline_config().context("Failed to load pipeline config")?;
    let store = FsArtifactStore::new(&settings.artifacts_dir);

    tracing::info!("Loading artifacts from {}...", settings.artifacts_dir.display());
    let service = PriceService::load(config, &store).context("Failed to load artifacts")?;

    let state = AppState {
        service: Arc::new(service),
    };

    // CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind_addr))?;
    tracing::info!("Server listening on http://{}", settings.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Flat price API (Rust)",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn predict(
    State(state): State<AppState>,
    Json(request): Json<MinimalListingRequest>,
) -> Result<Json<FlatPrediction>, (StatusCode, Json<serde_json::Value>)> {
    tracing::info!("Predict request: listing {}", request.listing_id);

    match state.service.predict(&request) {
        Ok(prediction) => Ok(Json(prediction)),
        Err(e) => {
            tracing::error!("Prediction error: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            ))
        }
    }
}
