use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use cinerec::utils::metrics::MetricsSnapshot;
use cinerec::utils::validation::{validate_action, RawAction};
use cinerec::{init_tracing, AppState, Config, EngineError, Movie, RecommendOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Debug, Deserialize)]
struct RecommendationQuery {
    count: Option<usize>,
    exclude_rated: Option<bool>,
    exclude_watchlist: Option<bool>,
    min_score: Option<f64>,
    diversity_factor: Option<f64>,
    include_explanations: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    message: String,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: "Success".to_string(),
        }
    }
}

async fn health_check() -> Json<ApiResponse<HashMap<String, String>>> {
    let mut status = HashMap::new();
    status.insert("status".to_string(), "healthy".to_string());
    status.insert("service".to_string(), "cinerec-engine".to_string());
    status.insert("version".to_string(), env!("CARGO_PKG_VERSION").to_string());

    Json(ApiResponse::success(status))
}

async fn get_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<RecommendationQuery>,
) -> Result<Json<ApiResponse<cinerec::RecommendationResponse>>, EngineError> {
    let defaults = state.engine.default_options();
    let options = RecommendOptions {
        count: params.count.unwrap_or(defaults.count),
        exclude_rated: params.exclude_rated.unwrap_or(defaults.exclude_rated),
        exclude_watchlist: params.exclude_watchlist.unwrap_or(defaults.exclude_watchlist),
        min_score: params.min_score.unwrap_or(defaults.min_score),
        diversity_factor: params.diversity_factor.unwrap_or(defaults.diversity_factor),
        include_explanations: params
            .include_explanations
            .unwrap_or(defaults.include_explanations),
    };

    let recommendations = state.engine.recommend(&user_id, &options).await?;
    Ok(Json(ApiResponse::success(cinerec::RecommendationResponse {
        user_id,
        recommendations,
        generated_at: Utc::now(),
    })))
}

async fn record_action(
    State(state): State<AppState>,
    Json(raw): Json<RawAction>,
) -> Result<Json<ApiResponse<String>>, EngineError> {
    let action = validate_action(raw)?;
    state.tracking.record(action);
    Ok(Json(ApiResponse::success("Action recorded".to_string())))
}

async fn add_movie(
    State(state): State<AppState>,
    Json(movie): Json<Movie>,
) -> Result<Json<ApiResponse<String>>, EngineError> {
    state.catalog.insert(movie);
    Ok(Json(ApiResponse::success("Movie added".to_string())))
}

async fn engine_metrics(State(state): State<AppState>) -> Json<ApiResponse<MetricsSnapshot>> {
    Json(ApiResponse::success(state.metrics.snapshot()))
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/recommendations/:user_id", get(get_recommendations))
        .route("/actions", post(record_action))
        .route("/movies", post(add_movie))
        .route("/metrics/engine", get(engine_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing().await;

    let config = Config::default();
    info!("starting cinerec engine with config: {:?}", config.server);

    let state = AppState::new(config.clone()).await?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.server.socket_addr()).await?;
    info!("server listening on {}", config.server.socket_addr());

    axum::serve(listener, app).await?;

    Ok(())
}
