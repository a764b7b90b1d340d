use crate::errors::ErrorBody;
use crate::handlers::{self, AppState};
use crate::models::{
    ArtifactInfo, HealthResponse, PredictResponse, PredictionRequest, RewardRequest,
    RewardResponse,
};
use crate::summary::{SummaryRequest, Transaction, TransactionKind};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::home,
        handlers::health,
        handlers::predict,
        handlers::reward,
        handlers::summary,
    ),
    components(schemas(
        PredictionRequest,
        PredictResponse,
        RewardRequest,
        RewardResponse,
        HealthResponse,
        ArtifactInfo,
        ErrorBody,
        SummaryRequest,
        Transaction,
        TransactionKind,
    )),
    tags(
        (name = "inference", description = "Tag, credit score and reward prediction"),
        (name = "service", description = "Service metadata and helpers")
    )
)]
pub struct ApiDoc;

/// Builds the HTTP surface for the variant the loaded models serve.
///
/// `/reward` is only routed when a reward model is part of the context.
pub fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    let mut inference_routes = Router::new().route("/predict", post(handlers::predict));
    if state.orchestrator.variant().needs_reward_model() {
        inference_routes = inference_routes.route("/reward", post(handlers::reward));
    }

    Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health))
        .route("/summary", post(handlers::summary))
        .merge(inference_routes)
        .layer(ServiceBuilder::new().layer(RequestBodyLimitLayer::new(max_body_bytes)))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
