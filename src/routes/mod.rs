pub mod docs;
pub mod health;
pub mod rpc;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api-docs/openapi.json", get(docs::openapi_json))
        .route("/api/rpc", get(rpc::list_procedures))
        .route(
            "/api/rpc/:procedure",
            get(rpc::call_query).post(rpc::call_mutation),
        )
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
