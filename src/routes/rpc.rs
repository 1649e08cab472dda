use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use utoipa::IntoParams;

use crate::{
    error::{Error, Result},
    procedures::{ProcedureInfo, ProcedureKind},
    AppState,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RpcQueryParams {
    /// URL-encoded JSON input for the query.
    pub input: Option<String>,
}

fn envelope(data: JsonValue) -> Json<JsonValue> {
    Json(json!({ "result": { "data": data } }))
}

fn parse_input(raw: &[u8]) -> Result<JsonValue> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(JsonValue::Null);
    }
    serde_json::from_slice(raw).map_err(|e| Error::BadRequest(format!("Malformed input JSON: {}", e)))
}

#[utoipa::path(
    get,
    path = "/api/rpc/{procedure}",
    params(
        ("procedure" = String, Path, description = "Procedure name, e.g. user.list"),
        RpcQueryParams
    ),
    responses(
        (status = 200, description = "Query result wrapped in {result: {data}}"),
        (status = 400, description = "Malformed input"),
        (status = 404, description = "Unknown procedure"),
        (status = 405, description = "Procedure is a mutation"),
        (status = 503, description = "Store unreachable")
    )
)]
#[axum::debug_handler]
pub async fn call_query(
    State(state): State<AppState>,
    Path(procedure): Path<String>,
    Query(params): Query<RpcQueryParams>,
) -> Result<impl IntoResponse> {
    let input = parse_input(params.input.as_deref().unwrap_or_default().as_bytes())?;
    let data = state
        .registry
        .call(&procedure, ProcedureKind::Query, input)
        .await?;
    Ok(envelope(data))
}

#[utoipa::path(
    post,
    path = "/api/rpc/{procedure}",
    params(
        ("procedure" = String, Path, description = "Procedure name, e.g. user.create")
    ),
    request_body(content = String, description = "JSON input for the mutation", content_type = "application/json"),
    responses(
        (status = 200, description = "Mutation result wrapped in {result: {data}}"),
        (status = 400, description = "Malformed input or validation failure"),
        (status = 404, description = "Unknown procedure"),
        (status = 405, description = "Procedure is a query"),
        (status = 409, description = "Unique constraint violated"),
        (status = 503, description = "Store unreachable")
    )
)]
#[axum::debug_handler]
pub async fn call_mutation(
    State(state): State<AppState>,
    Path(procedure): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let input = parse_input(&body)?;
    let registry = state.registry.clone();

    // Detached so that a client hanging up cannot cancel a write in flight.
    let data = tokio::spawn(async move {
        registry
            .call(&procedure, ProcedureKind::Mutation, input)
            .await
    })
    .await
    .map_err(|e| Error::Internal(format!("Mutation task failed: {}", e)))??;

    Ok(envelope(data))
}

#[utoipa::path(
    get,
    path = "/api/rpc",
    responses(
        (status = 200, description = "Registered procedures", body = Vec<ProcedureInfo>)
    )
)]
#[axum::debug_handler]
pub async fn list_procedures(State(state): State<AppState>) -> Json<Vec<ProcedureInfo>> {
    Json(state.registry.manifest())
}
