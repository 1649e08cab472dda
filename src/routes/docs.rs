use axum::Json;
use utoipa::OpenApi;

use crate::dto::user_dto::{CreateUserInput, DeleteUserInput, DeleteUserResponse, ListUsersInput};
use crate::models::user::User;
use crate::procedures::{ProcedureInfo, ProcedureKind};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health,
        crate::routes::rpc::call_query,
        crate::routes::rpc::call_mutation,
        crate::routes::rpc::list_procedures,
    ),
    components(schemas(
        User,
        ListUsersInput,
        CreateUserInput,
        DeleteUserInput,
        DeleteUserResponse,
        ProcedureInfo,
        ProcedureKind,
    ))
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
