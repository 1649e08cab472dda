use std::sync::Arc;

use super::ProcedureSet;
use crate::database::UserGateway;
use crate::dto::user_dto::{CreateUserInput, DeleteUserInput, DeleteUserResponse, ListUsersInput};
use crate::error::Result;
use crate::models::user::User;
use crate::utils::validation::validate;

/// The `user` namespace: list, create and delete.
#[derive(Clone)]
pub struct UserProcedures {
    gateway: Arc<dyn UserGateway>,
}

impl UserProcedures {
    pub fn new(gateway: Arc<dyn UserGateway>) -> Self {
        Self { gateway }
    }

    pub async fn list(&self, _input: ListUsersInput) -> Result<Vec<User>> {
        self.gateway.list_users().await
    }

    /// Validates before touching the store; rejected input never reaches it.
    pub async fn create(&self, input: CreateUserInput) -> Result<User> {
        validate(&input)?;
        self.gateway.insert_user(input.into()).await
    }

    /// Reports success whether or not a row matched. Store failures still surface.
    pub async fn delete(&self, input: DeleteUserInput) -> Result<DeleteUserResponse> {
        self.gateway.delete_user(input.id).await?;
        Ok(DeleteUserResponse { success: true })
    }
}

pub fn procedures(gateway: Arc<dyn UserGateway>) -> ProcedureSet {
    let user = UserProcedures::new(gateway);

    let list = user.clone();
    let create = user.clone();
    let delete = user;

    ProcedureSet::new()
        .query("list", move |input: ListUsersInput| {
            let list = list.clone();
            async move { list.list(input).await }
        })
        .mutation("create", move |input: CreateUserInput| {
            let create = create.clone();
            async move { create.create(input).await }
        })
        .mutation("delete", move |input: DeleteUserInput| {
            let delete = delete.clone();
            async move { delete.delete(input).await }
        })
}
