use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::user::NewUser;

/// `user.list` takes no input; `null` and `{}` are both accepted.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ListUsersInput {}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateUserInput {
    #[validate(custom(function = "crate::utils::validation::validate_name"))]
    pub name: String,
    #[validate(
        email(message = "email must be a valid email address"),
        custom(
            function = "crate::utils::validation::validate_email_domain",
            message = "email must be a valid email address"
        )
    )]
    pub email: String,
}

impl From<CreateUserInput> for NewUser {
    fn from(input: CreateUserInput) -> Self {
        Self {
            name: input.name,
            email: input.email,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteUserInput {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeleteUserResponse {
    pub success: bool,
}
