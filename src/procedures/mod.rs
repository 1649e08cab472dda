pub mod registry;
pub mod user;

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use registry::{ProcedureInfo, ProcedureRegistry, ProcedureSet};

/// Whether a procedure only reads (safe to retry or cache) or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProcedureKind {
    Query,
    Mutation,
}

impl ProcedureKind {
    /// HTTP verb the transport accepts for this kind.
    pub fn http_method(self) -> &'static str {
        match self {
            ProcedureKind::Query => "GET",
            ProcedureKind::Mutation => "POST",
        }
    }
}

impl fmt::Display for ProcedureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcedureKind::Query => f.write_str("query"),
            ProcedureKind::Mutation => f.write_str("mutation"),
        }
    }
}

/// Build the registry for every namespace this service exposes.
pub fn build_registry(
    gateway: std::sync::Arc<dyn crate::database::UserGateway>,
) -> crate::error::Result<ProcedureRegistry> {
    ProcedureRegistry::new().merge("user", user::procedures(gateway))
}
