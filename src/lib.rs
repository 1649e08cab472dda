pub mod client;
pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod procedures;
pub mod routes;
pub mod utils;

use std::sync::Arc;

use crate::database::UserGateway;
use crate::procedures::ProcedureRegistry;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn UserGateway>,
    pub registry: Arc<ProcedureRegistry>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn UserGateway>) -> error::Result<Self> {
        let registry = procedures::build_registry(gateway.clone())?;

        Ok(Self {
            gateway,
            registry: Arc::new(registry),
        })
    }
}
