pub mod memory;
pub mod pool;
pub mod user_gateway;

pub use memory::InMemoryUserGateway;
pub use user_gateway::{PgUserGateway, UserGateway};
