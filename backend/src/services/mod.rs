//! Long-running services and the domain services they wire together

pub mod database;
pub mod graphql;
pub mod http_server;
pub mod manager;
pub mod users;

pub use manager::ServicesManager;
