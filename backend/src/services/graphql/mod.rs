pub mod entities;
pub mod orm;
mod schema;
pub mod service;

pub use schema::{UserSchema, build_schema};
pub use service::{GraphqlService, GraphqlServiceConfig};
