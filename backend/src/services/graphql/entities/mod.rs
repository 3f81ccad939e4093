//! Entities exposed through GraphQL and persisted through the ORM layer.

pub mod user;

pub use user::{CreateUser, User, UserMutations, UserQueries};
