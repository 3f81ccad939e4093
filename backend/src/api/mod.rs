//! API route definitions
//!
//! The primary API is GraphQL at /graphql. Health probes live here.

pub mod health;
