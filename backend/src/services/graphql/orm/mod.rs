//! ORM layer
//!
//! Provides the traits an entity implements to be stored in SQLite, and the
//! [Repository] abstraction the service layer talks to. The same entity
//! struct is the single source of truth for:
//! - the GraphQL type (SimpleObject)
//! - the table definition used by schema sync (ColumnDef)
//! - row decoding (FromSqlRow) and bind values (ToSqlValues)

mod repository;
mod traits;

pub use repository::*;
pub use traits::*;
