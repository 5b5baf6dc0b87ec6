//! Named-parameter SQL facade.
//!
//! Write `:name` or `?2.name` placeholders, pass models or maps as
//! arguments, and let [`Sql`] rewrite the text to positional `?` markers,
//! bind the values, and manage connection and statement lifetimes.

pub mod async_sql;
pub mod binding;
pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod facade;
mod lifecycle;
pub mod model;
pub mod named_cache;
pub mod prelude;
pub mod results;
pub mod statement;
pub mod translation;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use async_sql::AsyncSql;
pub use error::{BindError, ScanError, SqlFacadeError};
pub use facade::Sql;
pub use types::{Param, RowValues};
