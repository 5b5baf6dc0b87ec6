// SQLite driver for the facade.
//
// - config: datasource that opens one rusqlite connection per checkout
// - connection: shared connection handle with emulated auto-commit
// - statement: plain and prepared statements, batches, generated keys
// - params / query: value conversion in both directions

pub mod config;
pub mod connection;
pub mod params;
pub mod query;
pub mod statement;

pub use config::{SqliteDataSource, SqliteDataSourceBuilder};
pub use connection::SqliteConnection;
pub use statement::SqliteStatement;
