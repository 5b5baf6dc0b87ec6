//! Statement creation commands and the per-facade statement cache.

mod cache;

use std::sync::{Arc, Mutex};

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::StatementOptions;
use crate::driver::{Connection, Statement, StatementKind};
use crate::error::SqlFacadeError;

pub use cache::{StatementCache, StatementKey};

/// Shared handle to a driver statement; cached handles are reused across calls.
pub type StatementHandle = Arc<Mutex<Box<dyn Statement>>>;

lazy_static! {
    static ref STORED_PROC: Regex =
        Regex::new(r"^\s*\{?\s*\??\s*=?\s*(?i:call)").expect("static stored procedure regex");
}

/// Does the SQL text look like a stored-procedure invocation
/// (`call p(?)`, `{call p(?)}`, `{? = call f(?)}`)?
#[must_use]
pub fn appears_like_stored_proc(sql: &str) -> bool {
    STORED_PROC.is_match(sql)
}

/// How a statement for a given SQL text gets created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementCommand {
    /// Non-parameterised statement; SQL is passed at execution time.
    Plain,
    /// Positional prepared statement, optionally reporting generated keys.
    /// Stored-procedure text is promoted to a callable statement.
    Prepared { return_generated_keys: bool },
    /// Stored-procedure call.
    Callable,
}

impl StatementCommand {
    /// Driver statement kind this command produces for `sql`.
    #[must_use]
    pub fn kind_for(self, sql: &str) -> StatementKind {
        match self {
            StatementCommand::Plain => StatementKind::Plain,
            StatementCommand::Prepared {
                return_generated_keys: true,
            } => StatementKind::PreparedWithKeys,
            StatementCommand::Prepared {
                return_generated_keys: false,
            } if appears_like_stored_proc(sql) => StatementKind::Callable,
            StatementCommand::Prepared {
                return_generated_keys: false,
            } => StatementKind::Prepared,
            StatementCommand::Callable => StatementKind::Callable,
        }
    }

    /// Ask the connection for a fresh statement.
    ///
    /// # Errors
    /// Propagates the driver's `SqlFacadeError`.
    pub fn create(
        self,
        connection: &dyn Connection,
        sql: &str,
        options: StatementOptions,
    ) -> Result<Box<dyn Statement>, SqlFacadeError> {
        let kind = self.kind_for(sql);
        let text = match kind {
            StatementKind::Plain => None,
            _ => Some(sql),
        };
        connection.create_statement(kind, text, options)
    }
}
