//! Convenient imports for common functionality.

pub use crate::async_sql::AsyncSql;
pub use crate::binding::bind;
pub use crate::config::{
    NullHandling, ResultSetConcurrency, ResultSetHoldability, ResultSetType, SqlConfig,
    StatementOptions,
};
pub use crate::driver::{Connection, DataSource, RowCursor, Statement, StatementKind};
pub use crate::error::{BindError, ScanError, SqlFacadeError};
pub use crate::executor::{BatchingPreparedStatement, BatchingStatement, Page};
pub use crate::facade::Sql;
pub use crate::model::PropertyReadable;
pub use crate::params;
pub use crate::results::{ResultSet, RowResult};
pub use crate::translation::{NamedSql, PlaceholderBinding, PropertyPath, scan_named_params};
pub use crate::types::{Param, RowValues, SqlType, StatementParam};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteConnection, SqliteDataSource};
