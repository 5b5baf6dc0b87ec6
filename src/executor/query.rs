use crate::driver::RowCursor;
use crate::error::SqlFacadeError;
use crate::facade::Sql;
use crate::results::{ResultSet, RowResult};
use crate::statement::StatementCommand;
use crate::types::Param;

use super::{PreparedCall, log_failure};

/// Window of rows to return from a query.
///
/// `offset` is 1-based; `0` and `1` both start at the first row.
/// `max_rows` of `0` means no limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Page {
    pub offset: usize,
    pub max_rows: usize,
}

impl Page {
    /// Every row.
    pub const ALL: Page = Page {
        offset: 0,
        max_rows: 0,
    };

    #[must_use]
    pub fn new(offset: usize, max_rows: usize) -> Self {
        Self { offset, max_rows }
    }

    fn allows(self, taken: usize) -> bool {
        self.max_rows == 0 || taken < self.max_rows
    }
}

/// Position `cursor` so the next row read is row `offset`.
///
/// Scrollable cursors jump directly; forward-only cursors discard rows one at
/// a time. Returns `false` when the result has fewer rows than the offset.
pub(crate) fn move_cursor(cursor: &mut dyn RowCursor, offset: usize) -> Result<bool, SqlFacadeError> {
    if offset <= 1 {
        return Ok(true);
    }
    if cursor.cursor_type().is_scrollable() {
        return cursor.absolute(offset - 1);
    }
    for _ in 1..offset {
        if cursor.next_row()?.is_none() {
            return Ok(false);
        }
    }
    Ok(true)
}

type MetaHook<'a> = Option<&'a mut dyn FnMut(&[String])>;

impl Sql {
    /// Run a non-parameterised query and materialise every row.
    ///
    /// # Errors
    /// Returns the driver's `SqlFacadeError`.
    pub fn rows(&self, sql: &str) -> Result<ResultSet, SqlFacadeError> {
        self.rows_paged(sql, 0, 0)
    }

    /// Like [`Sql::rows`], restricted to `max_rows` rows starting at the 1-based `offset`.
    ///
    /// # Errors
    /// Returns the driver's `SqlFacadeError`.
    pub fn rows_paged(
        &self,
        sql: &str,
        offset: usize,
        max_rows: usize,
    ) -> Result<ResultSet, SqlFacadeError> {
        self.collect(
            StatementCommand::Plain,
            &PreparedCall::plain(sql),
            Page::new(offset, max_rows),
            None,
        )
    }

    /// Run a parameterised query. Named placeholders read from `params`.
    ///
    /// # Errors
    /// Returns `SqlFacadeError::Scan`/`Bind` before touching the database,
    /// or the driver's error.
    pub fn rows_with(&self, sql: &str, params: &[Param]) -> Result<ResultSet, SqlFacadeError> {
        self.rows_with_paged(sql, params, 0, 0)
    }

    /// # Errors
    /// See [`Sql::rows_with`].
    pub fn rows_with_paged(
        &self,
        sql: &str,
        params: &[Param],
        offset: usize,
        max_rows: usize,
    ) -> Result<ResultSet, SqlFacadeError> {
        let call = log_failure(sql, self.prepare_call(sql, params))?;
        self.collect(
            Self::prepared_query(),
            &call,
            Page::new(offset, max_rows),
            None,
        )
    }

    /// Run a parameterised query, handing the column names to `meta` once
    /// before any row is read.
    ///
    /// # Errors
    /// See [`Sql::rows_with`].
    pub fn rows_with_meta<M>(
        &self,
        sql: &str,
        params: &[Param],
        page: Page,
        mut meta: M,
    ) -> Result<ResultSet, SqlFacadeError>
    where
        M: FnMut(&[String]),
    {
        let call = log_failure(sql, self.prepare_call(sql, params))?;
        self.collect(Self::prepared_query(), &call, page, Some(&mut meta))
    }

    /// First row of a non-parameterised query, if any.
    ///
    /// # Errors
    /// Returns the driver's `SqlFacadeError`.
    pub fn first_row(&self, sql: &str) -> Result<Option<RowResult>, SqlFacadeError> {
        Ok(self.rows_paged(sql, 0, 1)?.into_iter().next())
    }

    /// # Errors
    /// See [`Sql::rows_with`].
    pub fn first_row_with(
        &self,
        sql: &str,
        params: &[Param],
    ) -> Result<Option<RowResult>, SqlFacadeError> {
        Ok(self
            .rows_with_paged(sql, params, 0, 1)?
            .into_iter()
            .next())
    }

    /// Stream rows to `on_row` without collecting them.
    ///
    /// An error returned by `on_row` stops the iteration and is returned
    /// after the cursor and statement are released.
    ///
    /// # Errors
    /// See [`Sql::rows_with`].
    pub fn each_row<F>(
        &self,
        sql: &str,
        params: &[Param],
        page: Page,
        meta: Option<&mut dyn FnMut(&[String])>,
        mut on_row: F,
    ) -> Result<(), SqlFacadeError>
    where
        F: FnMut(&RowResult) -> Result<(), SqlFacadeError>,
    {
        let call = log_failure(sql, self.prepare_call(sql, params))?;
        self.query(Self::prepared_query(), &call, page, meta, |row| on_row(&row))
            .map(|_| ())
    }

    fn prepared_query() -> StatementCommand {
        StatementCommand::Prepared {
            return_generated_keys: false,
        }
    }

    fn collect(
        &self,
        command: StatementCommand,
        call: &PreparedCall,
        page: Page,
        meta: MetaHook<'_>,
    ) -> Result<ResultSet, SqlFacadeError> {
        let mut rows = Vec::new();
        let mut set = self.query(command, call, page, meta, |row| {
            rows.push(row);
            Ok(())
        })?;
        set.results = rows;
        Ok(set)
    }

    /// Execute and walk the cursor. Returns an empty set carrying the column names.
    fn query<F>(
        &self,
        command: StatementCommand,
        call: &PreparedCall,
        page: Page,
        meta: MetaHook<'_>,
        mut on_row: F,
    ) -> Result<ResultSet, SqlFacadeError>
    where
        F: FnMut(RowResult) -> Result<(), SqlFacadeError>,
    {
        self.run_statement(command, call, |stmt, call, slot| {
            let cursor = slot.insert(stmt.execute_query(&call.sql, &call.params)?);
            let columns = ResultSet::new(cursor.column_names().to_vec());
            if let Some(meta) = meta {
                meta(columns.column_names());
            }
            if !move_cursor(cursor.as_mut(), page.offset)? {
                return Ok(columns);
            }
            let mut taken = 0;
            while page.allows(taken) {
                let Some(values) = cursor.next_row()? else {
                    break;
                };
                on_row(columns.make_row(values))?;
                taken += 1;
            }
            Ok(columns)
        })
    }
}
