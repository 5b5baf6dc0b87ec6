#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sql_facade::driver::{BatchUnit, ExecuteOutcome};
use sql_facade::prelude::*;
use sql_facade::results::VecCursor;

/// One statement execution seen by the mock driver.
#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    pub kind: StatementKind,
    pub sql: String,
    pub params: Vec<StatementParam>,
}

/// Counts every handle the facade opens and closes.
#[derive(Default)]
pub struct Recorder {
    counts: Mutex<HashMap<&'static str, usize>>,
    executed: Mutex<Vec<Executed>>,
    flush_sizes: Mutex<Vec<usize>>,
}

impl Recorder {
    pub fn bump(&self, key: &'static str) {
        *self.counts.lock().unwrap().entry(key).or_default() += 1;
    }

    pub fn count(&self, key: &str) -> usize {
        self.counts.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    fn record(&self, kind: StatementKind, sql: &str, params: &[StatementParam]) {
        self.executed.lock().unwrap().push(Executed {
            kind,
            sql: sql.to_string(),
            params: params.to_vec(),
        });
    }

    pub fn executed(&self) -> Vec<Executed> {
        self.executed.lock().unwrap().clone()
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.executed().into_iter().map(|e| e.sql).collect()
    }

    pub fn flush_sizes(&self) -> Vec<usize> {
        self.flush_sizes.lock().unwrap().clone()
    }

    /// Every connection, statement and cursor opened has been closed.
    pub fn assert_balanced(&self) {
        assert_eq!(self.count("connection.open"), self.count("connection.close"), "connections");
        assert_eq!(self.count("statement.create"), self.count("statement.close"), "statements");
        assert_eq!(self.count("cursor.open"), self.count("cursor.close"), "cursors");
    }
}

/// What the mock database answers.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<RowValues>>,
    /// Any SQL containing this text fails with `DatabaseError`.
    pub fail_when: Option<String>,
    pub out_values: Vec<RowValues>,
    pub fail_rollback: bool,
}

impl Script {
    /// A single `n` column holding 1..=count.
    pub fn numbered(count: i64) -> Self {
        Self {
            columns: vec!["n".into()],
            rows: (1..=count).map(|i| vec![RowValues::Int(i)]).collect(),
            ..Self::default()
        }
    }

    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_when = Some(needle.to_string());
        self
    }

    fn check(&self, sql: &str) -> Result<(), SqlFacadeError> {
        match &self.fail_when {
            Some(needle) if sql.contains(needle.as_str()) => {
                Err(SqlFacadeError::DatabaseError(format!("mock failure on: {sql}")))
            }
            _ => Ok(()),
        }
    }
}

pub struct MockDataSource {
    recorder: Arc<Recorder>,
    script: Arc<Script>,
}

impl MockDataSource {
    pub fn new(script: Script) -> (Arc<Self>, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let source = Arc::new(Self {
            recorder: Arc::clone(&recorder),
            script: Arc::new(script),
        });
        (source, recorder)
    }
}

impl DataSource for MockDataSource {
    fn get_connection(&self) -> Result<Arc<dyn Connection>, SqlFacadeError> {
        self.recorder.bump("connection.open");
        Ok(Arc::new(MockConnection {
            recorder: Arc::clone(&self.recorder),
            script: Arc::clone(&self.script),
            auto_commit: AtomicBool::new(true),
            closed: AtomicBool::new(false),
        }))
    }
}

pub struct MockConnection {
    recorder: Arc<Recorder>,
    script: Arc<Script>,
    auto_commit: AtomicBool,
    closed: AtomicBool,
}

impl MockConnection {
    /// A caller-owned connection, not obtained from a datasource.
    pub fn standalone(script: Script) -> (Arc<Self>, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let conn = Arc::new(Self {
            recorder: Arc::clone(&recorder),
            script: Arc::new(script),
            auto_commit: AtomicBool::new(true),
            closed: AtomicBool::new(false),
        });
        (conn, recorder)
    }
}

impl Connection for MockConnection {
    fn create_statement(
        &self,
        kind: StatementKind,
        sql: Option<&str>,
        options: StatementOptions,
    ) -> Result<Box<dyn Statement>, SqlFacadeError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SqlFacadeError::ConnectionError("mock connection closed".into()));
        }
        self.recorder.bump("statement.create");
        Ok(Box::new(MockStatement {
            recorder: Arc::clone(&self.recorder),
            script: Arc::clone(&self.script),
            kind,
            sql: sql.map(str::to_string),
            options,
            batch: Vec::new(),
            closed: false,
        }))
    }

    fn auto_commit(&self) -> Result<bool, SqlFacadeError> {
        Ok(self.auto_commit.load(Ordering::SeqCst))
    }

    fn set_auto_commit(&self, enabled: bool) -> Result<(), SqlFacadeError> {
        self.recorder
            .bump(if enabled { "auto_commit.on" } else { "auto_commit.off" });
        self.auto_commit.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    fn commit(&self) -> Result<(), SqlFacadeError> {
        self.recorder.bump("commit");
        Ok(())
    }

    fn rollback(&self) -> Result<(), SqlFacadeError> {
        self.recorder.bump("rollback");
        if self.script.fail_rollback {
            return Err(SqlFacadeError::DatabaseError("mock rollback failure".into()));
        }
        Ok(())
    }

    fn close(&self) -> Result<(), SqlFacadeError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.recorder.bump("connection.close");
        }
        Ok(())
    }
}

pub struct MockStatement {
    recorder: Arc<Recorder>,
    script: Arc<Script>,
    kind: StatementKind,
    sql: Option<String>,
    options: StatementOptions,
    batch: Vec<BatchUnit>,
    closed: bool,
}

impl MockStatement {
    fn text<'a>(&'a self, sql: &'a str) -> &'a str {
        self.sql.as_deref().unwrap_or(sql)
    }
}

impl Statement for MockStatement {
    fn kind(&self) -> StatementKind {
        self.kind
    }

    fn execute_query(
        &mut self,
        sql: &str,
        params: &[StatementParam],
    ) -> Result<Box<dyn RowCursor>, SqlFacadeError> {
        let text = self.text(sql).to_string();
        self.recorder.record(self.kind, &text, params);
        self.script.check(&text)?;
        self.recorder.bump("cursor.open");
        Ok(Box::new(MockCursor {
            recorder: Arc::clone(&self.recorder),
            inner: VecCursor::new(
                self.script.columns.clone(),
                self.script.rows.clone(),
                self.options.result_set_type,
            ),
            closed: false,
        }))
    }

    fn execute_update(
        &mut self,
        sql: &str,
        params: &[StatementParam],
    ) -> Result<i64, SqlFacadeError> {
        let text = self.text(sql).to_string();
        self.recorder.record(self.kind, &text, params);
        self.script.check(&text)?;
        Ok(1)
    }

    fn execute(
        &mut self,
        sql: &str,
        params: &[StatementParam],
    ) -> Result<ExecuteOutcome, SqlFacadeError> {
        let text = self.text(sql).to_string();
        self.recorder.record(self.kind, &text, params);
        self.script.check(&text)?;
        let has_rows = text.trim_start().to_lowercase().starts_with("select");
        Ok(ExecuteOutcome {
            has_rows,
            update_count: if has_rows { -1 } else { 1 },
        })
    }

    fn generated_keys(&mut self) -> Result<Vec<Vec<RowValues>>, SqlFacadeError> {
        Ok(vec![vec![RowValues::Int(42)]])
    }

    fn out_values(&mut self) -> Result<Vec<RowValues>, SqlFacadeError> {
        Ok(self.script.out_values.clone())
    }

    fn add_batch(&mut self, unit: BatchUnit) -> Result<(), SqlFacadeError> {
        self.batch.push(unit);
        Ok(())
    }

    fn clear_batch(&mut self) {
        self.batch.clear();
    }

    fn execute_batch(&mut self) -> Result<Vec<i64>, SqlFacadeError> {
        let units = std::mem::take(&mut self.batch);
        self.recorder.bump("batch.flush");
        self.recorder.flush_sizes.lock().unwrap().push(units.len());
        let prepared = self.sql.clone().unwrap_or_default();
        for unit in &units {
            match unit {
                BatchUnit::Sql(sql) => {
                    self.recorder.record(self.kind, sql, &[]);
                    self.script.check(sql)?;
                }
                BatchUnit::Params(params) => {
                    self.recorder.record(self.kind, &prepared, params);
                    self.script.check(&prepared)?;
                }
            }
        }
        Ok(vec![1; units.len()])
    }

    fn close(&mut self) -> Result<(), SqlFacadeError> {
        if !self.closed {
            self.closed = true;
            self.recorder.bump("statement.close");
        }
        Ok(())
    }
}

struct MockCursor {
    recorder: Arc<Recorder>,
    inner: VecCursor,
    closed: bool,
}

impl RowCursor for MockCursor {
    fn column_names(&self) -> &[String] {
        self.inner.column_names()
    }

    fn cursor_type(&self) -> ResultSetType {
        self.inner.cursor_type()
    }

    fn next_row(&mut self) -> Result<Option<Vec<RowValues>>, SqlFacadeError> {
        self.inner.next_row()
    }

    fn absolute(&mut self, row: usize) -> Result<bool, SqlFacadeError> {
        self.recorder.bump("cursor.absolute");
        self.inner.absolute(row)
    }

    fn close(&mut self) -> Result<(), SqlFacadeError> {
        if !self.closed {
            self.closed = true;
            self.recorder.bump("cursor.close");
        }
        self.inner.close()
    }
}

/// Integer column `name` of every row.
pub fn ints(set: &ResultSet, name: &str) -> Vec<i64> {
    set.iter()
        .map(|row| *row.get(name).and_then(RowValues::as_int).unwrap())
        .collect()
}

/// Facade over a fresh SQLite file inside `dir`.
#[cfg(feature = "sqlite")]
pub fn sqlite_sql(dir: &tempfile::TempDir, config: SqlConfig) -> Sql {
    let path = dir.path().join("facade.db");
    let source = SqliteDataSource::builder(path.to_string_lossy())
        .wal(true)
        .busy_timeout(Duration::from_secs(5))
        .finish();
    Sql::new(Arc::new(source), config)
}
