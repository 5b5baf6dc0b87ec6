mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use common::{MockDataSource, Script};
use serde_json::json;
use sql_facade::prelude::*;

const QUERY: &str = "select n from numbers where n > :min";

fn min(value: i64) -> Param {
    Param::from_serialize(&json!({ "min": value })).unwrap()
}

#[test]
fn cached_statements_are_created_once() -> Result<(), Box<dyn std::error::Error>> {
    let (source, rec) = MockDataSource::new(Script::numbered(3));
    let sql = Sql::new(source, SqlConfig::builder().cache_statements(true).finish());
    let hooks = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&hooks);
    sql.with_statement(move |_stmt| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    for value in 0..3 {
        sql.rows_with(QUERY, &[min(value)])?;
    }

    assert_eq!(rec.count("statement.create"), 1);
    assert_eq!(hooks.load(Ordering::SeqCst), 1);
    assert_eq!(rec.count("statement.close"), 0);
    assert_eq!(rec.count("connection.open"), 1);
    assert_eq!(rec.count("connection.close"), 0);
    assert_eq!(rec.count("cursor.open"), 3);
    assert_eq!(rec.count("cursor.close"), 3);
    assert_eq!(sql.cached_statement_count(), 1);
    assert_eq!(
        rec.executed_sql(),
        vec!["select n from numbers where n > ?"; 3]
    );

    sql.close();
    assert_eq!(sql.cached_statement_count(), 0);
    rec.assert_balanced();
    Ok(())
}

#[test]
fn uncached_statements_are_closed_every_call() -> Result<(), Box<dyn std::error::Error>> {
    let (source, rec) = MockDataSource::new(Script::numbered(3));
    let sql = Sql::new(source, SqlConfig::default());
    let hooks = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&hooks);
    sql.with_statement(move |_stmt| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    for value in 0..3 {
        sql.rows_with(QUERY, &[min(value)])?;
    }

    assert_eq!(rec.count("statement.create"), 3);
    assert_eq!(hooks.load(Ordering::SeqCst), 3);
    assert_eq!(rec.count("connection.open"), 3);
    assert_eq!(sql.cached_statement_count(), 0);
    rec.assert_balanced();
    Ok(())
}

#[test]
fn plain_and_prepared_statements_never_alias() -> Result<(), Box<dyn std::error::Error>> {
    let (source, _rec) = MockDataSource::new(Script::numbered(1));
    let sql = Sql::new(source, SqlConfig::builder().cache_statements(true).finish());
    sql.rows("select n from numbers")?;
    sql.rows_with("select n from numbers", &[])?;
    sql.rows("select n from numbers")?;
    assert_eq!(sql.cached_statement_count(), 2);
    Ok(())
}

#[test]
fn cache_statements_scope_clears_on_exit() -> Result<(), Box<dyn std::error::Error>> {
    let (source, rec) = MockDataSource::new(Script::numbered(2));
    let sql = Sql::new(source, SqlConfig::default());

    let total = sql.cache_statements(|sql| {
        assert!(sql.is_cache_statements());
        let first = sql.rows_with(QUERY, &[min(0)])?;
        let second = sql.rows_with(QUERY, &[min(1)])?;
        Ok(first.len() + second.len())
    })?;

    assert_eq!(total, 4);
    assert!(!sql.is_cache_statements());
    assert_eq!(rec.count("statement.create"), 1);
    assert_eq!(rec.count("connection.open"), 1);
    assert_eq!(sql.cached_statement_count(), 0);
    assert!(sql.connection().is_none());
    rec.assert_balanced();
    Ok(())
}

#[test]
fn cache_connection_scope_reuses_one_connection() -> Result<(), Box<dyn std::error::Error>> {
    let (source, rec) = MockDataSource::new(Script::numbered(2));
    let sql = Sql::new(source, SqlConfig::default());

    sql.cache_connection(|sql| {
        assert!(sql.connection().is_some());
        sql.rows("select n from numbers")?;
        sql.execute_update("update numbers set n = n + 1")?;
        Ok(())
    })?;

    assert!(!sql.is_cache_connection());
    assert_eq!(rec.count("connection.open"), 1);
    assert_eq!(rec.count("statement.create"), 2);
    rec.assert_balanced();
    Ok(())
}

#[test]
fn scope_restores_flags_on_error() {
    let (source, rec) = MockDataSource::new(Script::numbered(1));
    let sql = Sql::new(source, SqlConfig::default());

    let result: Result<(), SqlFacadeError> = sql.cache_statements(|sql| {
        sql.rows_with(QUERY, &[min(0)])?;
        Err(SqlFacadeError::Other("stop".into()))
    });

    assert!(matches!(result, Err(SqlFacadeError::Other(_))));
    assert!(!sql.is_cache_statements());
    assert_eq!(sql.cached_statement_count(), 0);
    rec.assert_balanced();
}

#[test]
fn disabling_statement_cache_closes_everything() -> Result<(), Box<dyn std::error::Error>> {
    let (source, rec) = MockDataSource::new(Script::numbered(1));
    let sql = Sql::new(source, SqlConfig::builder().cache_statements(true).finish());
    sql.rows_with(QUERY, &[min(0)])?;
    sql.execute_update_with("delete from numbers where n = ?", &[Param::from(1)])?;
    assert_eq!(sql.cached_statement_count(), 2);

    sql.set_cache_statements(false);
    assert_eq!(sql.cached_statement_count(), 0);
    rec.assert_balanced();

    sql.rows_with(QUERY, &[min(0)])?;
    rec.assert_balanced();
    Ok(())
}

#[test]
fn concurrent_callers_share_one_cached_statement() -> Result<(), Box<dyn std::error::Error>> {
    let (source, rec) = MockDataSource::new(Script::numbered(5));
    let sql = Arc::new(Sql::new(source, SqlConfig::builder().cache_statements(true).finish()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let sql = Arc::clone(&sql);
            thread::spawn(move || -> Result<usize, SqlFacadeError> {
                let mut seen = 0;
                for _ in 0..10 {
                    seen += sql.rows_with(QUERY, &[min(i)])?.len();
                }
                Ok(seen)
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().expect("thread panicked")?, 50);
    }

    assert_eq!(rec.count("statement.create"), 1);
    assert_eq!(rec.count("connection.open"), 1);
    assert_eq!(rec.count("cursor.open"), rec.count("cursor.close"));
    Ok(())
}

#[test]
fn nested_same_sql_inside_row_callback_gets_its_own_statement() -> Result<(), Box<dyn std::error::Error>> {
    let (source, rec) = MockDataSource::new(Script::numbered(3));
    let sql = Arc::new(Sql::new(source, SqlConfig::builder().cache_statements(true).finish()));

    let (tx, rx) = mpsc::channel();
    let worker = Arc::clone(&sql);
    thread::spawn(move || {
        let mut children = Vec::new();
        let outcome = worker.each_row(QUERY, &[min(0)], Page::ALL, None, |row| {
            let parent = *row.get("n").and_then(RowValues::as_int).unwrap();
            children.push(worker.rows_with(QUERY, &[min(parent)])?.len());
            Ok(())
        });
        let _ = tx.send(outcome.map(|()| children));
    });

    let children = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("nested query on a cached statement did not finish")?;
    assert_eq!(children, vec![3, 3, 3]);

    // One cached statement, plus a short-lived one per nested call.
    assert_eq!(rec.count("statement.create"), 4);
    assert_eq!(rec.count("statement.close"), 3);
    assert_eq!(sql.cached_statement_count(), 1);

    sql.rows_with(QUERY, &[min(0)])?;
    assert_eq!(rec.count("statement.create"), 4);
    sql.close();
    rec.assert_balanced();
    Ok(())
}
