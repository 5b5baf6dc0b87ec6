mod common;

use common::{MockDataSource, Script};
use sql_facade::prelude::*;

#[test]
fn transaction_commits_on_success() -> Result<(), Box<dyn std::error::Error>> {
    let (source, rec) = MockDataSource::new(Script::default());
    let sql = Sql::new(source, SqlConfig::default());

    let updated = sql.with_transaction(|sql| {
        assert!(sql.is_cache_connection());
        let a = sql.execute_update("update acct set balance = balance - 10 where id = 1")?;
        let b = sql.execute_update("update acct set balance = balance + 10 where id = 2")?;
        Ok(a + b)
    })?;

    assert_eq!(updated, 2);
    assert_eq!(rec.count("commit"), 1);
    assert_eq!(rec.count("rollback"), 0);
    assert_eq!(rec.count("auto_commit.off"), 1);
    assert_eq!(rec.count("auto_commit.on"), 1);
    assert_eq!(rec.count("connection.open"), 1);
    assert!(!sql.is_cache_connection());
    assert!(sql.connection().is_none());
    rec.assert_balanced();
    Ok(())
}

#[test]
fn transaction_rolls_back_and_returns_original_error() {
    let (source, rec) = MockDataSource::new(Script::default().failing_on("explode"));
    let sql = Sql::new(source, SqlConfig::default());

    let result = sql.with_transaction(|sql| {
        sql.execute_update("update acct set balance = 0")?;
        sql.execute_update("update explode set x = 1")?;
        Ok(())
    });

    match result {
        Err(SqlFacadeError::DatabaseError(msg)) => assert!(msg.contains("explode")),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(rec.count("commit"), 0);
    assert_eq!(rec.count("rollback"), 1);
    assert_eq!(rec.count("auto_commit.on"), 1);
    assert!(!sql.is_cache_connection());
    rec.assert_balanced();
}

#[test]
fn failed_rollback_keeps_original_error() {
    let script = Script {
        fail_rollback: true,
        ..Script::default()
    };
    let (source, rec) = MockDataSource::new(script);
    let sql = Sql::new(source, SqlConfig::default());

    let result: Result<(), SqlFacadeError> =
        sql.with_transaction(|_sql| Err(SqlFacadeError::Other("caller abort".into())));

    assert!(matches!(result, Err(SqlFacadeError::Other(ref msg)) if msg == "caller abort"));
    assert_eq!(rec.count("rollback"), 1);
    rec.assert_balanced();
}

#[test]
fn nested_scopes_keep_the_outer_connection() -> Result<(), Box<dyn std::error::Error>> {
    let (source, rec) = MockDataSource::new(Script::numbered(1));
    let sql = Sql::new(source, SqlConfig::default());

    sql.with_transaction(|sql| {
        sql.cache_connection(|sql| {
            sql.rows("select n from numbers")?;
            Ok(())
        })?;
        assert!(sql.is_cache_connection());
        assert!(sql.connection().is_some());
        sql.execute_update("delete from numbers")?;
        Ok(())
    })?;

    assert_eq!(rec.count("connection.open"), 1);
    rec.assert_balanced();
    Ok(())
}

#[test]
fn commit_without_held_connection_is_a_no_op() -> Result<(), Box<dyn std::error::Error>> {
    let (source, rec) = MockDataSource::new(Script::default());
    let sql = Sql::new(source, SqlConfig::default());
    sql.commit()?;
    sql.rollback()?;
    assert_eq!(rec.count("commit"), 0);
    assert_eq!(rec.count("rollback"), 0);
    assert_eq!(rec.count("connection.open"), 0);
    Ok(())
}

#[test]
fn commit_inside_cache_connection_uses_held_connection() -> Result<(), Box<dyn std::error::Error>> {
    let (source, rec) = MockDataSource::new(Script::default());
    let sql = Sql::new(source, SqlConfig::default());
    sql.cache_connection(|sql| {
        sql.execute_update("insert into t values (1)")?;
        sql.commit()
    })?;
    assert_eq!(rec.count("commit"), 1);
    rec.assert_balanced();
    Ok(())
}

#[cfg(feature = "sqlite")]
#[test]
fn sqlite_transaction_rollback_discards_writes() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let sql = common::sqlite_sql(&dir, SqlConfig::default());
    sql.execute("create table acct (id integer primary key, balance integer not null)")?;

    sql.with_transaction(|sql| {
        sql.execute_update_with("insert into acct (balance) values (?)", &[Param::from(10)])?;
        Ok(())
    })?;

    let err = sql
        .with_transaction(|sql| {
            sql.execute_update_with("insert into acct (balance) values (?)", &[Param::from(20)])?;
            sql.execute_update("insert into missing_table values (1)")?;
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, SqlFacadeError::SqliteError(_)));

    let balances = sql.rows("select balance from acct")?;
    assert_eq!(common::ints(&balances, "balance"), vec![10]);
    assert!(!sql.is_cache_connection());
    Ok(())
}
