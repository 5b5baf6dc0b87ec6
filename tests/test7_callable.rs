mod common;

use common::{MockDataSource, Script};
use serde_json::json;
use sql_facade::prelude::*;

#[test]
fn call_with_outputs_returns_out_values() -> Result<(), Box<dyn std::error::Error>> {
    let script = Script {
        out_values: vec![RowValues::Int(1001)],
        ..Script::default()
    };
    let (source, rec) = MockDataSource::new(script);
    let sql = Sql::new(source, SqlConfig::default());

    let outs = sql.call_with_outputs(
        "{call next_id(?, ?)}",
        &[Param::from("orders"), Param::Out(SqlType::BigInt)],
    )?;

    assert_eq!(outs, vec![RowValues::Int(1001)]);
    let executed = rec.executed();
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].kind, StatementKind::Callable);
    assert_eq!(
        executed[0].params,
        vec![
            StatementParam::In(RowValues::Text("orders".into())),
            StatementParam::Out(SqlType::BigInt),
        ]
    );
    rec.assert_balanced();
    Ok(())
}

#[test]
fn call_binds_named_properties_and_records_update_count() -> Result<(), Box<dyn std::error::Error>> {
    let (source, rec) = MockDataSource::new(Script::default());
    let sql = Sql::new(source, SqlConfig::default());
    let user = Param::from_serialize(&json!({ "name": "ada", "role": "admin" }))?;

    let count = sql.call_with("call add_user(:name, :role)", &[user])?;

    assert_eq!(count, 1);
    assert_eq!(sql.update_count(), 1);
    let executed = rec.executed();
    assert_eq!(executed[0].sql, "call add_user(?, ?)");
    assert_eq!(
        executed[0].params,
        vec![
            StatementParam::In(RowValues::Text("ada".into())),
            StatementParam::In(RowValues::Text("admin".into())),
        ]
    );
    Ok(())
}

#[test]
fn in_out_parameter_passes_through() -> Result<(), Box<dyn std::error::Error>> {
    let script = Script {
        out_values: vec![RowValues::Int(8)],
        ..Script::default()
    };
    let (source, rec) = MockDataSource::new(script);
    let sql = Sql::new(source, SqlConfig::default());
    let outs = sql.call_with_outputs(
        "{call double_it(?)}",
        &[Param::InOut(RowValues::Int(4), SqlType::Integer)],
    )?;
    assert_eq!(outs, vec![RowValues::Int(8)]);
    assert_eq!(
        rec.executed()[0].params,
        vec![StatementParam::InOut(RowValues::Int(4), SqlType::Integer)]
    );
    Ok(())
}

#[test]
fn prepared_query_with_call_text_becomes_callable() -> Result<(), Box<dyn std::error::Error>> {
    let (source, rec) = MockDataSource::new(Script::numbered(2));
    let sql = Sql::new(source, SqlConfig::default());
    let rows = sql.rows_with("{call list_numbers(?)}", &[Param::from(2)])?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rec.executed()[0].kind, StatementKind::Callable);

    sql.rows_with("select n from numbers where n < ?", &[Param::from(2)])?;
    assert_eq!(rec.executed()[1].kind, StatementKind::Prepared);
    rec.assert_balanced();
    Ok(())
}

#[test]
fn failed_call_releases_resources() {
    let (source, rec) = MockDataSource::new(Script::default().failing_on("broken_proc"));
    let sql = Sql::new(source, SqlConfig::default());
    let result = sql.call("call broken_proc()");
    assert!(matches!(result, Err(SqlFacadeError::DatabaseError(_))));
    rec.assert_balanced();
}

#[cfg(feature = "sqlite")]
#[test]
fn sqlite_has_no_stored_procedures() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let sql = common::sqlite_sql(&dir, SqlConfig::default());
    let result = sql.call_with("call anything(?)", &[Param::from(1)]);
    assert!(matches!(result, Err(SqlFacadeError::Unimplemented(_))));
    Ok(())
}
