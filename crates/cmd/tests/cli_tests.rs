use std::sync::Arc;

use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use cmd::commands::{RunOptions, dry_run, execute_script, init_command};
use cmd::demos::Demo;
use cmd::output::OutputFormat;
use warehouse::{ConnectionConfig, Cursor, RecordBatch, Result as WarehouseResult, WarehouseError};

/// Cursor standing in for a live session: every SELECT returns two customers
#[derive(Default)]
struct ReportCursor {
    executed: Vec<String>,
    fetched: usize,
}

impl Cursor for ReportCursor {
    fn execute(&mut self, sql: &str) -> WarehouseResult<()> {
        self.executed.push(sql.to_string());
        Ok(())
    }

    fn fetch_all(&mut self) -> WarehouseResult<RecordBatch> {
        self.fetched += 1;
        let last = self.executed.last().ok_or(WarehouseError::NoResultSet)?;
        if !last.contains("FROM TMP_CUSTOMER_LATEST_ORDER") {
            return Err(WarehouseError::NoResultSet);
        }
        let schema = Arc::new(Schema::new(vec![
            Field::new("CUSTOMER_ID", DataType::Int64, true),
            Field::new("CUSTOMER_NAME", DataType::Utf8, true),
        ]));
        Ok(RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![1, 2])),
                Arc::new(StringArray::from(vec!["Alice", "Bob"])),
            ],
        )?)
    }
}

fn run_to_string(sql: &str, options: RunOptions<'_>) -> (ReportCursor, String) {
    let mut cursor = ReportCursor::default();
    let mut out = Vec::new();
    execute_script(&mut cursor, sql, options, &mut out).unwrap();
    (cursor, String::from_utf8(out).unwrap())
}

#[test]
fn test_consolidate_demo_prints_titled_report() {
    let options = RunOptions {
        format: OutputFormat::Table,
        title: Demo::Consolidate.title(),
    };
    let (cursor, output) = run_to_string(Demo::Consolidate.sql(), options);

    assert_eq!(cursor.executed.len(), 11);
    assert_eq!(cursor.fetched, 1);
    assert!(output.starts_with("Result from TMP_CUSTOMER_LATEST_ORDER:\n"));
    assert!(output.contains("| Alice "));
}

#[test]
fn test_settle_demo_as_csv() {
    let options = RunOptions {
        format: OutputFormat::Csv,
        title: Demo::Settle.title(),
    };
    let (cursor, output) = run_to_string(Demo::Settle.sql(), options);

    assert_eq!(cursor.executed.len(), 15);
    assert_eq!(output, "CUSTOMER_ID,CUSTOMER_NAME\n1,Alice\n2,Bob\n");
}

#[test]
fn test_script_ending_in_ddl_prints_no_rows() {
    let (cursor, output) = run_to_string(
        "CREATE TABLE T (N INT); DROP TABLE T;",
        RunOptions::default(),
    );
    assert_eq!(cursor.executed, vec!["CREATE TABLE T (N INT)", "DROP TABLE T"]);
    assert_eq!(output, "No rows returned\n");
}

#[test]
fn test_dry_run_lists_statements() {
    let mut out = Vec::new();
    dry_run("USE SCHEMA PUBLIC;\n\nSELECT 1;\n", &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(
        text,
        "-- [1/2]\nUSE SCHEMA PUBLIC;\n-- [2/2]\nSELECT 1;\n-- 2 statements\n"
    );
}

#[test]
fn test_init_writes_loadable_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sfrun.yaml");
    let mut out = Vec::new();

    init_command(&path, &mut out).unwrap();

    let config = ConnectionConfig::load(&path).unwrap();
    assert_eq!(config, ConnectionConfig::default());
    assert!(String::from_utf8(out).unwrap().contains("Created example configuration file"));
}

#[test]
fn test_init_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sfrun.yaml");
    std::fs::write(&path, "user: keep-me\n").unwrap();

    let err = init_command(&path, &mut Vec::<u8>::new()).unwrap_err();
    assert!(err.to_string().contains("already exists"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "user: keep-me\n");
}
