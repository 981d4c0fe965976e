//! Splitting a SQL script into statements and running them in order.

use crate::error::Result;
use arrow_array::RecordBatch;
use diagnostics::*;
use std::time::{Duration, Instant};

/// Longest statement prefix written to the log
const LOG_PREVIEW_CHARS: usize = 80;

/// A handle that runs one statement at a time and can hand back the rows of
/// the statement it ran last.
pub trait Cursor {
    /// Run one statement, blocking until the warehouse has finished it
    fn execute(&mut self, sql: &str) -> Result<()>;

    /// Materialize the full result of the last executed statement.
    ///
    /// Fails with `WarehouseError::NoResultSet` when that statement produced
    /// nothing to fetch.
    fn fetch_all(&mut self) -> Result<RecordBatch>;
}

/// Split a script on `;`, trimming each piece and dropping empty ones.
///
/// The split is purely textual: a `;` inside a quoted literal or a comment
/// also ends a statement.
#[must_use]
pub fn split_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Summary of one script run
#[derive(Debug)]
pub struct ScriptReport {
    pub result: Option<RecordBatch>,
    pub statements_executed: usize,
    pub elapsed: Duration,
}

impl ScriptReport {
    #[must_use]
    pub fn rows_returned(&self) -> usize {
        self.result.as_ref().map_or(0, RecordBatch::num_rows)
    }
}

/// Run every statement of `sql` in order and return the last one's rows.
///
/// `None` means the final statement had no result set. Any other failure,
/// on any statement or on the final fetch, stops the run and is returned;
/// statements already executed keep their effects.
pub fn run_script<C: Cursor + ?Sized>(cursor: &mut C, sql: &str) -> Result<Option<RecordBatch>> {
    Ok(run_script_with_report(cursor, sql)?.result)
}

pub fn run_script_with_report<C: Cursor + ?Sized>(cursor: &mut C, sql: &str) -> Result<ScriptReport> {
    let started = Instant::now();
    let statements = split_statements(sql);
    let total = statements.len();
    info!("Running script with {total} statements", total: total);

    let mut result = None;
    for (index, statement) in statements.iter().enumerate() {
        let number = index + 1;
        let shown = preview(statement);
        debug!(
            "Executing statement {number}/{total}: {preview}",
            number: number,
            total: total,
            preview: shown
        );

        if let Err(e) = cursor.execute(statement) {
            let message = e.to_string();
            error!(
                "Statement {number}/{total} failed: {message}",
                number: number,
                total: total,
                message: message
            );
            return Err(e);
        }

        if number == total {
            result = match cursor.fetch_all() {
                Ok(batch) => Some(batch),
                Err(e) if e.is_no_result_set() => {
                    debug!("Final statement returned no result set");
                    None
                }
                Err(e) => return Err(e),
            };
        }
    }

    let report = ScriptReport {
        result,
        statements_executed: total,
        elapsed: started.elapsed(),
    };
    let rows = report.rows_returned();
    let elapsed_ms = report.elapsed.as_millis() as u64;
    info!(
        "Script finished: {total} statements, {rows} rows in {elapsed_ms}ms",
        total: total,
        rows: rows,
        elapsed_ms: elapsed_ms
    );
    Ok(report)
}

fn preview(statement: &str) -> String {
    let flat = statement.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= LOG_PREVIEW_CHARS {
        flat
    } else {
        let mut cut: String = flat.chars().take(LOG_PREVIEW_CHARS).collect();
        cut.push_str("...");
        cut
    }
}
