use std::io::Write;

use anyhow::{Context, Result};
use diagnostics::*;
use warehouse::{Connection, ConnectionConfig, Cursor, run_script_with_report, split_statements};

use crate::output::{OutputFormat, render_result};

/// How to present a script's result
#[derive(Clone, Copy, Debug, Default)]
pub struct RunOptions<'a> {
    pub format: OutputFormat,
    pub title: Option<&'a str>,
}

/// Connect, run `sql`, print the final result, and close the session.
///
/// The session is released on error paths too: dropping the connection logs
/// out.
pub fn run_command(
    config: &ConnectionConfig,
    sql: &str,
    options: RunOptions<'_>,
    out: &mut dyn Write,
) -> Result<()> {
    let connection = Connection::open(config).context("Failed to connect to warehouse")?;

    {
        let mut cursor = connection.cursor();
        execute_script(&mut cursor, sql, options, out)?;
    }

    connection.close().context("Failed to close warehouse session")
}

/// Run `sql` over an already-open cursor and write the rendered result
pub fn execute_script<C: Cursor + ?Sized>(
    cursor: &mut C,
    sql: &str,
    options: RunOptions<'_>,
    out: &mut dyn Write,
) -> Result<()> {
    let report = run_script_with_report(cursor, sql).context("SQL script failed")?;
    let statements = report.statements_executed;
    debug!("Rendering result of {statements} statements", statements: statements);

    let rendered = render_result(report.result.as_ref(), options.format, options.title)?;
    out.write_all(rendered.as_bytes())
        .context("Failed to write result")?;
    Ok(())
}

/// List the statements a run would execute, without connecting
pub fn dry_run(sql: &str, out: &mut dyn Write) -> Result<()> {
    let statements = split_statements(sql);
    let total = statements.len();
    for (index, statement) in statements.iter().enumerate() {
        writeln!(out, "-- [{}/{}]", index + 1, total)?;
        writeln!(out, "{statement};")?;
    }
    writeln!(out, "-- {total} statements")?;
    Ok(())
}
