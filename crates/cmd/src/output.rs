use anyhow::{Context, Result};
use arrow::util::pretty::pretty_format_batches;
use clap::ValueEnum;
use warehouse::RecordBatch;

/// Printed when the final statement had no result set
pub const NO_ROWS: &str = "No rows returned";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Boxed text table
    #[default]
    Table,
    /// CSV with a header row
    Csv,
    /// Number of rows only
    Count,
}

/// Render a script result for stdout.
///
/// `title` only applies to the table format, so CSV output stays parseable.
pub fn render_result(
    result: Option<&RecordBatch>,
    format: OutputFormat,
    title: Option<&str>,
) -> Result<String> {
    let Some(batch) = result else {
        return Ok(match (format, title) {
            (OutputFormat::Table, Some(title)) => format!("{title}\n{NO_ROWS}\n"),
            _ => format!("{NO_ROWS}\n"),
        });
    };

    match format {
        OutputFormat::Table => {
            let table = pretty_format_batches(std::slice::from_ref(batch))
                .context("Failed to format results as table")?;
            Ok(match title {
                Some(title) => format!("{title}\n{table}\n"),
                None => format!("{table}\n"),
            })
        }
        OutputFormat::Csv => {
            let mut writer = arrow_csv::WriterBuilder::new()
                .with_header(true)
                .build(Vec::new());
            writer.write(batch).context("Failed to write CSV")?;
            String::from_utf8(writer.into_inner()).context("CSV output is not UTF-8")
        }
        OutputFormat::Count => Ok(format!("{}\n", batch.num_rows())),
    }
}
