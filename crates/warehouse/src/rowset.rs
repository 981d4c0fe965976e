//! Decoding of JSON result sets into Arrow.
//!
//! The JSON result format carries every cell as a string (or `null`), and the
//! column metadata in `rowtype` says how to read it. Dates arrive as days
//! since the epoch; times and timestamps as `seconds.fraction` since the
//! epoch, with `timestamp_tz` adding a trailing offset token.
//!
//! Scale-0 `fixed` columns decode as `Int64` unless a value does not fit, in
//! which case the whole column becomes `Decimal128(precision, 0)`.

use crate::error::{Result, WarehouseError};
use crate::protocol::RowType;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow_array::types::Decimal128Type;
use arrow_array::{
    Array, ArrayRef, BinaryArray, BooleanArray, Date32Array, Decimal128Array, Float64Array,
    Int64Array, RecordBatch, StringArray, Time64NanosecondArray, TimestampNanosecondArray,
};
use serde_json::Value;
use std::sync::Arc;

const UTC: &str = "+00:00";
const DEFAULT_DECIMAL_PRECISION: u8 = 38;

/// Arrow type for one warehouse column
#[must_use]
pub fn arrow_type(column: &RowType) -> DataType {
    match column.type_name.to_ascii_lowercase().as_str() {
        "fixed" => match column.scale.unwrap_or(0) {
            0 => DataType::Int64,
            scale => DataType::Decimal128(decimal_precision(column), scale.clamp(1, 38) as i8),
        },
        "real" | "float" | "double" => DataType::Float64,
        "boolean" => DataType::Boolean,
        "date" => DataType::Date32,
        "time" => DataType::Time64(TimeUnit::Nanosecond),
        "timestamp_ntz" | "timestamp" => DataType::Timestamp(TimeUnit::Nanosecond, None),
        "timestamp_ltz" | "timestamp_tz" => {
            DataType::Timestamp(TimeUnit::Nanosecond, Some(Arc::from(UTC)))
        }
        "binary" => DataType::Binary,
        _ => DataType::Utf8,
    }
}

fn decimal_precision(column: &RowType) -> u8 {
    column
        .precision
        .and_then(|p| u8::try_from(p).ok())
        .filter(|p| (1..=38).contains(p))
        .unwrap_or(DEFAULT_DECIMAL_PRECISION)
}

/// Arrow schema for a result's column metadata
#[must_use]
pub fn schema_for(rowtype: &[RowType]) -> Schema {
    let fields: Vec<Field> = rowtype
        .iter()
        .map(|c| Field::new(&c.name, arrow_type(c), c.nullable))
        .collect();
    Schema::new(fields)
}

/// Build one `RecordBatch` from column metadata and row-major JSON cells
pub fn decode_rows(rowtype: &[RowType], rows: &[Vec<Value>]) -> Result<RecordBatch> {
    if rowtype.is_empty() {
        return Err(WarehouseError::NoResultSet);
    }

    for (index, row) in rows.iter().enumerate() {
        if row.len() != rowtype.len() {
            return Err(WarehouseError::protocol(format!(
                "row {index} has {} cells, expected {}",
                row.len(),
                rowtype.len()
            )));
        }
    }

    let columns = rowtype
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let cells: Vec<Option<String>> = rows.iter().map(|row| cell_text(&row[i])).collect();
            decode_column(column, &cells)
        })
        .collect::<Result<Vec<ArrayRef>>>()?;

    // Field types come from the decoded arrays, since integer columns may widen
    let fields: Vec<Field> = rowtype
        .iter()
        .zip(&columns)
        .map(|(c, array)| Field::new(&c.name, array.data_type().clone(), c.nullable))
        .collect();

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn decode_column(column: &RowType, cells: &[Option<String>]) -> Result<ArrayRef> {
    let name = column.name.as_str();
    let array: ArrayRef = match arrow_type(column) {
        DataType::Int64 => match parse_each(name, cells, |s| s.parse::<i64>().ok()) {
            Ok(values) => Arc::new(Int64Array::from(values)),
            Err(_) => decode_wide_integer(column, cells)?,
        },
        DataType::Decimal128(precision, scale) => {
            let values = parse_each(name, cells, |s| {
                arrow_cast::parse::parse_decimal::<Decimal128Type>(s, precision, scale).ok()
            })?;
            Arc::new(Decimal128Array::from(values).with_precision_and_scale(precision, scale)?)
        }
        DataType::Float64 => Arc::new(Float64Array::from(parse_each(name, cells, parse_real)?)),
        DataType::Boolean => Arc::new(BooleanArray::from(parse_each(name, cells, parse_bool)?)),
        DataType::Date32 => Arc::new(Date32Array::from(parse_each(name, cells, |s| {
            s.parse::<i32>().ok()
        })?)),
        DataType::Time64(_) => Arc::new(Time64NanosecondArray::from(parse_each(
            name,
            cells,
            parse_epoch_nanos,
        )?)),
        DataType::Timestamp(_, tz) => {
            let values = parse_each(name, cells, |s| {
                // timestamp_tz appends " <offset>"; the leading value is already UTC
                s.split_whitespace().next().and_then(parse_epoch_nanos)
            })?;
            let array = TimestampNanosecondArray::from(values);
            match tz {
                Some(tz) => Arc::new(array.with_timezone(tz)),
                None => Arc::new(array),
            }
        }
        DataType::Binary => {
            let values = parse_each(name, cells, |s| hex::decode(s).ok())?;
            Arc::new(BinaryArray::from_iter(values))
        }
        _ => Arc::new(StringArray::from(cells.to_vec())),
    };
    Ok(array)
}

/// Scale-0 column with a value outside `i64`: keep it exact as `Decimal128(p, 0)`
fn decode_wide_integer(column: &RowType, cells: &[Option<String>]) -> Result<ArrayRef> {
    let precision = decimal_precision(column);
    let values = parse_each(&column.name, cells, |s| {
        arrow_cast::parse::parse_decimal::<Decimal128Type>(s, precision, 0).ok()
    })?;
    Ok(Arc::new(
        Decimal128Array::from(values).with_precision_and_scale(precision, 0)?,
    ))
}

fn parse_each<T, F>(column: &str, cells: &[Option<String>], parse: F) -> Result<Vec<Option<T>>>
where
    F: Fn(&str) -> Option<T>,
{
    cells
        .iter()
        .map(|cell| match cell {
            None => Ok(None),
            Some(text) => parse(text)
                .map(Some)
                .ok_or_else(|| WarehouseError::decode(column, format!("unexpected value '{text}'"))),
        })
        .collect()
}

fn parse_real(s: &str) -> Option<f64> {
    match s {
        "inf" | "Infinity" => Some(f64::INFINITY),
        "-inf" | "-Infinity" => Some(f64::NEG_INFINITY),
        _ => s.parse::<f64>().ok(),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

/// Parse `seconds[.fraction]` since the epoch into nanoseconds.
///
/// The fraction is right-padded to nine digits; digits past nanosecond
/// precision are dropped. A leading `-` applies to the whole value.
pub fn parse_epoch_nanos(s: &str) -> Option<i64> {
    let (negative, unsigned) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let seconds: i64 = whole.parse().ok()?;
    let mut nanos_text: String = fraction.chars().take(9).collect();
    while nanos_text.len() < 9 {
        nanos_text.push('0');
    }
    let nanos: i64 = nanos_text.parse().ok()?;

    let total = seconds.checked_mul(1_000_000_000)?.checked_add(nanos)?;
    Some(if negative { -total } else { total })
}
