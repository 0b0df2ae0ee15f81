use super::Codec;
use crate::data::format::Format;
use crate::data::model::{TabularDataset, Value};
use crate::error::{CodecError, CodecResult, SchemaError};

// ---------------------------------------------------------------------------
// CSV codec
// ---------------------------------------------------------------------------

/// Header row with column names, one comma-separated line per row.
///
/// Cells are typed on read: empty → null, integer form → integer, decimal or
/// exponent form → float, `true`/`false` → boolean, anything else → string.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvCodec;

impl Codec for CsvCodec {
    fn decode(&self, bytes: &[u8]) -> CodecResult<TabularDataset> {
        // Row width is checked here rather than by the reader so the error is a
        // schema mismatch instead of a parse failure.
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(bytes);

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| CodecError::malformed(Format::Csv, e))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for (row_no, result) in reader.records().enumerate() {
            let record = result.map_err(|e| CodecError::malformed(Format::Csv, e))?;
            if record.len() != columns.len() {
                return Err(SchemaError::RowWidth {
                    row: row_no + 1,
                    expected: columns.len(),
                    found: record.len(),
                }
                .into());
            }
            rows.push(record.iter().map(guess_value_type).collect());
        }

        Ok(TabularDataset::try_new(columns, rows)?)
    }

    fn encode(&self, dataset: &TabularDataset) -> CodecResult<Vec<u8>> {
        if dataset.columns().is_empty() {
            return Ok(Vec::new());
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(dataset.columns())
            .map_err(|e| CodecError::write(Format::Csv, e))?;

        for row in dataset.rows() {
            let fields = row
                .iter()
                .zip(dataset.columns())
                .map(|(value, column)| csv_field(value, column))
                .collect::<CodecResult<Vec<String>>>()?;
            writer
                .write_record(&fields)
                .map_err(|e| CodecError::write(Format::Csv, e))?;
        }

        writer
            .into_inner()
            .map_err(|e| CodecError::write(Format::Csv, e.error()))
    }
}

fn csv_field(value: &Value, column: &str) -> CodecResult<String> {
    Ok(match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(v) if v.is_finite() => format_float(*v),
        Value::Float(v) => {
            return Err(CodecError::UnsupportedValueType {
                format: Format::Csv,
                column: column.to_string(),
                detail: format!("non-finite float {v}"),
            })
        }
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
    })
}

/// Shortest text that reads back as the same float (never as an integer).
fn format_float(v: f64) -> String {
    // `Debug` keeps the `.0` on integral values and switches to exponent form
    // for very large or small magnitudes.
    format!("{v:?}")
}

/// Type a raw CSV cell.
fn guess_value_type(s: &str) -> Value {
    if s.is_empty() {
        return Value::Null;
    }
    if looks_numeric(s) {
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
    }
    if s == "true" || s == "false" {
        return Value::Bool(s == "true");
    }
    Value::String(s.to_string())
}

/// Digits, sign, decimal point and exponent only; keeps `inf`/`NaN` as text.
fn looks_numeric(s: &str) -> bool {
    s.bytes().any(|b| b.is_ascii_digit())
        && s
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
}
