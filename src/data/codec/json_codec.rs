use std::collections::HashMap;

use serde_json::{Map, Number, Value as JsonValue};

use super::{Codec, JsonLayout};
use crate::data::format::Format;
use crate::data::model::{TabularDataset, Value};
use crate::error::{CodecError, CodecResult};

// ---------------------------------------------------------------------------
// JSON codec
// ---------------------------------------------------------------------------

/// Records-oriented JSON, either as one array or one object per line:
///
/// ```json
/// [
///   { "age": 30, "name": "A" },
///   { "age": 15, "name": "B" }
/// ]
/// ```
///
/// Columns appear in first-seen key order. A key missing from a record reads
/// as null; a key first seen in a later record adds a column that is null for
/// the earlier ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    layout: JsonLayout,
}

impl JsonCodec {
    pub fn new(layout: JsonLayout) -> Self {
        JsonCodec { layout }
    }
}

impl Codec for JsonCodec {
    fn decode(&self, bytes: &[u8]) -> CodecResult<TabularDataset> {
        let text = std::str::from_utf8(bytes).map_err(|e| CodecError::malformed(Format::Json, e))?;

        let records: Vec<JsonValue> = if text.trim_start().starts_with('[') {
            serde_json::from_str(text).map_err(|e| CodecError::malformed(Format::Json, e))?
        } else {
            serde_json::Deserializer::from_str(text)
                .into_iter::<JsonValue>()
                .collect::<Result<_, _>>()
                .map_err(|e| CodecError::malformed(Format::Json, e))?
        };

        let mut columns: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut rows: Vec<Vec<Value>> = Vec::with_capacity(records.len());

        for (i, rec) in records.iter().enumerate() {
            let obj = rec.as_object().ok_or_else(|| {
                CodecError::malformed(Format::Json, format!("record {i} is not a JSON object"))
            })?;

            let mut row = vec![Value::Null; columns.len()];
            for (key, val) in obj {
                let value = json_to_value(val).ok_or_else(|| {
                    CodecError::malformed(
                        Format::Json,
                        format!("record {i}, field '{key}': nested values are not supported"),
                    )
                })?;
                let col = match positions.get(key) {
                    Some(&col) => col,
                    None => {
                        positions.insert(key.clone(), columns.len());
                        columns.push(key.clone());
                        row.push(Value::Null);
                        columns.len() - 1
                    }
                };
                row[col] = value;
            }
            rows.push(row);
        }

        // Rows read before a late column appeared are shorter; pad them.
        for row in &mut rows {
            row.resize(columns.len(), Value::Null);
        }

        Ok(TabularDataset::try_new(columns, rows)?)
    }

    fn encode(&self, dataset: &TabularDataset) -> CodecResult<Vec<u8>> {
        let objects = dataset
            .rows()
            .iter()
            .map(|row| {
                dataset
                    .columns()
                    .iter()
                    .zip(row)
                    .map(|(col, val)| Ok((col.clone(), value_to_json(val, col)?)))
                    .collect::<CodecResult<Map<String, JsonValue>>>()
            })
            .collect::<CodecResult<Vec<_>>>()?;

        match self.layout {
            JsonLayout::Array => serde_json::to_vec_pretty(&objects)
                .map_err(|e| CodecError::write(Format::Json, e)),
            JsonLayout::Lines => {
                let mut out = Vec::new();
                for obj in &objects {
                    serde_json::to_writer(&mut out, obj)
                        .map_err(|e| CodecError::write(Format::Json, e))?;
                    out.push(b'\n');
                }
                Ok(out)
            }
        }
    }
}

/// Scalars only; arrays and objects yield `None`.
fn json_to_value(val: &JsonValue) -> Option<Value> {
    Some(match val {
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        JsonValue::Array(_) | JsonValue::Object(_) => return None,
    })
}

fn value_to_json(val: &Value, column: &str) -> CodecResult<JsonValue> {
    Ok(match val {
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Integer(i) => JsonValue::Number((*i).into()),
        Value::Float(f) => match Number::from_f64(*f) {
            Some(n) => JsonValue::Number(n),
            None => {
                return Err(CodecError::UnsupportedValueType {
                    format: Format::Json,
                    column: column.to_string(),
                    detail: format!("non-finite float {f}"),
                })
            }
        },
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Null => JsonValue::Null,
    })
}
