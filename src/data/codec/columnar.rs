use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BooleanBuilder, Float64Builder, Int64Builder, StringBuilder,
};
use arrow::datatypes::{
    DataType, Field, Float16Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type,
    Int8Type, Schema, SchemaRef, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;

use super::Codec;
use crate::data::format::Format;
use crate::data::model::{TabularDataset, Value};
use crate::error::{CodecError, CodecResult, SchemaError};

// ---------------------------------------------------------------------------
// Parquet codec
// ---------------------------------------------------------------------------

/// Parquet via Arrow record batches.
///
/// Column types on write:
/// - all integers → `Int64`
/// - floats, or integers mixed with floats → `Float64`
/// - booleans → `Boolean`
/// - strings, or only nulls → `Utf8`
///
/// A column mixing strings, booleans and numbers has no Arrow type and is
/// rejected. Every column is written nullable.
///
/// Widening is one-way: integers in a mixed `Float64` column read back as
/// floats, so such a table is not equal to itself after a round trip.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnarCodec;

impl Codec for ColumnarCodec {
    fn decode(&self, bytes: &[u8]) -> CodecResult<TabularDataset> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(Bytes::copy_from_slice(bytes))
            .map_err(|e| CodecError::malformed(Format::Columnar, format!("reading schema: {e}")))?;

        let declared_rows = builder.metadata().file_metadata().num_rows();
        let schema = builder.schema().clone();
        let columns: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();

        for field in schema.fields() {
            if field.data_type().is_nested() {
                return Err(CodecError::malformed(
                    Format::Columnar,
                    format!(
                        "column '{}' has nested type {}",
                        field.name(),
                        field.data_type()
                    ),
                ));
            }
        }

        let reader = builder
            .build()
            .map_err(|e| CodecError::malformed(Format::Columnar, e))?;

        let mut rows: Vec<Vec<Value>> = Vec::new();
        for batch_result in reader {
            let batch = batch_result.map_err(|e| CodecError::malformed(Format::Columnar, e))?;
            for row in 0..batch.num_rows() {
                let values = batch
                    .columns()
                    .iter()
                    .zip(&columns)
                    .map(|(col, name)| extract_value(col, row, name))
                    .collect::<CodecResult<Vec<Value>>>()?;
                rows.push(values);
            }
        }

        check_row_count(declared_rows, rows.len())?;
        Ok(TabularDataset::try_new(columns, rows)?)
    }

    fn encode(&self, dataset: &TabularDataset) -> CodecResult<Vec<u8>> {
        if dataset.columns().is_empty() {
            return Err(CodecError::write(
                Format::Columnar,
                "a Parquet file needs at least one column",
            ));
        }

        let batch = to_record_batch(dataset)?;

        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), None)
            .map_err(|e| CodecError::write(Format::Columnar, e))?;
        writer
            .write(&batch)
            .map_err(|e| CodecError::write(Format::Columnar, e))?;
        writer
            .close()
            .map_err(|e| CodecError::write(Format::Columnar, e))?;

        Ok(buf)
    }
}

// -- Encoding helpers --

/// Build a typed Arrow batch holding the whole dataset.
fn to_record_batch(dataset: &TabularDataset) -> CodecResult<RecordBatch> {
    let mut fields = Vec::with_capacity(dataset.width());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(dataset.width());

    for (idx, name) in dataset.columns().iter().enumerate() {
        let cells: Vec<&Value> = dataset.rows().iter().map(|r| &r[idx]).collect();
        let data_type = column_type(name, &cells)?;
        arrays.push(build_array(&data_type, &cells));
        fields.push(Field::new(name, data_type, true));
    }

    let schema: SchemaRef = Arc::new(Schema::new(fields));
    let options = RecordBatchOptions::new().with_row_count(Some(dataset.len()));
    RecordBatch::try_new_with_options(schema, arrays, &options)
        .map_err(|e| CodecError::write(Format::Columnar, e))
}

/// Pick the narrowest Arrow type that holds every non-null cell.
fn column_type(name: &str, cells: &[&Value]) -> CodecResult<DataType> {
    let mut current: Option<DataType> = None;
    for cell in cells {
        let cell_type = match cell {
            Value::Null => continue,
            Value::String(_) => DataType::Utf8,
            Value::Integer(_) => DataType::Int64,
            Value::Float(_) => DataType::Float64,
            Value::Bool(_) => DataType::Boolean,
        };
        current = match (current, cell_type) {
            (None, t) => Some(t),
            (Some(a), b) if a == b => Some(a),
            (Some(DataType::Int64), DataType::Float64) | (Some(DataType::Float64), DataType::Int64) => {
                Some(DataType::Float64)
            }
            (Some(a), _) => {
                return Err(CodecError::UnsupportedValueType {
                    format: Format::Columnar,
                    column: name.to_string(),
                    detail: format!("{} value in a {a} column", cell.type_name()),
                })
            }
        };
    }
    Ok(current.unwrap_or(DataType::Utf8))
}

fn build_array(data_type: &DataType, cells: &[&Value]) -> ArrayRef {
    match data_type {
        DataType::Int64 => {
            let mut b = Int64Builder::with_capacity(cells.len());
            for cell in cells {
                match cell {
                    Value::Integer(i) => b.append_value(*i),
                    _ => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
        DataType::Float64 => {
            let mut b = Float64Builder::with_capacity(cells.len());
            for cell in cells {
                match cell.as_f64() {
                    Some(v) => b.append_value(v),
                    None => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
        DataType::Boolean => {
            let mut b = BooleanBuilder::with_capacity(cells.len());
            for cell in cells {
                match cell {
                    Value::Bool(v) => b.append_value(*v),
                    _ => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
        _ => {
            let mut b = StringBuilder::new();
            for cell in cells {
                match cell {
                    Value::String(s) => b.append_value(s),
                    _ => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
    }
}

// -- Decoding helpers --

/// The footer's row count must match the rows the data pages produced.
fn check_row_count(declared: i64, found: usize) -> Result<(), SchemaError> {
    if usize::try_from(declared).ok() != Some(found) {
        return Err(SchemaError::RowCount {
            declared: declared.max(0) as usize,
            found,
        });
    }
    Ok(())
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &ArrayRef, row: usize, name: &str) -> CodecResult<Value> {
    if col.is_null(row) {
        return Ok(Value::Null);
    }
    Ok(match col.data_type() {
        DataType::Null => Value::Null,
        DataType::Boolean => Value::Bool(col.as_boolean().value(row)),
        DataType::Int8 => Value::Integer(col.as_primitive::<Int8Type>().value(row).into()),
        DataType::Int16 => Value::Integer(col.as_primitive::<Int16Type>().value(row).into()),
        DataType::Int32 => Value::Integer(col.as_primitive::<Int32Type>().value(row).into()),
        DataType::Int64 => Value::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => Value::Integer(col.as_primitive::<UInt8Type>().value(row).into()),
        DataType::UInt16 => Value::Integer(col.as_primitive::<UInt16Type>().value(row).into()),
        DataType::UInt32 => Value::Integer(col.as_primitive::<UInt32Type>().value(row).into()),
        DataType::UInt64 => {
            let v = col.as_primitive::<UInt64Type>().value(row);
            match i64::try_from(v) {
                Ok(i) => Value::Integer(i),
                Err(_) => Value::Float(v as f64),
            }
        }
        DataType::Float16 => Value::Float(col.as_primitive::<Float16Type>().value(row).to_f64()),
        DataType::Float32 => Value::Float(col.as_primitive::<Float32Type>().value(row).into()),
        DataType::Float64 => Value::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Utf8 => Value::String(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Utf8View => Value::String(col.as_string_view().value(row).to_string()),
        // Dates, timestamps, decimals and the like are kept as their display text.
        _ => Value::String(
            arrow::util::display::array_value_to_string(col.as_ref(), row).map_err(|e| {
                CodecError::malformed(Format::Columnar, format!("column '{name}': {e}"))
            })?,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int32Array, ListBuilder};

    fn write_batch(batch: &RecordBatch) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), None).unwrap();
        writer.write(batch).unwrap();
        writer.close().unwrap();
        buf
    }

    #[test]
    fn test_mixed_numbers_widen_to_float() {
        let ds = TabularDataset::try_new(
            vec!["n".into()],
            vec![vec![Value::Integer(1)], vec![Value::Float(2.5)]],
        )
        .unwrap();
        let back = ColumnarCodec.decode(&ColumnarCodec.encode(&ds).unwrap()).unwrap();
        assert_eq!(back.rows()[0][0], Value::Float(1.0));
        assert_eq!(back.rows()[1][0], Value::Float(2.5));
        assert_ne!(back, ds);
    }

    #[test]
    fn test_string_and_number_column_rejected() {
        let ds = TabularDataset::try_new(
            vec!["v".into()],
            vec![vec![Value::from("a")], vec![Value::Integer(1)]],
        )
        .unwrap();
        let err = ColumnarCodec.encode(&ds).unwrap_err();
        match err {
            CodecError::UnsupportedValueType { column, .. } => assert_eq!(column, "v"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_keeps_columns_of_empty_table() {
        let ds = TabularDataset::try_new(vec!["a".into(), "b".into()], vec![]).unwrap();
        let back = ColumnarCodec.decode(&ColumnarCodec.encode(&ds).unwrap()).unwrap();
        assert_eq!(back, ds);
    }

    #[test]
    fn test_reads_narrow_integer_types() {
        let schema = Arc::new(Schema::new(vec![Field::new("n", DataType::Int32, true)]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(Int32Array::from(vec![Some(7), None]))],
        )
        .unwrap();
        let ds = ColumnarCodec.decode(&write_batch(&batch)).unwrap();
        assert_eq!(ds.rows(), [vec![Value::Integer(7)], vec![Value::Null]]);
    }

    #[test]
    fn test_nested_column_is_malformed() {
        let mut list = ListBuilder::new(Int64Builder::new());
        list.values().append_value(1);
        list.append(true);
        let list_array = list.finish();
        let schema = Arc::new(Schema::new(vec![Field::new(
            "xs",
            list_array.data_type().clone(),
            true,
        )]));
        let batch = RecordBatch::try_new(schema, vec![Arc::new(list_array)]).unwrap();

        let err = ColumnarCodec.decode(&write_batch(&batch)).unwrap_err();
        assert!(matches!(err, CodecError::MalformedInput { .. }));
    }

    #[test]
    fn test_row_count_must_match_footer() {
        assert_eq!(check_row_count(3, 3), Ok(()));
        assert_eq!(
            check_row_count(5, 3),
            Err(SchemaError::RowCount {
                declared: 5,
                found: 3
            })
        );
        assert!(check_row_count(-1, 0).is_err());
    }

    #[test]
    fn test_row_count_mismatch_surfaces_as_schema_mismatch() {
        let err: CodecError = check_row_count(2, 1).unwrap_err().into();
        assert!(matches!(
            err,
            CodecError::SchemaMismatch(SchemaError::RowCount { .. })
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = ColumnarCodec.decode(b"definitely not parquet").unwrap_err();
        assert!(matches!(err, CodecError::MalformedInput { .. }));
    }
}
