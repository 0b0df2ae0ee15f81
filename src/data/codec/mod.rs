//! Byte encodings for [`TabularDataset`].
//!
//! Codecs never touch the file system: they turn a byte slice into a table and
//! a table into a byte buffer. Path handling lives in [`crate::data::loader`].

mod columnar;
mod csv_codec;
mod json_codec;

use std::fmt;
use std::str::FromStr;

pub use columnar::ColumnarCodec;
pub use csv_codec::CsvCodec;
pub use json_codec::JsonCodec;

use super::format::Format;
use super::model::TabularDataset;
use crate::error::CodecResult;

/// Bidirectional converter between a table and one encoding.
pub trait Codec {
    fn decode(&self, bytes: &[u8]) -> CodecResult<TabularDataset>;

    fn encode(&self, dataset: &TabularDataset) -> CodecResult<Vec<u8>>;
}

/// How JSON output is laid out. Decoding accepts either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonLayout {
    /// A single top-level array of objects.
    Array,
    /// One object per line.
    #[default]
    Lines,
}

impl fmt::Display for JsonLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonLayout::Array => f.write_str("array"),
            JsonLayout::Lines => f.write_str("lines"),
        }
    }
}

impl FromStr for JsonLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "array" | "records" => Ok(JsonLayout::Array),
            "lines" | "jsonl" | "ndjson" => Ok(JsonLayout::Lines),
            other => Err(format!("unknown JSON layout '{other}' (expected array or lines)")),
        }
    }
}

/// Encoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodecOptions {
    pub json_layout: JsonLayout,
}

/// The codec for a format.
pub fn codec_for(format: Format, options: &CodecOptions) -> Box<dyn Codec> {
    match format {
        Format::Csv => Box::new(CsvCodec),
        Format::Json => Box::new(JsonCodec::new(options.json_layout)),
        Format::Columnar => Box::new(ColumnarCodec),
    }
}

/// Decode `bytes` as `format`.
pub fn decode(bytes: &[u8], format: Format) -> CodecResult<TabularDataset> {
    codec_for(format, &CodecOptions::default()).decode(bytes)
}

/// Encode `dataset` as `format` with default options.
pub fn encode(dataset: &TabularDataset, format: Format) -> CodecResult<Vec<u8>> {
    encode_with(dataset, format, &CodecOptions::default())
}

pub fn encode_with(
    dataset: &TabularDataset,
    format: Format,
    options: &CodecOptions,
) -> CodecResult<Vec<u8>> {
    codec_for(format, options).encode(dataset)
}
