use std::fmt;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

/// The encodings a dataset can be read from and written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Csv,
    Json,
    /// Apache Parquet.
    Columnar,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::Csv, Format::Json, Format::Columnar];

    /// Label shown in format selectors.
    pub fn label(self) -> &'static str {
        match self {
            Format::Csv => "CSV",
            Format::Json => "JSON",
            Format::Columnar => "Parquet",
        }
    }

    /// File extensions (without dot) belonging to this format; the first is preferred.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Format::Csv => &["csv"],
            Format::Json => &["json", "jsonl", "ndjson"],
            Format::Columnar => &["parquet", "pq"],
        }
    }

    /// Format implied by a path's extension, if it has a known one.
    pub fn from_path(path: &Path) -> Option<Format> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())?
            .to_ascii_lowercase();
        Format::ALL
            .into_iter()
            .find(|f| f.extensions().contains(&ext.as_str()))
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown format '{0}' (expected csv, json or parquet)")]
pub struct UnknownFormat(pub String);

impl FromStr for Format {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Format::Csv),
            "json" | "jsonl" | "ndjson" => Ok(Format::Json),
            "parquet" | "pq" | "columnar" => Ok(Format::Columnar),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}
