use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use clap::Parser;

use rowsieve::data::codec::{CodecOptions, JsonLayout};
use rowsieve::data::loader;
use rowsieve::{EngineConfig, FilterEngine, Format, TabularDataset, Value};

/// Filter a CSV, JSON or Parquet file with chained expressions.
#[derive(Debug, Parser)]
#[command(name = "sieve", version, about)]
struct Cli {
    /// Input file (.csv, .json, .jsonl, .parquet)
    input: PathBuf,

    /// Input format; defaults to the file extension
    #[arg(long)]
    format: Option<Format>,

    /// Filter expression, e.g. "age >= 18"; repeat to narrow further
    #[arg(short = 'f', long = "filter")]
    filters: Vec<String>,

    /// Write the filtered rows here
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format; defaults to the output extension
    #[arg(long)]
    output_format: Option<Format>,

    /// JSON output layout: "lines" or "array"
    #[arg(long, default_value_t = JsonLayout::Lines)]
    json_layout: JsonLayout,

    /// Rows to print after filtering (0 to disable)
    #[arg(long, default_value_t = 20)]
    preview: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    run(&cli).inspect_err(|e| log::error!("{e:#}"))
}

fn run(cli: &Cli) -> Result<()> {
    let mut engine = FilterEngine::new(EngineConfig {
        codec: CodecOptions {
            json_layout: cli.json_layout,
        },
        ..Default::default()
    });

    loader::load_file(&mut engine, &cli.input, cli.format)?;
    for text in &cli.filters {
        engine
            .add_filter(text)
            .with_context(|| format!("adding filter `{text}`"))?;
    }
    let summary = engine.apply_filters()?;

    for stage in &summary.stages {
        eprintln!(
            "{:>8} → {:<8} {}",
            stage.input_rows, stage.kept_rows, stage.expression
        );
    }
    eprintln!("{} of {} rows kept", summary.kept_rows, summary.total_rows);

    if cli.preview > 0 {
        if let Some(filtered) = engine.filtered() {
            print_preview(filtered, cli.preview)?;
        }
    }

    if let Some(output) = &cli.output {
        let format = loader::save_file(&engine, output, cli.output_format)?;
        eprintln!("wrote {} ({format})", output.display());
    }

    Ok(())
}

fn print_preview(dataset: &TabularDataset, limit: usize) -> Result<()> {
    if dataset.columns().is_empty() {
        println!("(no columns)");
        return Ok(());
    }
    let batch = preview_batch(dataset, limit)?;
    println!("{}", pretty_format_batches(&[batch])?);
    if dataset.len() > limit {
        println!("… {} more rows", dataset.len() - limit);
    }
    Ok(())
}

/// Every column as text, so mixed-type columns still display.
fn preview_batch(dataset: &TabularDataset, limit: usize) -> Result<RecordBatch> {
    let shown = dataset.len().min(limit);
    let mut fields = Vec::with_capacity(dataset.width());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(dataset.width());

    for (idx, name) in dataset.columns().iter().enumerate() {
        let mut builder = StringBuilder::new();
        for row in &dataset.rows()[..shown] {
            match &row[idx] {
                Value::Null => builder.append_null(),
                value => builder.append_value(value.to_string()),
            }
        }
        fields.push(Field::new(name, DataType::Utf8, true));
        arrays.push(Arc::new(builder.finish()));
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).context("building preview")
}
