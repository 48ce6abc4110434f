use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::reader::ChunkReader;
use serde_json::Value as JsonValue;

use crate::config::DataOrigin;
use crate::error::DashError;

use super::model::{CellValue, Dataset, Table};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load the dataset from `origin`. Never fails:
///
/// * resource not found → empty dataset
/// * anything else (parse, network, unsupported format) → a one-cell
///   diagnostic dataset carrying the message
pub fn load(origin: &DataOrigin) -> Dataset {
    match try_load(origin) {
        Ok(dataset) => {
            log::info!(
                "Loaded {} rows with columns {:?} from {origin}",
                dataset.len(),
                dataset.columns()
            );
            dataset
        }
        Err(DashError::ResourceNotFound { origin }) => {
            log::warn!("Dataset not found at {origin}; continuing with an empty table");
            Dataset::empty()
        }
        Err(e) => {
            log::warn!("Failed to load dataset from {origin}: {e}");
            Dataset::diagnostic(e.to_string())
        }
    }
}

/// Load the dataset, classifying failures into [`DashError`].
pub fn try_load(origin: &DataOrigin) -> Result<Dataset, DashError> {
    match origin {
        DataOrigin::File(path) => load_file(path),
        DataOrigin::Url(url) => load_url(url),
    }
}

/// Supported formats, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Csv,
    Json,
    Parquet,
}

fn format_for(name: &str) -> Result<Format> {
    // For URLs only the path counts; query strings and fragments never do.
    let name = match name.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map_or("", |(_, path)| path),
        None => name,
    };
    let name = name.split(['?', '#']).next().unwrap_or(name);
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "" | "csv" => Ok(Format::Csv),
        "json" => Ok(Format::Json),
        "parquet" | "pq" => Ok(Format::Parquet),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

fn load_file(path: &Path) -> Result<Dataset, DashError> {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(DashError::ResourceNotFound {
                origin: path.display().to_string(),
            });
        }
        Err(e) => {
            return Err(DashError::ParseOrNetwork(
                anyhow::Error::new(e).context(format!("opening {}", path.display())),
            ));
        }
    };

    let parsed = format_for(&path.to_string_lossy()).and_then(|format| match format {
        Format::Csv => parse_csv(file),
        Format::Json => {
            let mut file = file;
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes).context("reading JSON file")?;
            parse_json(&bytes)
        }
        Format::Parquet => parse_parquet(file),
    });
    parsed.map_err(DashError::ParseOrNetwork)
}

fn load_url(url: &str) -> Result<Dataset, DashError> {
    let format = format_for(url).map_err(DashError::ParseOrNetwork)?;
    let response =
        reqwest::blocking::get(url).map_err(|e| network_error(format!("fetching {url}"), e))?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(DashError::ResourceNotFound {
            origin: url.to_string(),
        });
    }
    if !status.is_success() {
        return Err(DashError::ParseOrNetwork(anyhow::anyhow!(
            "fetching {url}: HTTP {status}"
        )));
    }

    let body = response
        .bytes()
        .map_err(|e| network_error(format!("reading response body from {url}"), e))?;

    let parsed = match format {
        Format::Csv => parse_csv(&body[..]),
        Format::Json => parse_json(&body),
        Format::Parquet => parse_parquet(body),
    };
    parsed.map_err(DashError::ParseOrNetwork)
}

/// reqwest nests the same message several levels deep; keep only the root.
fn network_error(what: String, err: reqwest::Error) -> DashError {
    let err = anyhow::Error::from(err);
    DashError::ParseOrNetwork(anyhow::anyhow!("{what}: {}", err.root_cause()))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Header row with column names, one record per row. Cell types are
/// guessed per cell.
pub fn parse_csv<R: Read>(input: R) -> Result<Dataset> {
    let mut reader = csv::Reader::from_reader(input);
    let columns: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(record.iter().map(guess_cell_type).collect());
    }

    Ok(Table::new(columns, rows))
}

fn guess_cell_type(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false") {
        return CellValue::Bool(s.eq_ignore_ascii_case("true"));
    }
    CellValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')`:
///
/// ```json
/// [
///   { "abbrev": "AL", "total": 18.8, "speeding": 7.332 },
///   ...
/// ]
/// ```
///
/// Columns appear in first-seen order; keys a record lacks become nulls.
pub fn parse_json(bytes: &[u8]) -> Result<Dataset> {
    let root: JsonValue = serde_json::from_slice(bytes).context("parsing JSON")?;
    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut columns: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            columns
                .iter()
                .map(|col| obj.get(col).map_or(CellValue::Null, json_to_cell))
                .collect()
        })
        .collect();

    Ok(Table::new(columns, rows))
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Flat Parquet file: every column is read as one cell per row. Works with
/// files written by both **Pandas** (`df.to_parquet()`) and **Polars**
/// (`df.write_parquet()`).
pub fn parse_parquet<R: ChunkReader + 'static>(input: R) -> Result<Dataset> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(input)
        .context("reading parquet metadata")?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            rows.push(
                batch
                    .columns()
                    .iter()
                    .map(|col| extract_cell(col, row))
                    .collect(),
            );
        }
    }

    Ok(Table::new(columns, rows))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    let any = col.as_any();
    match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map_or(CellValue::Null, |s| CellValue::String(s.value(row).to_string())),
        DataType::LargeUtf8 => CellValue::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map_or(CellValue::Null, |a| CellValue::Integer(a.value(row) as i64)),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map_or(CellValue::Null, |a| CellValue::Integer(a.value(row))),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map_or(CellValue::Null, |a| CellValue::Float(a.value(row) as f64)),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map_or(CellValue::Null, |a| CellValue::Float(a.value(row))),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map_or(CellValue::Null, |a| CellValue::Bool(a.value(row))),
        other => CellValue::String(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_cells_are_typed() {
        let text = "abbrev,total,speeding,flag\nAL,18.8,7,True\nAK,,x,false\n";
        let ds = parse_csv(text.as_bytes()).unwrap();
        assert_eq!(ds.columns().len(), 4);
        assert_eq!(ds.cell(0, "total"), Some(&CellValue::Float(18.8)));
        assert_eq!(ds.cell(0, "speeding"), Some(&CellValue::Integer(7)));
        assert_eq!(ds.cell(0, "flag"), Some(&CellValue::Bool(true)));
        assert_eq!(ds.cell(1, "total"), Some(&CellValue::Null));
        assert_eq!(ds.cell(1, "speeding"), Some(&CellValue::String("x".into())));
        assert_eq!(ds.cell(1, "flag"), Some(&CellValue::Bool(false)));
    }

    #[test]
    fn ragged_csv_is_a_parse_error() {
        assert!(parse_csv("a,b\n1,2,3\n".as_bytes()).is_err());
    }

    #[test]
    fn json_columns_in_first_seen_order() {
        let text = br#"[{"abbrev":"AL","total":18.8},{"total":3,"alcohol":true}]"#;
        let ds = parse_json(text).unwrap();
        assert_eq!(
            ds.columns(),
            &["abbrev".to_string(), "total".to_string(), "alcohol".to_string()]
        );
        assert_eq!(ds.cell(1, "abbrev"), Some(&CellValue::Null));
        assert_eq!(ds.cell(1, "total"), Some(&CellValue::Integer(3)));
        assert_eq!(ds.cell(1, "alcohol"), Some(&CellValue::Bool(true)));
    }

    #[test]
    fn json_must_be_records() {
        assert!(parse_json(br#"{"abbrev":"AL"}"#).is_err());
        assert!(parse_json(br#"[1, 2]"#).is_err());
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(format_for("data/car_crashes.csv").unwrap(), Format::Csv);
        assert_eq!(format_for("https://host/crashes").unwrap(), Format::Csv);
        assert_eq!(format_for("https://example.org").unwrap(), Format::Csv);
        assert_eq!(format_for("https://host/c.json?raw=1").unwrap(), Format::Json);
        assert_eq!(format_for("c.PQ").unwrap(), Format::Parquet);
        assert!(format_for("c.xlsx").is_err());
    }

    #[test]
    fn missing_file_is_an_empty_dataset() {
        let origin = DataOrigin::File("definitely/not/here.csv".into());
        assert!(matches!(
            try_load(&origin),
            Err(DashError::ResourceNotFound { .. })
        ));
        let ds = load(&origin);
        assert!(ds.is_empty());
        assert!(ds.columns().is_empty());
    }
}
