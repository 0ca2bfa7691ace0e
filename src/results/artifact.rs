//! Results artifact codecs
//!
//! The artifact file keeps its upstream `.p` name; its content is detected
//! from the leading bytes:
//!
//! - **Parquet** (`PAR1`): long format, one row per station and day, columns
//!   `station` (Utf8), `date` (Date32), `qobs` / `qsim` (nullable Float64).
//!   Station order is order of first appearance.
//! - **JSON**: object of station id → `{"date": [...], "qobs": [...], "qsim": [...]}`.
//!   Missing values are `null`; the bare `NaN` token that Python's `json`
//!   module writes for missing floats is read as `null` too.

use super::{StationResults, StationSeries};
use crate::storage::StorageEngine;
use crate::{Error, Result};
use arrow::array::{Array, Date32Array, Float64Array, StringArray};
use arrow::datatypes::{DataType, Date32Type, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

const PARQUET_MAGIC: &[u8] = b"PAR1";
const PICKLE_PROTO: u8 = 0x80;

/// Encoding of a results artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    /// Long-format Parquet table
    Parquet,
    /// JSON object keyed by station id
    Json,
}

impl ArtifactFormat {
    /// Detect the format from the first bytes of an artifact.
    ///
    /// # Errors
    ///
    /// Returns error for empty input and for Python pickle streams, which
    /// carry pandas objects this crate cannot decode
    pub fn detect(head: &[u8]) -> Result<Self> {
        if head.starts_with(PARQUET_MAGIC) {
            return Ok(Self::Parquet);
        }
        match head.iter().copied().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => Ok(Self::Json),
            Some(PICKLE_PROTO) => Err(Error::InvalidInput(
                "pickle stream found; export the results as JSON or Parquet".to_string(),
            )),
            Some(_) => Err(Error::InvalidInput("unrecognized artifact encoding".to_string())),
            None => Err(Error::InvalidInput("artifact is empty".to_string())),
        }
    }
}

/// Decode a results artifact into the per-station mapping.
///
/// # Errors
///
/// Returns [`Error::ArtifactDecode`] if the file cannot be read or does not
/// hold a valid mapping
pub fn decode_artifact(path: &Path) -> Result<StationResults> {
    let bytes = std::fs::read(path).map_err(|e| Error::artifact(path, e.to_string()))?;
    let format =
        ArtifactFormat::detect(&bytes).map_err(|e| Error::artifact(path, e.to_string()))?;

    match format {
        ArtifactFormat::Json => serde_json::from_slice(&nan_to_null(&bytes))
            .map_err(|e| Error::artifact(path, e.to_string())),
        ArtifactFormat::Parquet => {
            let storage = StorageEngine::load_parquet(path)?;
            from_long_batches(storage.batches()).map_err(|e| Error::artifact(path, e.to_string()))
        }
    }
}

/// Replace bare `NaN` tokens outside string literals with `null`.
fn nan_to_null(bytes: &[u8]) -> Cow<'_, [u8]> {
    if !bytes.windows(3).any(|w| w == b"NaN") {
        return Cow::Borrowed(bytes);
    }

    let mut out = Vec::with_capacity(bytes.len() + 16);
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
        } else if b == b'"' {
            in_string = true;
        } else if bytes[i..].starts_with(b"NaN") {
            out.extend_from_slice(b"null");
            i += 3;
            continue;
        }
        out.push(b);
        i += 1;
    }
    Cow::Owned(out)
}

/// Write results as a JSON artifact.
///
/// # Errors
///
/// Returns error if the file cannot be written
pub fn write_json_artifact(results: &StationResults, path: &Path) -> Result<()> {
    let content =
        serde_json::to_vec(results).map_err(|e| Error::artifact(path, e.to_string()))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Write results as a long-format Parquet artifact.
///
/// # Errors
///
/// Returns error if the table cannot be built or written
pub fn write_parquet_artifact(results: &StationResults, path: &Path) -> Result<()> {
    let batch = to_long_batch(results)?;
    StorageEngine::new(vec![batch]).write_parquet(path)
}

fn long_schema() -> Schema {
    Schema::new(vec![
        Field::new("station", DataType::Utf8, false),
        Field::new("date", DataType::Date32, false),
        Field::new("qobs", DataType::Float64, true),
        Field::new("qsim", DataType::Float64, true),
    ])
}

fn to_long_batch(results: &StationResults) -> Result<RecordBatch> {
    let mut stations = Vec::new();
    let mut dates = Vec::new();
    let mut qobs = Vec::new();
    let mut qsim = Vec::new();

    for (id, series) in results.iter() {
        stations.extend(std::iter::repeat(id).take(series.len()));
        dates.extend(series.dates().iter().map(|d| Date32Type::from_naive_date(*d)));
        qobs.extend_from_slice(series.qobs());
        qsim.extend_from_slice(series.qsim());
    }

    Ok(RecordBatch::try_new(
        Arc::new(long_schema()),
        vec![
            Arc::new(StringArray::from(stations)),
            Arc::new(Date32Array::from(dates)),
            Arc::new(Float64Array::from(qobs)),
            Arc::new(Float64Array::from(qsim)),
        ],
    )?)
}

#[derive(Default)]
struct SeriesBuilder {
    dates: Vec<NaiveDate>,
    qobs: Vec<Option<f64>>,
    qsim: Vec<Option<f64>>,
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    let index = batch.schema().index_of(name)?;
    batch
        .column(index)
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::InvalidInput(format!("column `{name}` has unexpected type")))
}

fn from_long_batches(batches: &[RecordBatch]) -> Result<StationResults> {
    let mut order: Vec<String> = Vec::new();
    let mut builders: HashMap<String, SeriesBuilder> = HashMap::new();

    for batch in batches {
        let station = column::<StringArray>(batch, "station")?;
        let date = column::<Date32Array>(batch, "date")?;
        let qobs = column::<Float64Array>(batch, "qobs")?;
        let qsim = column::<Float64Array>(batch, "qsim")?;

        for row in 0..batch.num_rows() {
            if station.is_null(row) || date.is_null(row) {
                return Err(Error::InvalidInput(format!("row {row} has no station or date")));
            }
            let id = station.value(row);
            let day = date
                .value_as_date(row)
                .ok_or_else(|| Error::InvalidInput(format!("row {row} has an invalid date")))?;

            if !builders.contains_key(id) {
                order.push(id.to_string());
            }
            let builder = builders.entry(id.to_string()).or_default();
            builder.dates.push(day);
            builder.qobs.push(qobs.is_valid(row).then(|| qobs.value(row)));
            builder.qsim.push(qsim.is_valid(row).then(|| qsim.value(row)));
        }
    }

    let mut results = StationResults::new();
    for id in order {
        if let Some(builder) = builders.remove(&id) {
            let series = StationSeries::new(builder.dates, builder.qobs, builder.qsim)?;
            results.push(id, series);
        }
    }
    Ok(results)
}
