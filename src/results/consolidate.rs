//! Consolidation of per-station series into wide tables
//!
//! Every station contributes one column named after its id to each table:
//! its `qobs` to the observed table and its `qsim` to the simulated one.
//! Columns follow mapping order and repeated ids produce repeated columns.
//!
//! When all stations share one time index it is used as-is. Otherwise the
//! tables are outer-aligned on the sorted union of dates and a station's
//! missing days are null.

use super::{StationResults, StationSeries};
use crate::storage::StorageEngine;
use crate::{Error, Result};
use arrow::array::{Array, ArrayRef, Date32Array, Float64Array};
use arrow::datatypes::{DataType, Date32Type, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the time index column (always column 0).
pub const DATE_COLUMN: &str = "date";

/// Observed and simulated discharge, one column per station.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedTables {
    qobs: RecordBatch,
    qsim: RecordBatch,
}

impl ConsolidatedTables {
    /// Observed discharge table.
    #[must_use]
    pub const fn qobs(&self) -> &RecordBatch {
        &self.qobs
    }

    /// Simulated discharge table.
    #[must_use]
    pub const fn qsim(&self) -> &RecordBatch {
        &self.qsim
    }

    /// Number of time steps.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.qobs.num_rows()
    }

    /// Station column names, in column order.
    #[must_use]
    pub fn station_ids(&self) -> Vec<String> {
        self.qobs
            .schema()
            .fields()
            .iter()
            .skip(1)
            .map(|field| field.name().clone())
            .collect()
    }

    /// Time index shared by both tables.
    #[must_use]
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.qobs
            .column(0)
            .as_any()
            .downcast_ref::<Date32Array>()
            .map(|dates| (0..dates.len()).filter_map(|i| dates.value_as_date(i)).collect())
            .unwrap_or_default()
    }

    /// First observed column for a station.
    #[must_use]
    pub fn observed(&self, station: &str) -> Option<&Float64Array> {
        station_column(&self.qobs, station)
    }

    /// First simulated column for a station.
    #[must_use]
    pub fn simulated(&self, station: &str) -> Option<&Float64Array> {
        station_column(&self.qsim, station)
    }

    /// Export both tables as `qobs.parquet` and `qsim.parquet` in `dir`.
    ///
    /// Returns the two file paths.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created or a file cannot be written
    pub fn write_parquet(&self, dir: &Path) -> Result<(PathBuf, PathBuf)> {
        std::fs::create_dir_all(dir)?;
        let qobs_path = dir.join("qobs.parquet");
        let qsim_path = dir.join("qsim.parquet");

        StorageEngine::new(vec![self.qobs.clone()]).write_parquet(&qobs_path)?;
        StorageEngine::new(vec![self.qsim.clone()]).write_parquet(&qsim_path)?;

        Ok((qobs_path, qsim_path))
    }
}

fn station_column<'a>(table: &'a RecordBatch, station: &str) -> Option<&'a Float64Array> {
    let schema = table.schema();
    let index = schema
        .fields()
        .iter()
        .skip(1)
        .position(|field| field.name() == station)?;
    table.column(index + 1).as_any().downcast_ref::<Float64Array>()
}

/// Build the observed and simulated tables from per-station results.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if there are no stations
pub fn consolidate(results: &StationResults) -> Result<ConsolidatedTables> {
    if results.is_empty() {
        return Err(Error::InvalidInput("no stations to consolidate".to_string()));
    }

    let index = shared_index(results);

    let mut fields = vec![Field::new(DATE_COLUMN, DataType::Date32, false)];
    fields.extend(
        results
            .iter()
            .map(|(id, _)| Field::new(id, DataType::Float64, true)),
    );
    let schema: SchemaRef = Arc::new(Schema::new(fields));

    let date_column: ArrayRef = Arc::new(Date32Array::from_iter_values(
        index.iter().map(|d| Date32Type::from_naive_date(*d)),
    ));

    let mut qobs_columns = vec![Arc::clone(&date_column)];
    let mut qsim_columns = vec![date_column];
    for (_, series) in results.iter() {
        let (qobs, qsim) = align(series, &index);
        qobs_columns.push(Arc::new(Float64Array::from(qobs)));
        qsim_columns.push(Arc::new(Float64Array::from(qsim)));
    }

    Ok(ConsolidatedTables {
        qobs: RecordBatch::try_new(Arc::clone(&schema), qobs_columns)?,
        qsim: RecordBatch::try_new(schema, qsim_columns)?,
    })
}

/// The common index if all stations agree, else the sorted union of dates.
fn shared_index(results: &StationResults) -> Vec<NaiveDate> {
    let mut stations = results.iter().map(|(_, series)| series.dates());
    let first = stations.next().unwrap_or_default();
    if stations.all(|dates| dates == first) {
        return first.to_vec();
    }

    results
        .iter()
        .flat_map(|(_, series)| series.dates().iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

type Column = Vec<Option<f64>>;

fn align(series: &StationSeries, index: &[NaiveDate]) -> (Column, Column) {
    if series.dates() == index {
        return (series.qobs().to_vec(), series.qsim().to_vec());
    }

    // first occurrence wins for a repeated date
    let mut by_date: HashMap<NaiveDate, usize> = HashMap::with_capacity(series.len());
    for (row, date) in series.dates().iter().enumerate() {
        by_date.entry(*date).or_insert(row);
    }

    index
        .iter()
        .map(|date| match by_date.get(date) {
            Some(&row) => (series.qobs()[row], series.qsim()[row]),
            None => (None, None),
        })
        .unzip()
}
