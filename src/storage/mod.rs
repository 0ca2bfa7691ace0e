//! Storage backend (Arrow/Parquet)
//!
//! Results artifacts and consolidated tables are read and written as whole
//! Parquet files. Batches are held in memory; a single run covers a few
//! hundred stations over a few decades of days, well within RAM.

use crate::{Error, Result};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;

/// Row group size for written files
pub const ROW_GROUP_SIZE: usize = 64 * 1024;

/// Storage engine for Arrow/Parquet data
#[derive(Debug)]
pub struct StorageEngine {
    batches: Vec<RecordBatch>,
}

impl StorageEngine {
    /// Create a new storage engine from existing batches
    #[must_use]
    pub fn new(batches: Vec<RecordBatch>) -> Self {
        Self { batches }
    }

    /// Load table from Parquet file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load_parquet<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| {
            Error::StorageError(format!("Failed to open Parquet file: {e}"))
        })?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| {
            Error::StorageError(format!("Failed to parse Parquet file: {e}"))
        })?;

        let reader = builder.build().map_err(|e| {
            Error::StorageError(format!("Failed to create Parquet reader: {e}"))
        })?;

        // Read all batches into memory
        let mut batches = Vec::new();
        for batch in reader {
            let batch = batch.map_err(|e| {
                Error::StorageError(format!("Failed to read record batch: {e}"))
            })?;
            batches.push(batch);
        }

        Ok(Self { batches })
    }

    /// Write all batches to a Parquet file
    ///
    /// # Errors
    ///
    /// Returns error if there is nothing to write, batch schemas disagree, or
    /// the file cannot be written
    pub fn write_parquet<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let Some(first) = self.batches.first() else {
            return Err(Error::StorageError("No record batches to write".to_string()));
        };
        let schema = first.schema();

        let file = File::create(path.as_ref()).map_err(|e| {
            Error::StorageError(format!("Failed to create Parquet file: {e}"))
        })?;
        let props = WriterProperties::builder()
            .set_max_row_group_size(ROW_GROUP_SIZE)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;
        for batch in &self.batches {
            if batch.schema() != schema {
                return Err(Error::StorageError(format!(
                    "Schema mismatch: expected {:?}, got {:?}",
                    schema,
                    batch.schema()
                )));
            }
            writer.write(batch)?;
        }
        writer.close()?;
        Ok(())
    }

    /// Get all record batches
    #[must_use]
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Total number of rows across batches
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }
}
