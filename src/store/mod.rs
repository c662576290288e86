use std::fs::{self, File};
use std::path::Path;

use anyhow::{Context, Result};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate, Utc};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::cli::DatasetKind;
use crate::settings::Settings;
use crate::util::{commit_partial, ensure_directory, partial_path};

mod columnar;
mod merge;
#[cfg(test)]
mod tests;

pub use merge::merge_rows;

pub trait Record: Clone + Serialize + DeserializeOwned {
    type Key: Ord + Clone;

    const KIND: DatasetKind;

    fn key(&self) -> Self::Key;

    fn reference_date(&self) -> NaiveDate;

    fn schema() -> SchemaRef;

    fn to_batch(rows: &[Self]) -> Result<RecordBatch>;

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>>;
}

#[derive(Debug, Clone, Serialize)]
pub struct TableInfo {
    pub dataset: String,
    pub path: String,
    pub size_bytes: u64,
    pub modified_at: Option<String>,
    pub row_count: usize,
    pub first_reference_date: Option<NaiveDate>,
    pub last_reference_date: Option<NaiveDate>,
    pub report_count: usize,
}

pub fn load<R: Record>(settings: &Settings) -> Result<Vec<R>> {
    let parquet_path = settings.parquet_path(R::KIND);
    if parquet_path.exists() {
        return read_parquet::<R>(&parquet_path);
    }

    let csv_path = settings.csv_path(R::KIND);
    if csv_path.exists() {
        warn!(
            path = %csv_path.display(),
            "parquet dataset missing, loading csv mirror"
        );
        return read_csv::<R>(&csv_path);
    }

    debug!(dataset = R::KIND.as_str(), "dataset not written yet");
    Ok(Vec::new())
}

pub fn save<R: Record>(settings: &Settings, rows: &[R]) -> Result<()> {
    ensure_directory(&settings.output_dir)?;

    let parquet_path = settings.parquet_path(R::KIND);
    write_parquet(&parquet_path, rows)?;

    let csv_path = settings.csv_path(R::KIND);
    write_csv(&csv_path, rows)?;

    info!(
        dataset = R::KIND.as_str(),
        rows = rows.len(),
        parquet = %parquet_path.display(),
        csv = %csv_path.display(),
        "dataset written"
    );
    Ok(())
}

pub fn describe<R: Record>(settings: &Settings) -> Result<Option<TableInfo>> {
    let path = settings.parquet_path(R::KIND);
    if !path.exists() {
        return Ok(None);
    }

    let metadata =
        fs::metadata(&path).with_context(|| format!("failed to inspect {}", path.display()))?;
    let modified_at = metadata
        .modified()
        .ok()
        .map(|time| DateTime::<Utc>::from(time).to_rfc3339());

    let rows = read_parquet::<R>(&path)?;
    let mut reports = rows
        .iter()
        .map(Record::reference_date)
        .collect::<Vec<NaiveDate>>();
    reports.sort();
    reports.dedup();

    Ok(Some(TableInfo {
        dataset: R::KIND.file_stem().to_string(),
        path: path.display().to_string(),
        size_bytes: metadata.len(),
        modified_at,
        row_count: rows.len(),
        first_reference_date: reports.first().copied(),
        last_reference_date: reports.last().copied(),
        report_count: reports.len(),
    }))
}

fn read_parquet<R: Record>(path: &Path) -> Result<Vec<R>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("failed to read parquet file: {}", path.display()))?
        .build()
        .with_context(|| format!("failed to build parquet reader for {}", path.display()))?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch =
            batch.with_context(|| format!("failed to decode batch in {}", path.display()))?;
        let decoded = R::from_batch(&batch)
            .with_context(|| format!("unexpected layout in {}", path.display()))?;
        rows.extend(decoded);
    }

    debug!(path = %path.display(), rows = rows.len(), "loaded parquet dataset");
    Ok(rows)
}

fn write_parquet<R: Record>(path: &Path, rows: &[R]) -> Result<()> {
    let batch = R::to_batch(rows)?;
    let partial = partial_path(path);

    let file = File::create(&partial)
        .with_context(|| format!("failed to create {}", partial.display()))?;
    let properties = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(properties))
        .with_context(|| format!("failed to start parquet writer for {}", path.display()))?;
    writer
        .write(&batch)
        .with_context(|| format!("failed to write parquet rows to {}", path.display()))?;
    writer
        .close()
        .with_context(|| format!("failed to finalize {}", partial.display()))?;

    commit_partial(&partial, path)
}

fn read_csv<R: Record>(path: &Path) -> Result<Vec<R>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("failed to open {}", path.display()))?;

    let mut rows = Vec::new();
    for (index, record) in reader.deserialize::<R>().enumerate() {
        let row = record.with_context(|| {
            format!("failed to parse line {} of {}", index + 2, path.display())
        })?;
        rows.push(row);
    }
    Ok(rows)
}

fn write_csv<R: Record>(path: &Path, rows: &[R]) -> Result<()> {
    let partial = partial_path(path);
    let mut writer = csv::Writer::from_path(&partial)
        .with_context(|| format!("failed to create {}", partial.display()))?;
    write_records(&mut writer, rows, &partial)?;
    drop(writer);

    commit_partial(&partial, path)
}

fn write_records<R: Record>(writer: &mut csv::Writer<File>, rows: &[R], path: &Path) -> Result<()> {
    if rows.is_empty() {
        let schema = R::schema();
        writer
            .write_record(schema.fields().iter().map(|field| field.name().as_str()))
            .with_context(|| format!("failed to write header to {}", path.display()))?;
    }
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("failed to write row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))
}

pub fn export_csv<R: Record>(path: &Path, rows: &[R]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_directory(parent)?;
        }
    }

    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_records(&mut writer, rows, path)
}
