use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, Date32Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Date32Type, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;

use super::Record;
use crate::cli::DatasetKind;
use crate::model::{DailyLandingRow, FacilityType, NationalityRow, ReceptionRow};

impl Record for NationalityRow {
    type Key = (NaiveDate, String);

    const KIND: DatasetKind = DatasetKind::Nationality;

    fn key(&self) -> Self::Key {
        (self.reference_date, self.nationality.clone())
    }

    fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("reference_date", DataType::Date32, false),
            Field::new("nationality", DataType::Utf8, false),
            Field::new("landed", DataType::UInt64, false),
            Field::new("source_file", DataType::Utf8, false),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let columns = vec![
            dates(rows.iter().map(|row| row.reference_date)),
            strings(rows.iter().map(|row| row.nationality.as_str())),
            counts(rows.iter().map(|row| row.landed)),
            strings(rows.iter().map(|row| row.source_file.as_str())),
        ];
        RecordBatch::try_new(Self::schema(), columns)
            .context("failed to assemble nationality record batch")
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let reference_date = column::<Date32Array>(batch, "reference_date")?;
        let nationality = column::<StringArray>(batch, "nationality")?;
        let landed = column::<UInt64Array>(batch, "landed")?;
        let source_file = column::<StringArray>(batch, "source_file")?;

        (0..batch.num_rows())
            .map(|index| {
                Ok(Self {
                    reference_date: date_at(reference_date, index)?,
                    nationality: string_at(nationality, index)?,
                    landed: count_at(landed, index)?,
                    source_file: string_at(source_file, index)?,
                })
            })
            .collect()
    }
}

impl Record for ReceptionRow {
    type Key = (NaiveDate, String, FacilityType);

    const KIND: DatasetKind = DatasetKind::Reception;

    fn key(&self) -> Self::Key {
        (self.reference_date, self.region.clone(), self.facility_type)
    }

    fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("reference_date", DataType::Date32, false),
            Field::new("region", DataType::Utf8, false),
            Field::new("facility_type", DataType::Utf8, false),
            Field::new("present", DataType::UInt64, false),
            Field::new("layout", DataType::Utf8, false),
            Field::new("source_file", DataType::Utf8, false),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let columns = vec![
            dates(rows.iter().map(|row| row.reference_date)),
            strings(rows.iter().map(|row| row.region.as_str())),
            strings(rows.iter().map(|row| row.facility_type.as_str())),
            counts(rows.iter().map(|row| row.present)),
            strings(rows.iter().map(|row| row.layout.as_str())),
            strings(rows.iter().map(|row| row.source_file.as_str())),
        ];
        RecordBatch::try_new(Self::schema(), columns)
            .context("failed to assemble reception record batch")
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let reference_date = column::<Date32Array>(batch, "reference_date")?;
        let region = column::<StringArray>(batch, "region")?;
        let facility_type = column::<StringArray>(batch, "facility_type")?;
        let present = column::<UInt64Array>(batch, "present")?;
        let layout = column::<StringArray>(batch, "layout")?;
        let source_file = column::<StringArray>(batch, "source_file")?;

        (0..batch.num_rows())
            .map(|index| {
                let facility = string_at(facility_type, index)?;
                Ok(Self {
                    reference_date: date_at(reference_date, index)?,
                    region: string_at(region, index)?,
                    facility_type: FacilityType::parse(&facility)
                        .with_context(|| format!("unknown facility type '{facility}'"))?,
                    present: count_at(present, index)?,
                    layout: string_at(layout, index)?,
                    source_file: string_at(source_file, index)?,
                })
            })
            .collect()
    }
}

impl Record for DailyLandingRow {
    type Key = NaiveDate;

    const KIND: DatasetKind = DatasetKind::DailyLandings;

    fn key(&self) -> Self::Key {
        self.date
    }

    fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("date", DataType::Date32, false),
            Field::new("landed", DataType::UInt64, false),
            Field::new("reference_date", DataType::Date32, false),
            Field::new("source_file", DataType::Utf8, false),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let columns = vec![
            dates(rows.iter().map(|row| row.date)),
            counts(rows.iter().map(|row| row.landed)),
            dates(rows.iter().map(|row| row.reference_date)),
            strings(rows.iter().map(|row| row.source_file.as_str())),
        ];
        RecordBatch::try_new(Self::schema(), columns)
            .context("failed to assemble daily landings record batch")
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let date = column::<Date32Array>(batch, "date")?;
        let landed = column::<UInt64Array>(batch, "landed")?;
        let reference_date = column::<Date32Array>(batch, "reference_date")?;
        let source_file = column::<StringArray>(batch, "source_file")?;

        (0..batch.num_rows())
            .map(|index| {
                Ok(Self {
                    date: date_at(date, index)?,
                    landed: count_at(landed, index)?,
                    reference_date: date_at(reference_date, index)?,
                    source_file: string_at(source_file, index)?,
                })
            })
            .collect()
    }
}

fn dates(values: impl Iterator<Item = NaiveDate>) -> ArrayRef {
    Arc::new(Date32Array::from_iter_values(
        values.map(Date32Type::from_naive_date),
    ))
}

fn strings<'a>(values: impl Iterator<Item = &'a str>) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(values))
}

fn counts(values: impl Iterator<Item = u64>) -> ArrayRef {
    Arc::new(UInt64Array::from_iter_values(values))
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .with_context(|| format!("missing column '{name}'"))?
        .as_any()
        .downcast_ref::<T>()
        .with_context(|| format!("column '{name}' has an unexpected type"))
}

fn date_at(array: &Date32Array, index: usize) -> Result<NaiveDate> {
    if array.is_null(index) {
        bail!("null date at row {index}");
    }
    Ok(Date32Type::to_naive_date(array.value(index)))
}

fn string_at(array: &StringArray, index: usize) -> Result<String> {
    if array.is_null(index) {
        bail!("null string at row {index}");
    }
    Ok(array.value(index).to_string())
}

fn count_at(array: &UInt64Array, index: usize) -> Result<u64> {
    if array.is_null(index) {
        bail!("null count at row {index}");
    }
    Ok(array.value(index))
}
