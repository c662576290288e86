use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfEntry {
    pub filename: String,
    pub reference_date: Option<NaiveDate>,
    pub size_bytes: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub pdf_count: usize,
    pub undated_count: usize,
    pub pdfs: Vec<PdfEntry>,
}

#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum FacilityType {
    HotSpot,
    ReceptionCentre,
    Sai,
    Total,
}

impl FacilityType {
    pub const BREAKDOWN: [FacilityType; 3] = [Self::HotSpot, Self::ReceptionCentre, Self::Sai];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::HotSpot => "hot_spot",
            Self::ReceptionCentre => "reception_centre",
            Self::Sai => "sai",
            Self::Total => "total",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "hot_spot" => Some(Self::HotSpot),
            "reception_centre" => Some(Self::ReceptionCentre),
            "sai" => Some(Self::Sai),
            "total" => Some(Self::Total),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NationalityRow {
    pub reference_date: NaiveDate,
    pub nationality: String,
    pub landed: u64,
    pub source_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceptionRow {
    pub reference_date: NaiveDate,
    pub region: String,
    pub facility_type: FacilityType,
    pub present: u64,
    pub layout: String,
    pub source_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyLandingRow {
    pub date: NaiveDate,
    pub landed: u64,
    pub reference_date: NaiveDate,
    pub source_file: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Downloaded,
    AlreadyPresent,
    NotFound,
    Failed,
}

impl DownloadStatus {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Downloaded | Self::AlreadyPresent)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthDownload {
    pub month: String,
    pub status: DownloadStatus,
    pub filename: Option<String>,
    pub url: Option<String>,
    pub bytes: Option<u64>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DownloadCounts {
    pub months_total: usize,
    pub downloaded: usize,
    pub already_present: usize,
    pub not_found: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub started_at: String,
    pub updated_at: String,
    pub base_url: String,
    pub first_month: String,
    pub last_month: String,
    pub counts: DownloadCounts,
    pub months: Vec<MonthDownload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolVersions {
    pub pdftotext: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestPaths {
    pub data_root: String,
    pub pdf_dir: String,
    pub output_dir: String,
    pub manifest_dir: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DatasetCounts {
    pub dataset: String,
    pub extracted_rows: usize,
    pub below_date_floor: usize,
    pub existing_rows: usize,
    pub kept_rows: usize,
    pub replaced_rows: usize,
    pub total_rows: usize,
    pub files_with_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub tool_versions: ToolVersions,
    pub paths: IngestPaths,
    pub pdf_count: usize,
    pub processed_files: Vec<String>,
    pub failed_files: Vec<String>,
    pub datasets: Vec<DatasetCounts>,
    pub warnings: Vec<String>,
}
