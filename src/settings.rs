use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDate;

use crate::cli::{CommonArgs, DatasetKind, NetworkArgs};
use crate::util::ensure_directory;

const FILES_PREFIX: &str = "/sites/default/files";

#[derive(Debug, Clone)]
pub struct Settings {
    pub data_root: PathBuf,
    pub pdf_dir: PathBuf,
    pub output_dir: PathBuf,
    pub manifest_dir: PathBuf,
}

impl Settings {
    pub fn new(data_root: &Path) -> Self {
        Self {
            data_root: data_root.to_path_buf(),
            pdf_dir: data_root.join("pdf"),
            output_dir: data_root.join("output"),
            manifest_dir: data_root.join("manifests"),
        }
    }

    pub fn from_common(args: &CommonArgs) -> Self {
        Self::new(&args.data_root)
    }

    pub fn prepare(&self) -> Result<()> {
        ensure_directory(&self.pdf_dir)?;
        ensure_directory(&self.output_dir)?;
        ensure_directory(&self.manifest_dir)
    }

    pub fn inventory_manifest_path(&self) -> PathBuf {
        self.manifest_dir.join("pdf_inventory.json")
    }

    pub fn parquet_path(&self, kind: DatasetKind) -> PathBuf {
        self.output_dir.join(format!("{}.parquet", kind.file_stem()))
    }

    pub fn csv_path(&self, kind: DatasetKind) -> PathBuf {
        self.output_dir.join(format!("{}.csv", kind.file_stem()))
    }
}

#[derive(Debug, Clone)]
pub struct NetworkSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_pause: Duration,
}

impl NetworkSettings {
    pub fn from_args(args: &NetworkArgs) -> Self {
        Self {
            base_url: args.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(args.timeout_secs),
            max_retries: args.max_retries.max(1),
            retry_pause: Duration::from_secs(1),
        }
    }

    pub fn files_url(&self) -> String {
        format!("{}{}", self.base_url, FILES_PREFIX)
    }
}

pub fn dataset_floor(kind: DatasetKind) -> Option<NaiveDate> {
    match kind {
        DatasetKind::Nationality | DatasetKind::Reception => NaiveDate::from_ymd_opt(2017, 1, 1),
        DatasetKind::DailyLandings => NaiveDate::from_ymd_opt(2019, 9, 1),
    }
}
