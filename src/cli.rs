use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::dates::YearMonth;
use crate::model::FacilityType;

#[derive(Parser, Debug)]
#[command(
    name = "cruscotto",
    version,
    about = "Download, extract and explore the Italian daily migration statistics reports"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Inventory(InventoryArgs),
    Download(DownloadArgs),
    Ingest(IngestArgs),
    Update(UpdateArgs),
    Pipeline(PipelineArgs),
    Dashboard(DashboardArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    #[arg(long, default_value = "data")]
    pub data_root: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct NetworkArgs {
    #[arg(
        long,
        env = "CRUSCOTTO_BASE_URL",
        default_value = "https://libertaciviliimmigrazione.dlci.interno.gov.it"
    )]
    pub base_url: String,

    #[arg(long, env = "CRUSCOTTO_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    #[arg(long, env = "CRUSCOTTO_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub network: NetworkArgs,

    #[arg(long, default_value = "2017-01", help = "First month to fetch (YYYY-MM)")]
    pub from: YearMonth,

    #[arg(long, help = "Last month to fetch (YYYY-MM); defaults to the month before the current one")]
    pub to: Option<YearMonth>,
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[arg(long = "dataset", value_enum)]
    pub datasets: Vec<DatasetKind>,

    #[arg(long, help = "Only process reports whose reference date falls within the last N months")]
    pub recent_months: Option<u32>,

    #[arg(long)]
    pub since: Option<NaiveDate>,

    #[arg(long)]
    pub until: Option<NaiveDate>,

    #[arg(long, default_value_t = false, help = "Replace the stored datasets instead of merging into them")]
    pub rebuild: bool,

    #[arg(long)]
    pub max_files: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub network: NetworkArgs,

    #[arg(long, default_value_t = 3)]
    pub recent_months: u32,

    #[arg(long, default_value_t = false, help = "Re-extract even when the previous month's report is already present")]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub network: NetworkArgs,

    #[arg(long, default_value = "2017-01")]
    pub from: YearMonth,

    #[arg(long)]
    pub to: Option<YearMonth>,

    #[arg(long, default_value_t = false)]
    pub skip_download: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DashboardArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[arg(long, value_enum)]
    pub dataset: DatasetKind,

    #[arg(long)]
    pub from: Option<NaiveDate>,

    #[arg(long)]
    pub to: Option<NaiveDate>,

    #[arg(long = "region")]
    pub regions: Vec<String>,

    #[arg(long = "nationality")]
    pub nationalities: Vec<String>,

    #[arg(long, value_enum)]
    pub facility_type: Option<FacilityType>,

    #[arg(long, default_value_t = 5, help = "Number of nationalities preselected when no --nationality is given")]
    pub default_top: usize,

    #[arg(long, default_value_t = 10)]
    pub top: usize,

    #[arg(long, default_value_t = false)]
    pub rows: bool,

    #[arg(long)]
    pub export_csv: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[arg(long, default_value_t = false)]
    pub coverage: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, ValueEnum)]
pub enum DatasetKind {
    Nationality,
    Reception,
    DailyLandings,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 3] = [Self::Nationality, Self::Reception, Self::DailyLandings];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nationality => "nationality",
            Self::Reception => "reception",
            Self::DailyLandings => "daily-landings",
        }
    }

    pub fn file_stem(self) -> &'static str {
        match self {
            Self::Nationality => "landings_by_nationality",
            Self::Reception => "reception_presence",
            Self::DailyLandings => "daily_landings",
        }
    }
}
