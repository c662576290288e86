use anyhow::{Result, bail};
use chrono::{Local, NaiveDate, Utc};
use tracing::{info, warn};

use crate::cli::{DatasetKind, IngestArgs};
use crate::commands::inventory;
use crate::dates::months_before;
use crate::model::{
    DailyLandingRow, DatasetCounts, IngestPaths, IngestRunManifest, NationalityRow,
    PdfInventoryManifest, ReceptionRow, ToolVersions,
};
use crate::settings::{Settings, dataset_floor};
use crate::store::{self, Record, merge_rows};
use crate::util::{now_utc_string, utc_compact_string, write_json_pretty};

use super::pages::{ReportText, command_available, command_version};
use super::{ExtractedRows, Extractors, ReportExtractor};

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub datasets: Vec<DatasetKind>,
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
    pub rebuild: bool,
    pub max_files: Option<usize>,
    pub command: String,
}

impl IngestOptions {
    pub fn from_args(args: &IngestArgs, today: NaiveDate) -> Self {
        let recent = args.recent_months.map(|months| months_before(today, months));
        let since = match (args.since, recent) {
            (Some(since), Some(recent)) => Some(since.max(recent)),
            (since, recent) => since.or(recent),
        };

        Self {
            datasets: selected_datasets(&args.datasets),
            since,
            until: args.until,
            rebuild: args.rebuild,
            max_files: args.max_files,
            command: render_ingest_command(args),
        }
    }

    pub fn selects(&self, kind: DatasetKind) -> bool {
        self.datasets.contains(&kind)
    }

    fn includes(&self, date: NaiveDate) -> bool {
        self.since.is_none_or(|since| date >= since) && self.until.is_none_or(|until| date <= until)
    }
}

fn selected_datasets(requested: &[DatasetKind]) -> Vec<DatasetKind> {
    if requested.is_empty() {
        return DatasetKind::ALL.to_vec();
    }
    DatasetKind::ALL
        .into_iter()
        .filter(|kind| requested.contains(kind))
        .collect()
}

pub fn run(args: IngestArgs) -> Result<()> {
    let settings = Settings::from_common(&args.common);
    let options = IngestOptions::from_args(&args, Local::now().date_naive());

    let manifest = ingest(&settings, &options)?;
    if !manifest.failed_files.is_empty() {
        warn!(
            failed = manifest.failed_files.len(),
            "some reports could not be read; they will be retried on the next run"
        );
    }
    Ok(())
}

struct Batch<R> {
    rows: Vec<R>,
    files_with_rows: usize,
}

impl<R> Default for Batch<R> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            files_with_rows: 0,
        }
    }
}

impl<R> Batch<R> {
    fn absorb(&mut self, extracted: ExtractedRows<R>, warnings: &mut Vec<String>) {
        if !extracted.rows.is_empty() {
            self.files_with_rows += 1;
        }
        self.rows.extend(extracted.rows);
        warnings.extend(extracted.warnings);
    }
}

#[derive(Default)]
struct Batches {
    nationality: Batch<NationalityRow>,
    reception: Batch<ReceptionRow>,
    daily_landings: Batch<DailyLandingRow>,
}

impl Batches {
    fn extract(
        &mut self,
        extractors: &Extractors,
        report: &ReportText,
        options: &IngestOptions,
        warnings: &mut Vec<String>,
    ) {
        if options.selects(DatasetKind::Nationality) {
            self.nationality
                .absorb(extractors.nationality.extract(report), warnings);
        }
        if options.selects(DatasetKind::Reception) {
            self.reception
                .absorb(extractors.reception.extract(report), warnings);
        }
        if options.selects(DatasetKind::DailyLandings) {
            self.daily_landings
                .absorb(extractors.daily_landings.extract(report), warnings);
        }
    }
}

pub fn ingest(settings: &Settings, options: &IngestOptions) -> Result<IngestRunManifest> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    settings.prepare()?;
    if !command_available("pdftotext") {
        bail!("pdftotext not found on PATH; install poppler-utils");
    }
    let tool_versions = ToolVersions {
        pdftotext: command_version("pdftotext", &["-v"])?,
    };

    info!(
        data_root = %settings.data_root.display(),
        run_id = %run_id,
        datasets = ?options.datasets,
        "starting ingest"
    );

    let inventory = refresh_inventory(settings)?;
    let (selected, mut warnings) = select_reports(&inventory, options);

    let extractors = Extractors::new()?;
    let need_layout =
        options.selects(DatasetKind::Nationality) || options.selects(DatasetKind::Reception);
    let need_raw = options.selects(DatasetKind::DailyLandings);

    let mut batches = Batches::default();
    let mut processed_files = Vec::new();
    let mut failed_files = Vec::new();

    for (index, (filename, reference_date)) in selected.iter().enumerate() {
        info!(
            file = %filename,
            index = index + 1,
            total = selected.len(),
            "extracting report"
        );

        let path = settings.pdf_dir.join(filename);
        let report = match ReportText::load(&path, *reference_date, need_layout, need_raw) {
            Ok(report) => report,
            Err(err) => {
                warn!(file = %filename, error = %format!("{err:#}"), "failed to read report");
                warnings.push(format!("{filename}: {err:#}"));
                failed_files.push(filename.clone());
                continue;
            }
        };

        batches.extract(&extractors, &report, options, &mut warnings);
        processed_files.push(filename.clone());
    }

    let mut datasets = Vec::new();
    if selected.is_empty() {
        warn!("no reports selected; datasets left untouched");
    } else {
        for kind in &options.datasets {
            let counts = match kind {
                DatasetKind::Nationality => {
                    let batch = std::mem::take(&mut batches.nationality);
                    persist(settings, batch.rows, batch.files_with_rows, options.rebuild)?
                }
                DatasetKind::Reception => {
                    let batch = std::mem::take(&mut batches.reception);
                    persist(settings, batch.rows, batch.files_with_rows, options.rebuild)?
                }
                DatasetKind::DailyLandings => {
                    let batch = std::mem::take(&mut batches.daily_landings);
                    persist(settings, batch.rows, batch.files_with_rows, options.rebuild)?
                }
            };
            datasets.push(counts);
        }
    }

    let status = if failed_files.is_empty() {
        "completed"
    } else {
        "completed_with_failures"
    };

    let manifest = IngestRunManifest {
        manifest_version: 1,
        run_id,
        status: status.to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: options.command.clone(),
        tool_versions,
        paths: IngestPaths {
            data_root: settings.data_root.display().to_string(),
            pdf_dir: settings.pdf_dir.display().to_string(),
            output_dir: settings.output_dir.display().to_string(),
            manifest_dir: settings.manifest_dir.display().to_string(),
        },
        pdf_count: inventory.pdf_count,
        processed_files,
        failed_files,
        datasets,
        warnings,
    };

    let manifest_path = settings.manifest_dir.join(format!(
        "ingest_run_{}.json",
        utc_compact_string(started_ts)
    ));
    write_json_pretty(&manifest_path, &manifest)?;

    info!(path = %manifest_path.display(), "wrote ingest run manifest");
    info!(
        processed = manifest.processed_files.len(),
        failed = manifest.failed_files.len(),
        "ingest completed"
    );

    Ok(manifest)
}

fn refresh_inventory(settings: &Settings) -> Result<PdfInventoryManifest> {
    let manifest = inventory::build_manifest(&settings.pdf_dir)?;
    let path = settings.inventory_manifest_path();
    write_json_pretty(&path, &manifest)?;
    info!(
        path = %path.display(),
        pdf_count = manifest.pdf_count,
        "refreshed inventory manifest"
    );
    Ok(manifest)
}

pub(super) fn select_reports(
    inventory: &PdfInventoryManifest,
    options: &IngestOptions,
) -> (Vec<(String, NaiveDate)>, Vec<String>) {
    let mut warnings = Vec::new();
    let mut selected = Vec::new();

    for pdf in &inventory.pdfs {
        let Some(reference_date) = pdf.reference_date else {
            warn!(file = %pdf.filename, "skipping report without a reference date");
            warnings.push(format!("{}: no reference date in filename", pdf.filename));
            continue;
        };
        if options.includes(reference_date) {
            selected.push((pdf.filename.clone(), reference_date));
        }
    }

    selected.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
    if let Some(max_files) = options.max_files {
        selected.truncate(max_files);
    }

    (selected, warnings)
}

pub(super) fn persist<R: Record>(
    settings: &Settings,
    rows: Vec<R>,
    files_with_rows: usize,
    rebuild: bool,
) -> Result<DatasetCounts> {
    let extracted_rows = rows.len();
    let floor = dataset_floor(R::KIND);
    let (incoming, below): (Vec<R>, Vec<R>) = rows
        .into_iter()
        .partition(|row| floor.is_none_or(|floor| row.reference_date() >= floor));

    let existing = if rebuild {
        Vec::new()
    } else {
        store::load::<R>(settings)?
    };
    let (merged, stats) = merge_rows(existing, incoming);
    store::save(settings, &merged)?;

    info!(
        dataset = R::KIND.as_str(),
        extracted = extracted_rows,
        below_floor = below.len(),
        kept = stats.kept,
        replaced = stats.replaced,
        total = stats.total,
        "dataset merged"
    );

    Ok(DatasetCounts {
        dataset: R::KIND.file_stem().to_string(),
        extracted_rows,
        below_date_floor: below.len(),
        existing_rows: stats.existing,
        kept_rows: stats.kept,
        replaced_rows: stats.replaced,
        total_rows: stats.total,
        files_with_rows,
    })
}

fn render_ingest_command(args: &IngestArgs) -> String {
    let mut command = vec![
        "cruscotto".to_string(),
        "ingest".to_string(),
        "--data-root".to_string(),
        args.common.data_root.display().to_string(),
    ];

    for dataset in &args.datasets {
        command.push("--dataset".to_string());
        command.push(dataset.as_str().to_string());
    }
    if let Some(months) = args.recent_months {
        command.push("--recent-months".to_string());
        command.push(months.to_string());
    }
    if let Some(since) = args.since {
        command.push("--since".to_string());
        command.push(since.to_string());
    }
    if let Some(until) = args.until {
        command.push("--until".to_string());
        command.push(until.to_string());
    }
    if args.rebuild {
        command.push("--rebuild".to_string());
    }
    if let Some(max_files) = args.max_files {
        command.push("--max-files".to_string());
        command.push(max_files.to_string());
    }

    command.join(" ")
}
