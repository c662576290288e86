use std::io;
use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::cli::{DashboardArgs, DatasetKind};
use crate::model::{DailyLandingRow, FacilityType, NationalityRow, ReceptionRow};
use crate::settings::Settings;
use crate::store;

mod aggregate;
mod filter;
mod render;

use aggregate::{CategoryTotal, DayTotal, Metrics, Observation, SeriesPoint};
use filter::Filters;

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FilteredRows {
    Nationality(Vec<NationalityRow>),
    Reception(Vec<ReceptionRow>),
    DailyLandings(Vec<DailyLandingRow>),
}

impl FilteredRows {
    pub fn len(&self) -> usize {
        match self {
            Self::Nationality(rows) => rows.len(),
            Self::Reception(rows) => rows.len(),
            Self::DailyLandings(rows) => rows.len(),
        }
    }

    pub fn export_csv(&self, path: &Path) -> Result<()> {
        match self {
            Self::Nationality(rows) => store::export_csv(path, rows),
            Self::Reception(rows) => store::export_csv(path, rows),
            Self::DailyLandings(rows) => store::export_csv(path, rows),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub dataset: String,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub regions: Vec<String>,
    pub nationalities: Vec<String>,
    pub facility_type: Option<FacilityType>,
    pub row_count: usize,
    pub metrics: Metrics,
    pub series: Vec<SeriesPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_label: Option<&'static str>,
    pub top: Vec<CategoryTotal>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub facility_breakdown: Vec<CategoryTotal>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub day_of_month: Vec<DayTotal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<FilteredRows>,
}

impl DashboardReport {
    fn new(kind: DatasetKind, filters: &Filters, observations: &[Observation], top: usize) -> Self {
        Self {
            dataset: kind.file_stem().to_string(),
            from: filters.from,
            to: filters.to,
            regions: filters.regions.clone(),
            nationalities: Vec::new(),
            facility_type: None,
            row_count: observations.len(),
            metrics: aggregate::metrics(observations),
            series: aggregate::time_series(observations),
            top_label: None,
            top: aggregate::top_categories(observations, top),
            facility_breakdown: Vec::new(),
            day_of_month: Vec::new(),
            rows: None,
        }
    }
}

pub fn run(args: DashboardArgs) -> Result<()> {
    let settings = Settings::from_common(&args.common);
    let filters = Filters::from_args(&args);

    let (mut report, rows) = build_report(&settings, args.dataset, &filters, args.top)?;

    if let Some(path) = &args.export_csv {
        rows.export_csv(path)?;
        info!(path = %path.display(), rows = rows.len(), "exported filtered rows");
    }
    if args.rows {
        report.rows = Some(rows);
    }

    if args.json {
        render::write_json(&report)
    } else {
        let mut output = io::BufWriter::new(io::stdout().lock());
        render::write_text(&mut output, &report)
    }
}

pub fn build_report(
    settings: &Settings,
    kind: DatasetKind,
    filters: &Filters,
    top: usize,
) -> Result<(DashboardReport, FilteredRows)> {
    match kind {
        DatasetKind::Nationality => {
            let (rows, selected) = filters.nationality_rows(store::load(settings)?);
            let observations = rows
                .iter()
                .map(|row| Observation {
                    date: row.reference_date,
                    category: Some(row.nationality.clone()),
                    value: row.landed,
                })
                .collect::<Vec<_>>();

            let mut report = DashboardReport::new(kind, filters, &observations, top);
            report.nationalities = selected;
            report.top_label = Some("nationalities");
            Ok((report, FilteredRows::Nationality(rows)))
        }
        DatasetKind::Reception => {
            let rows = filters.reception_rows(store::load(settings)?);
            let facility_breakdown = aggregate::facility_breakdown(&rows);
            let headline = filters.headline_facility();
            let rows = rows
                .into_iter()
                .filter(|row| row.facility_type == headline)
                .collect::<Vec<_>>();
            let observations = rows
                .iter()
                .map(|row| Observation {
                    date: row.reference_date,
                    category: Some(row.region.clone()),
                    value: row.present,
                })
                .collect::<Vec<_>>();

            let mut report = DashboardReport::new(kind, filters, &observations, top);
            report.facility_type = Some(headline);
            report.top_label = Some("regions");
            report.facility_breakdown = facility_breakdown;
            Ok((report, FilteredRows::Reception(rows)))
        }
        DatasetKind::DailyLandings => {
            let rows = filters.daily_rows(store::load(settings)?);
            let observations = rows
                .iter()
                .map(|row| Observation {
                    date: row.date,
                    category: None,
                    value: row.landed,
                })
                .collect::<Vec<_>>();

            let mut report = DashboardReport::new(kind, filters, &observations, top);
            report.day_of_month = aggregate::day_of_month(&rows);
            Ok((report, FilteredRows::DailyLandings(rows)))
        }
    }
}
