use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use tracing::warn;

use crate::cli::DashboardArgs;
use crate::commands::ingest::normalize_region;
use crate::model::{DailyLandingRow, FacilityType, NationalityRow, ReceptionRow};

#[derive(Debug, Clone, Default)]
pub struct Filters {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub regions: Vec<String>,
    pub nationalities: Vec<String>,
    pub facility_type: Option<FacilityType>,
    pub default_top: usize,
}

impl Filters {
    pub fn from_args(args: &DashboardArgs) -> Self {
        let regions = args
            .regions
            .iter()
            .map(|label| match normalize_region(label) {
                Some(region) => region.to_string(),
                None => {
                    warn!(region = %label, "unknown region");
                    label.trim().to_string()
                }
            })
            .collect();

        Self {
            from: args.from,
            to: args.to,
            regions,
            nationalities: args
                .nationalities
                .iter()
                .map(|name| name.trim().to_string())
                .collect(),
            facility_type: args.facility_type,
            default_top: args.default_top,
        }
    }

    pub fn includes(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }

    pub fn headline_facility(&self) -> FacilityType {
        self.facility_type.unwrap_or(FacilityType::Total)
    }

    pub fn nationality_rows(&self, rows: Vec<NationalityRow>) -> (Vec<NationalityRow>, Vec<String>) {
        let in_range = rows
            .into_iter()
            .filter(|row| self.includes(row.reference_date))
            .collect::<Vec<_>>();

        let selected = if self.nationalities.is_empty() {
            top_nationalities(&in_range, self.default_top)
        } else {
            resolve_names(&in_range, &self.nationalities)
        };

        let wanted = selected
            .iter()
            .map(|name| name.to_lowercase())
            .collect::<HashSet<_>>();
        let rows = in_range
            .into_iter()
            .filter(|row| wanted.contains(&row.nationality.to_lowercase()))
            .collect();
        (rows, selected)
    }

    pub fn reception_rows(&self, rows: Vec<ReceptionRow>) -> Vec<ReceptionRow> {
        rows.into_iter()
            .filter(|row| self.includes(row.reference_date))
            .filter(|row| self.regions.is_empty() || self.regions.contains(&row.region))
            .collect()
    }

    pub fn daily_rows(&self, rows: Vec<DailyLandingRow>) -> Vec<DailyLandingRow> {
        rows.into_iter()
            .filter(|row| self.includes(row.date))
            .collect()
    }
}

pub fn top_nationalities(rows: &[NationalityRow], count: usize) -> Vec<String> {
    let mut totals = BTreeMap::<&str, u64>::new();
    for row in rows {
        *totals.entry(row.nationality.as_str()).or_insert(0) += row.landed;
    }

    let mut ranked = totals.into_iter().collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(count)
        .map(|(name, _)| name.to_string())
        .collect()
}

fn resolve_names(rows: &[NationalityRow], requested: &[String]) -> Vec<String> {
    let mut resolved = Vec::with_capacity(requested.len());
    for name in requested {
        let lower = name.to_lowercase();
        let stored = rows
            .iter()
            .find(|row| row.nationality.to_lowercase() == lower)
            .map(|row| row.nationality.clone())
            .unwrap_or_else(|| name.clone());
        if !resolved.contains(&stored) {
            resolved.push(stored);
        }
    }
    resolved
}
