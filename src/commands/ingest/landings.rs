use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use tracing::debug;

use crate::dates::{YearMonth, italian_month_abbr};
use crate::model::DailyLandingRow;

use super::pages::ReportText;
use super::{ExtractedRows, ReportExtractor};

const TITLE_PATTERN: &str = r"Migranti sbarcati per giorno al \d{1,2} \w+ \d{4}\* - mese di \w+";
const FOOTNOTE: &str = "*I dati si riferiscono agli eventi di sbarco rilevati entro le ore 8:00 del giorno di riferimento";
const SOURCE_NOTE: &str = "Fonte: Dipartimento della Pubblica sicurezza. I dati sono suscettibili di successivo consolidamento.";
const NOISE_MARKERS: &[&str] = &[
    "note:",
    "tabella",
    "presenze",
    "nazionalità",
    "nazionalita",
    "totale",
];
const MAX_DAILY_VALUE: u64 = 10_000;
const CHART_VALUE: &str = r"(\d{1,3}(?:\.\d{3})+|\d{1,6})";

pub struct DailyLandingsExtractor {
    title: Regex,
}

impl DailyLandingsExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            title: Regex::new(TITLE_PATTERN).context("failed to compile chart title regex")?,
        })
    }

    fn is_chart_page(&self, page: &str) -> bool {
        self.title.is_match(page) && page.contains(FOOTNOTE) && page.contains(SOURCE_NOTE)
    }

    pub fn chart_area(&self, page: &str) -> Option<String> {
        let title = self.title.find(page)?;
        let rest = &page[title.end()..];
        let end = rest.find(FOOTNOTE)?;

        let lines = rest[..end]
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter(|line| {
                let lower = line.to_lowercase();
                !NOISE_MARKERS.iter().any(|noise| lower.contains(noise))
            })
            .collect::<Vec<_>>();
        Some(lines.join("\n"))
    }
}

pub fn read_chart_labels(area: &str, month: YearMonth) -> Result<BTreeMap<u32, u64>> {
    let days = month.days_in_month();
    let abbr = italian_month_abbr(month.month).context("month without abbreviation")?;

    let primary = Regex::new(&format!(r"(?i)(\d{{1,2}})-{abbr}\s+{CHART_VALUE}"))
        .context("failed to compile chart label regex")?;
    let mut values = BTreeMap::new();
    collect_labels(&primary, area, days, true, &mut values);

    if (values.len() as f64) < f64::from(days) * 0.3 {
        let fallbacks = [
            format!(r"(?i)(\d{{1,2}})\s+{abbr}\s+{CHART_VALUE}"),
            format!(r"(?i)(\d{{1,2}}){abbr}\s*{CHART_VALUE}"),
            format!(r"(\d{{1,2}})\s+{CHART_VALUE}"),
        ];
        for pattern in fallbacks {
            let regex =
                Regex::new(&pattern).context("failed to compile fallback chart label regex")?;
            collect_labels(&regex, area, days, false, &mut values);
        }
    }

    Ok(values)
}

fn collect_labels(
    pattern: &Regex,
    area: &str,
    days: u32,
    overwrite: bool,
    values: &mut BTreeMap<u32, u64>,
) {
    for captures in pattern.captures_iter(area) {
        let (Some(day), Some(value)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        let value = value.as_str().replace('.', "");
        let (Ok(day), Ok(value)) = (day.as_str().parse::<u32>(), value.parse::<u64>()) else {
            continue;
        };
        if !(1..=days).contains(&day) || value > MAX_DAILY_VALUE {
            continue;
        }
        if overwrite {
            values.insert(day, value);
        } else {
            values.entry(day).or_insert(value);
        }
    }
}

pub fn plausible(values: &BTreeMap<u32, u64>, days: u32) -> bool {
    let count = values.len();
    if (count as f64) < f64::max(5.0, f64::from(days) * 0.25) {
        return false;
    }
    let (Some(first), Some(last)) = (values.keys().next(), values.keys().next_back()) else {
        return false;
    };
    let span = last - first + 1;
    f64::from(span) >= count as f64 * 0.8
}

impl ReportExtractor for DailyLandingsExtractor {
    type Row = DailyLandingRow;

    fn extract(&self, report: &ReportText) -> ExtractedRows<DailyLandingRow> {
        let mut extracted = ExtractedRows::default();
        let reference_date = report.reference_date;
        let month = YearMonth::of(reference_date);

        for (page_index, page) in report.raw_pages.iter().enumerate() {
            if !self.is_chart_page(page) {
                continue;
            }
            let Some(area) = self.chart_area(page) else {
                continue;
            };

            let values = match read_chart_labels(&area, month) {
                Ok(values) => values,
                Err(err) => {
                    extracted
                        .warnings
                        .push(format!("{}: {err:#}", report.filename));
                    return extracted;
                }
            };
            if !plausible(&values, month.days_in_month()) {
                debug!(
                    file = %report.filename,
                    page = page_index + 1,
                    days = values.len(),
                    "chart labels rejected"
                );
                continue;
            }

            extracted.rows = fill_days(&values, reference_date, &report.filename);
            debug!(
                file = %report.filename,
                page = page_index + 1,
                labelled = values.len(),
                rows = extracted.rows.len(),
                "daily landings extracted"
            );
            return extracted;
        }

        debug!(file = %report.filename, "daily landings chart not found");
        extracted
    }
}

fn fill_days(
    values: &BTreeMap<u32, u64>,
    reference_date: NaiveDate,
    source_file: &str,
) -> Vec<DailyLandingRow> {
    let month = YearMonth::of(reference_date);
    let last_labelled = values.keys().next_back().copied().unwrap_or(0);
    let last_day = reference_date.day().max(last_labelled);

    (1..=last_day)
        .filter_map(|day| {
            let date = NaiveDate::from_ymd_opt(month.year, month.month, day)?;
            Some(DailyLandingRow {
                date,
                landed: values.get(&day).copied().unwrap_or(0),
                reference_date,
                source_file: source_file.to_string(),
            })
        })
        .collect()
}
