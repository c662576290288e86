use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::model::{DailyLandingRow, FacilityType, ReceptionRow};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub date: NaiveDate,
    pub category: Option<String>,
    pub value: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub total: u64,
    pub mean: f64,
    pub max: u64,
    pub min: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: u64,
    pub running_total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub name: String,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayTotal {
    pub day: u32,
    pub total: u64,
}

pub fn metrics(observations: &[Observation]) -> Metrics {
    let Some(max) = observations.iter().map(|obs| obs.value).max() else {
        return Metrics::default();
    };
    let min = observations.iter().map(|obs| obs.value).min().unwrap_or(0);
    let total = observations.iter().map(|obs| obs.value).sum::<u64>();

    Metrics {
        total,
        mean: total as f64 / observations.len() as f64,
        max,
        min,
    }
}

pub fn time_series(observations: &[Observation]) -> Vec<SeriesPoint> {
    let mut by_date = BTreeMap::<NaiveDate, u64>::new();
    for obs in observations {
        *by_date.entry(obs.date).or_insert(0) += obs.value;
    }

    let mut running_total = 0;
    by_date
        .into_iter()
        .map(|(date, value)| {
            running_total += value;
            SeriesPoint {
                date,
                value,
                running_total,
            }
        })
        .collect()
}

pub fn top_categories(observations: &[Observation], limit: usize) -> Vec<CategoryTotal> {
    let mut totals = BTreeMap::<&str, u64>::new();
    for obs in observations {
        if let Some(category) = &obs.category {
            *totals.entry(category.as_str()).or_insert(0) += obs.value;
        }
    }

    let mut ranked = totals
        .into_iter()
        .map(|(name, total)| CategoryTotal {
            name: name.to_string(),
            total,
        })
        .collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(limit);
    ranked
}

pub fn facility_breakdown(rows: &[ReceptionRow]) -> Vec<CategoryTotal> {
    FacilityType::BREAKDOWN
        .into_iter()
        .map(|facility_type| CategoryTotal {
            name: facility_type.as_str().to_string(),
            total: rows
                .iter()
                .filter(|row| row.facility_type == facility_type)
                .map(|row| row.present)
                .sum(),
        })
        .filter(|entry| entry.total > 0)
        .collect()
}

pub fn day_of_month(rows: &[DailyLandingRow]) -> Vec<DayTotal> {
    let mut by_day = BTreeMap::<u32, u64>::new();
    for row in rows {
        *by_day.entry(row.date.day()).or_insert(0) += row.landed;
    }
    by_day
        .into_iter()
        .map(|(day, total)| DayTotal { day, total })
        .collect()
}
