use anyhow::Result;

mod cells;
mod landings;
mod nationality;
mod pages;
mod reception;
mod run;
mod schema;
#[cfg(test)]
mod tests;

pub use reception::normalize_region;
pub use run::{IngestOptions, ingest, run};

use landings::DailyLandingsExtractor;
use nationality::NationalityExtractor;
use pages::ReportText;
use reception::ReceptionExtractor;

#[derive(Debug)]
pub struct ExtractedRows<R> {
    pub rows: Vec<R>,
    pub warnings: Vec<String>,
}

impl<R> Default for ExtractedRows<R> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

pub trait ReportExtractor {
    type Row;

    fn extract(&self, report: &ReportText) -> ExtractedRows<Self::Row>;
}

pub struct Extractors {
    pub nationality: NationalityExtractor,
    pub reception: ReceptionExtractor,
    pub daily_landings: DailyLandingsExtractor,
}

impl Extractors {
    pub fn new() -> Result<Self> {
        Ok(Self {
            nationality: NationalityExtractor::new()?,
            reception: ReceptionExtractor::new()?,
            daily_landings: DailyLandingsExtractor::new()?,
        })
    }
}
