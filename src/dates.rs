use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::{Datelike, Months, NaiveDate};
use regex::Regex;

const ITALIAN_MONTHS: [&str; 12] = [
    "gennaio",
    "febbraio",
    "marzo",
    "aprile",
    "maggio",
    "giugno",
    "luglio",
    "agosto",
    "settembre",
    "ottobre",
    "novembre",
    "dicembre",
];

pub fn italian_month_number(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    ITALIAN_MONTHS
        .iter()
        .position(|month| *month == lower)
        .map(|index| index as u32 + 1)
}

pub fn italian_month_name(month: u32) -> Option<&'static str> {
    ITALIAN_MONTHS.get(month.checked_sub(1)? as usize).copied()
}

pub fn italian_month_abbr(month: u32) -> Option<&'static str> {
    italian_month_name(month).map(|name| &name[..3])
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            bail!("month out of range: {month}");
        }
        Ok(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn last_day(self) -> Option<NaiveDate> {
        self.next().first_day()?.pred_opt()
    }

    pub fn days_in_month(self) -> u32 {
        self.last_day().map(|day| day.day()).unwrap_or(31)
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn through(self, end: YearMonth) -> Vec<YearMonth> {
        let mut months = Vec::new();
        let mut current = self;
        while current <= end {
            months.push(current);
            current = current.next();
        }
        months
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let (year, month) = value
            .trim()
            .split_once('-')
            .with_context(|| format!("expected YYYY-MM, got '{value}'"))?;
        let year = year
            .parse::<i32>()
            .with_context(|| format!("invalid year in '{value}'"))?;
        let month = month
            .parse::<u32>()
            .with_context(|| format!("invalid month in '{value}'"))?;
        Self::new(year, month)
    }
}

pub fn last_published_month(today: NaiveDate) -> YearMonth {
    YearMonth::of(today).previous()
}

pub fn months_before(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months)).unwrap_or(date)
}

pub struct ReferenceDateParser {
    dashed: Regex,
    spaced_name: Regex,
    dotted: Regex,
    compact: Regex,
    underscored_name: Regex,
    underscored_number: Regex,
}

impl ReferenceDateParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dashed: Regex::new(r"(\d{2})-(\d{2})-(\d{4})")
                .context("failed to compile dashed date regex")?,
            spaced_name: Regex::new(r"(\d{1,2})\s+([A-Za-z]+)\s+(\d{4})")
                .context("failed to compile spaced month-name regex")?,
            dotted: Regex::new(r"(\d{2})\.(\d{2})\.(\d{4})")
                .context("failed to compile dotted date regex")?,
            compact: Regex::new(r"(\d{2})(\d{2})(\d{4})")
                .context("failed to compile compact date regex")?,
            underscored_name: Regex::new(r"(\d{1,2})_([A-Za-z]+)_(\d{4})")
                .context("failed to compile underscored month-name regex")?,
            underscored_number: Regex::new(r"(\d{1,2})_(\d{1,2})_(\d{4})")
                .context("failed to compile underscored numeric regex")?,
        })
    }

    pub fn parse(&self, filename: &str) -> Option<NaiveDate> {
        if let Some(date) = numeric_match(&self.dashed, filename) {
            return Some(date);
        }
        if let Some(date) = month_name_match(&self.spaced_name, filename) {
            return Some(date);
        }
        if let Some(date) = numeric_match(&self.dotted, filename) {
            return Some(date);
        }
        if let Some(date) = numeric_match(&self.compact, filename) {
            if matches!(date.year(), 2017 | 2018) {
                return Some(date);
            }
        }
        if let Some(date) = month_name_match(&self.underscored_name, filename) {
            return Some(date);
        }
        numeric_match(&self.underscored_number, filename)
    }
}

fn numeric_match(pattern: &Regex, text: &str) -> Option<NaiveDate> {
    pattern.captures_iter(text).find_map(|captures| {
        let day = captures.get(1)?.as_str().parse::<u32>().ok()?;
        let month = captures.get(2)?.as_str().parse::<u32>().ok()?;
        let year = captures.get(3)?.as_str().parse::<i32>().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    })
}

fn month_name_match(pattern: &Regex, text: &str) -> Option<NaiveDate> {
    pattern.captures_iter(text).find_map(|captures| {
        let day = captures.get(1)?.as_str().parse::<u32>().ok()?;
        let month = italian_month_number(captures.get(2)?.as_str())?;
        let year = captures.get(3)?.as_str().parse::<i32>().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    })
}
