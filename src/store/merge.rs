use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;

use super::Record;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub existing: usize,
    pub incoming: usize,
    pub kept: usize,
    pub replaced: usize,
    pub total: usize,
}

pub fn merge_rows<R: Record>(existing: Vec<R>, incoming: Vec<R>) -> (Vec<R>, MergeStats) {
    let refreshed = incoming
        .iter()
        .map(Record::reference_date)
        .collect::<HashSet<NaiveDate>>();

    let mut stats = MergeStats {
        existing: existing.len(),
        incoming: incoming.len(),
        ..MergeStats::default()
    };

    let mut by_key = BTreeMap::<R::Key, R>::new();
    for row in existing {
        if refreshed.contains(&row.reference_date()) {
            stats.replaced += 1;
            continue;
        }
        stats.kept += 1;
        by_key.insert(row.key(), row);
    }

    for row in incoming {
        if let Some(previous) = by_key.insert(row.key(), row) {
            if !refreshed.contains(&previous.reference_date()) {
                stats.kept -= 1;
                stats.replaced += 1;
            }
        }
    }

    let merged = by_key.into_values().collect::<Vec<R>>();
    stats.total = merged.len();
    (merged, stats)
}
