use anyhow::{Context, Result};

use crate::dates::YearMonth;

const SPECIAL_PATHS: &[((i32, u32), &str)] = &[
    ((2017, 1), "2025-05/cruscotto_statistico_giornaliero_31_gennaio_2017_3.pdf"),
    ((2017, 2), "2025-05/cruscotto_statistico_giornaliero_28_febbraio_2017_2.pdf"),
    ((2017, 3), "2025-05/cruscotto_statistico_giornaliero_31_marzo_2017_2.pdf"),
    ((2017, 4), "2025-05/cruscotto_statistico_giornaliero_30_aprile_2017_3.pdf"),
    ((2017, 5), "2025-05/cruscotto_statistico_giornaliero_del_31_maggio_2017_1.pdf"),
    ((2017, 6), "2025-05/cruscotto_statistico_giornaliero_del_30_giugno_2017_1.pdf"),
    ((2017, 7), "2025-05/cruscotto_statistico_giornaliero_del_31_luglio_2017_1.pdf"),
    ((2017, 8), "2025-05/cruscotto_statistico_giornaliero_31_agosto_2017_1.pdf"),
    ((2017, 9), "2025-05/cruscotto_statistico_giornaliero_30_settembre_1.pdf"),
    ((2017, 10), "2025-05/cruscotto_statistico_giornaliero_31_ottobre_2017_0.pdf"),
    ((2017, 11), "2025-05/cruscotto_statistico_giornaliero_30_novembre_2017_0.pdf"),
    ((2017, 12), "2025-05/cruscotto_statistico_giornaliero_31_dicembre_2017_0.pdf"),
    ((2018, 1), "2025-05/cruscotto_statistico_giornaliero_31_gennaio_2018.pdf"),
    ((2018, 2), "2025-05/cruscotto_statistico_giornaliero_28_febbraio_2018.pdf"),
    ((2018, 3), "2025-05/cruscotto_statistico_giornaliero_31_marzo_2018.pdf"),
    ((2018, 4), "2025-05/cruscotto_statistico_giornaliero_30_aprile_2018.pdf"),
    ((2018, 5), "2025-05/cruscotto_statistico_giornaliero_31_maggio_2018.pdf"),
    ((2018, 6), "2025-05/cruscotto_statistico_giornaliero_30_giugno_2018.pdf"),
    ((2018, 7), "2025-05/cruscotto_statistico_giornaliero_31_luglio_2018.pdf"),
    ((2018, 8), "2025-05/cruscotto_statistico_giornaliero_31_agosto_2018.pdf"),
    ((2018, 9), "2025-05/cruscotto_statistico_giornaliero_30_settembre_2018.pdf"),
    ((2018, 10), "2025-05/cruscotto_statistico_giornaliero_31_ottobre_2018.pdf"),
    ((2018, 11), "2025-05/cruscotto_statistico_giornaliero_30_novembre_2018.pdf"),
    ((2018, 12), "2025-05/cruscotto_statistico_giornaliero_31_dicembre_2018.pdf"),
    ((2019, 1), "2025-05/cruscotto_statistico_giornaliero_31-01-2019_0_0.pdf"),
    ((2019, 2), "2025-05/cruscotto_statistico_giornaliero_28-02-2019_0_0.pdf"),
    ((2019, 3), "2025-05/cruscotto_statistico_giornaliero_31-03-2019_0.pdf"),
    ((2019, 4), "2025-05/cruscotto_statistico_giornaliero_30-04-2019_0_0.pdf"),
    ((2019, 5), "2025-05/cruscotto_statistico_giornaliero_31-05-2019_0.pdf"),
    ((2019, 9), "2025-05/cruscotto_statistico_giornaliero_30-09-2019_0.pdf"),
    ((2020, 1), "2025-05/cruscotto_statistico_giornaliero_31_gennaio_2020.pdf"),
    ((2020, 3), "2025-05/cruscotto_statistico_giornaliero_31_marzo_2020.pdf"),
    ((2020, 5), "2025-05/cruscotto_statistico_giornaliero_31_maggio_2020.pdf"),
    ((2020, 11), "2025-05/cruscotto_statistico_giornaliero_30_novembre_2020.pdf"),
    ((2020, 12), "2025-05/cruscotto_statistico_giornaliero_31_dicembre_2020_0.pdf"),
    ((2021, 9), "2025-05/cruscotto_statistico_giornaliero_30_settembre_2021.pdf"),
    ((2022, 2), "2025-05/cruscotto_statistico_giornaliero_28-02-2022_1.pdf"),
    ((2022, 4), "2025-05/cruscotto_statistico_giornaliero_30_aprile_2022.pdf"),
    ((2022, 5), "2025-05/cruscotto_statistico_giornaliero_31-05-2022 (1).pdf"),
    ((2022, 11), "2025-05/cruscotto_statistico_giornaliero_30_novembre_2022.pdf"),
    ((2022, 12), "2025-05/cruscotto_statistico_giornaliero_31_dicembre_2022.pdf"),
    ((2024, 3), "2025-05/cruscotto_statistico_giornaliero_31.03.2024.pdf"),
    ((2024, 4), "2025-05/cruscotto_statistico_giornaliero_30_aprile_2024.pdf"),
    ((2024, 6), "2025-05/Cruscotto statistico al 30 giugno 2024.pdf"),
    ((2024, 8), "2025-05/Cruscotto statistico al 31 agosto 2024.pdf"),
    ((2024, 9), "2025-05/Cruscotto statistico al 30 settembre 2024.pdf"),
    ((2024, 10), "2025-05/Cruscotto statistico al 31 ottobre 2024.pdf"),
    ((2024, 11), "2025-05/Cruscotto statistico al 30 novembre 2024.pdf"),
    ((2024, 12), "2025-05/cruscotto_statistico_giornaliero_31_dicembre_2024.pdf"),
    ((2025, 5), "2025-05/cruscotto_statistico_giornaliero_21-05-2025.pdf"),
    ((2025, 11), "2025-12/Cruscotto statistico giornaliero 30-11-2025.pdf"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: String,
    pub filename: String,
}

pub fn candidates(files_url: &str, month: YearMonth) -> Result<Vec<Candidate>> {
    let mut candidates = Vec::new();

    if let Some(path) = special_path(month) {
        let filename = path.rsplit('/').next().unwrap_or(path).to_string();
        candidates.push(Candidate {
            url: join_url(files_url, path)?,
            filename,
        });
    }

    let folder = upload_folder(month);
    for filename in filename_variants(month) {
        candidates.push(Candidate {
            url: join_url(files_url, &format!("{folder}/{filename}"))?,
            filename,
        });
    }

    Ok(candidates)
}

fn special_path(month: YearMonth) -> Option<&'static str> {
    SPECIAL_PATHS
        .iter()
        .find(|((year, number), _)| *year == month.year && *number == month.month)
        .map(|(_, path)| *path)
}

fn upload_folder(month: YearMonth) -> &'static str {
    match (month.year, month.month) {
        (year, _) if year < 2025 => "2025-05",
        (2025, 1..=5) => "2025-05",
        (2025, 6..=10) => "2025-10",
        _ => "2025-12",
    }
}

fn filename_variants(month: YearMonth) -> Vec<String> {
    let day = month.days_in_month();
    let number = month.month;
    let year = month.year;

    vec![
        format!("Cruscotto statistico giornaliero {day:02}-{number:02}-{year}.pdf"),
        format!("cruscotto_statistico_giornaliero_{day:02}-{number:02}-{year}.pdf"),
        format!("Cruscotto_statistico_giornaliero_{day:02}-{number:02}-{year}.pdf"),
        format!("cruscotto_statistico_giornaliero_{day}_{number}_{year}.pdf"),
    ]
}

fn join_url(files_url: &str, relative: &str) -> Result<String> {
    let raw = format!("{}/{}", files_url.trim_end_matches('/'), relative);
    let url = reqwest::Url::parse(&raw).with_context(|| format!("invalid report url: {raw}"))?;
    Ok(url.to_string())
}
