use crate::metric::Metric;
use crate::types::{CaseRecord, Island};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateTotals {
    pub date: NaiveDate,
    pub cases: u64,
    pub deaths: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionYearTotals {
    pub region: String,
    pub year: i32,
    pub cases: u64,
    pub deaths: u64,
}

/// Inclusive year window from a range slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub lo: i32,
    pub hi: i32,
}

impl YearRange {
    pub fn new(lo: i32, hi: i32) -> Self {
        // sliders can report their handles in either order
        Self { lo: lo.min(hi), hi: lo.max(hi) }
    }

    pub fn contains(&self, year: i32) -> bool {
        self.lo <= year && year <= self.hi
    }
}

/// Sum both metrics per date, oldest first.
pub fn totals_by_date<'a, I>(rows: I) -> Vec<DateTotals>
where
    I: IntoIterator<Item = &'a CaseRecord>,
{
    let mut buckets: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();
    for row in rows {
        let entry = buckets.entry(row.date).or_default();
        entry.0 += row.cases;
        entry.1 += row.deaths;
    }
    buckets
        .into_iter()
        .map(|(date, (cases, deaths))| DateTotals { date, cases, deaths })
        .collect()
}

/// Rows whose region is in `regions` and whose year falls in `years`.
/// An empty region set selects nothing.
pub fn filter_by_regions_and_years<'a, S>(
    table: &'a [CaseRecord],
    regions: &[S],
    years: YearRange,
) -> Vec<&'a CaseRecord>
where
    S: AsRef<str>,
{
    if regions.is_empty() {
        return Vec::new();
    }
    let wanted: HashSet<&str> = regions.iter().map(|r| r.as_ref()).collect();
    table
        .iter()
        .filter(|row| wanted.contains(row.region.as_str()) && years.contains(row.year))
        .collect()
}

/// Sum per (region, year), ordered by region name then year.
pub fn group_by_region_year(subset: &[&CaseRecord]) -> Vec<RegionYearTotals> {
    let mut groups: BTreeMap<(&str, i32), (u64, u64)> = BTreeMap::new();
    for row in subset {
        let entry = groups.entry((row.region.as_str(), row.year)).or_default();
        entry.0 += row.cases;
        entry.1 += row.deaths;
    }
    groups
        .into_iter()
        .map(|((region, year), (cases, deaths))| RegionYearTotals {
            region: region.to_string(),
            year,
            cases,
            deaths,
        })
        .collect()
}

pub fn filter_by_region<'a>(
    table: &'a [CaseRecord],
    region: &str,
    years: YearRange,
) -> Vec<&'a CaseRecord> {
    table
        .iter()
        .filter(|row| row.region == region && years.contains(row.year))
        .collect()
}

/// Selected metric per island group, in Luzon/Visayas/Mindanao order.
/// Islands without any rows are left out.
pub fn totals_by_island(table: &[CaseRecord], metric: Metric) -> Vec<(Island, u64)> {
    let mut sums: HashMap<Island, u64> = HashMap::new();
    for row in table {
        *sums.entry(row.island).or_default() += metric.select(row.cases, row.deaths);
    }
    Island::ALL
        .iter()
        .filter_map(|island| sums.get(island).map(|total| (*island, *total)))
        .collect()
}

/// Distinct region names in order of first appearance.
pub fn region_options(table: &[CaseRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    table
        .iter()
        .filter(|row| seen.insert(row.region.as_str()))
        .map(|row| row.region.clone())
        .collect()
}

/// Headline figures shown above the charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryCards {
    pub total_cases: u64,
    pub total_deaths: u64,
    pub average_cases: f64,
    pub average_deaths: f64,
    pub total_cases_display: String,
    pub total_deaths_display: String,
    pub average_cases_display: String,
    pub average_deaths_display: String,
}

pub fn summary(table: &[CaseRecord], span_years: u32) -> SummaryCards {
    let total_cases: u64 = table.iter().map(|r| r.cases).sum();
    let total_deaths: u64 = table.iter().map(|r| r.deaths).sum();
    let span = span_years.max(1) as f64;
    let average_cases = total_cases as f64 / span;
    let average_deaths = total_deaths as f64 / span;

    SummaryCards {
        total_cases,
        total_deaths,
        average_cases,
        average_deaths,
        total_cases_display: format_count(total_cases),
        total_deaths_display: format_count(total_deaths),
        average_cases_display: format_decimal(average_cases),
        average_deaths_display: format_decimal(average_deaths),
    }
}

/// `1234567` -> `"1,234,567"`.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Two decimal places with thousands separators: `1234.5` -> `"1,234.50"`.
pub fn format_decimal(value: f64) -> String {
    let cents = (value * 100.0).round() as u64;
    format!("{}.{:02}", format_count(cents / 100), cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, region: &str, island: Island, cases: u64, deaths: u64) -> CaseRecord {
        let date = crate::types::parse_period(date).unwrap();
        CaseRecord {
            year: chrono::Datelike::year(&date),
            date,
            region: region.to_string(),
            island,
            cases,
            deaths,
        }
    }

    fn sample() -> Vec<CaseRecord> {
        vec![
            row("2017-01", "Region VII", Island::Visayas, 50, 3),
            row("2016-01", "Region I", Island::Luzon, 10, 2),
            row("2016-01", "Region VII", Island::Visayas, 30, 1),
            row("2016-02", "Region I", Island::Luzon, 7, 0),
            row("2017-01", "Region I", Island::Luzon, 5, 1),
            row("2019-05", "BARMM", Island::Mindanao, 40, 4),
        ]
    }

    #[test]
    fn test_totals_by_date_is_chronological_and_summed() {
        let table = sample();
        let totals = totals_by_date(&table);
        let dates: Vec<String> = totals.iter().map(|t| t.date.to_string()).collect();
        assert_eq!(dates, ["2016-01-01", "2016-02-01", "2017-01-01", "2019-05-01"]);
        assert_eq!(totals[0].cases, 40);
        assert_eq!(totals[0].deaths, 3);
        assert_eq!(totals[2].cases, 55);
    }

    #[test]
    fn test_bucket_sums_match_table_sums() {
        let table = sample();
        let totals = totals_by_date(&table);
        let bucket_cases: u64 = totals.iter().map(|t| t.cases).sum();
        let bucket_deaths: u64 = totals.iter().map(|t| t.deaths).sum();
        assert_eq!(bucket_cases, table.iter().map(|r| r.cases).sum::<u64>());
        assert_eq!(bucket_deaths, table.iter().map(|r| r.deaths).sum::<u64>());
    }

    #[test]
    fn test_empty_region_set_selects_nothing() {
        let table = sample();
        let none: [&str; 0] = [];
        assert!(filter_by_regions_and_years(&table, &none, YearRange::new(2016, 2020)).is_empty());
        assert!(filter_by_regions_and_years(&[], &none, YearRange::new(2016, 2020)).is_empty());
    }

    #[test]
    fn test_filter_by_regions_and_years() {
        let table = sample();
        let subset =
            filter_by_regions_and_years(&table, &["Region I", "BARMM"], YearRange::new(2016, 2017));
        assert_eq!(subset.len(), 3);
        assert!(subset.iter().all(|r| r.region == "Region I"));

        let subset = filter_by_regions_and_years(&table, &["Region I"], YearRange::new(2018, 2020));
        assert!(subset.is_empty());
    }

    #[test]
    fn test_group_by_region_year() {
        let table = sample();
        let subset = filter_by_regions_and_years(
            &table,
            &["Region I", "Region VII"],
            YearRange::new(2016, 2020),
        );
        let groups = group_by_region_year(&subset);
        assert_eq!(
            groups,
            vec![
                RegionYearTotals { region: "Region I".into(), year: 2016, cases: 17, deaths: 2 },
                RegionYearTotals { region: "Region I".into(), year: 2017, cases: 5, deaths: 1 },
                RegionYearTotals { region: "Region VII".into(), year: 2016, cases: 30, deaths: 1 },
                RegionYearTotals { region: "Region VII".into(), year: 2017, cases: 50, deaths: 3 },
            ]
        );
    }

    #[test]
    fn test_single_region_two_years() {
        let table = vec![
            row("2016", "A", Island::Luzon, 10, 2),
            row("2017", "A", Island::Luzon, 5, 1),
        ];
        let subset = filter_by_region(&table, "A", YearRange::new(2016, 2017));
        let totals = totals_by_date(subset);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals.iter().map(|t| t.cases).collect::<Vec<_>>(), [10, 5]);
        assert_eq!(totals.iter().map(|t| t.deaths).collect::<Vec<_>>(), [2, 1]);
        assert!(totals[0].date < totals[1].date);
    }

    #[test]
    fn test_year_range_normalises_order() {
        let range = YearRange::new(2020, 2016);
        assert_eq!(range, YearRange { lo: 2016, hi: 2020 });
        assert!(range.contains(2018));
        assert!(!range.contains(2021));
    }

    #[test]
    fn test_totals_by_island() {
        let table = sample();
        assert_eq!(
            totals_by_island(&table, Metric::Cases),
            vec![(Island::Luzon, 22), (Island::Visayas, 80), (Island::Mindanao, 40)]
        );
        assert_eq!(
            totals_by_island(&table[..3], Metric::Deaths),
            vec![(Island::Luzon, 2), (Island::Visayas, 4)]
        );
    }

    #[test]
    fn test_region_options_first_appearance() {
        assert_eq!(region_options(&sample()), ["Region VII", "Region I", "BARMM"]);
    }

    #[test]
    fn test_summary_cards() {
        let cards = summary(&sample(), 5);
        assert_eq!(cards.total_cases, 142);
        assert_eq!(cards.total_deaths, 11);
        assert_eq!(cards.average_cases_display, "28.40");
        assert_eq!(cards.average_deaths_display, "2.20");
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
        assert_eq!(format_decimal(1234.5), "1,234.50");
        assert_eq!(format_decimal(0.005), "0.01");
    }
}
