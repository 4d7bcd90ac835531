use chrono::NaiveDate;
use geo::MultiPolygon;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Island {
    Luzon,
    Visayas,
    Mindanao,
}

impl Island {
    pub const ALL: [Island; 3] = [Island::Luzon, Island::Visayas, Island::Mindanao];

    pub fn name(self) -> &'static str {
        match self {
            Island::Luzon => "Luzon",
            Island::Visayas => "Visayas",
            Island::Mindanao => "Mindanao",
        }
    }
}

impl fmt::Display for Island {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<String> for Island {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "luzon" => Ok(Island::Luzon),
            "visayas" => Ok(Island::Visayas),
            "mindanao" => Ok(Island::Mindanao),
            other => Err(format!("unknown island group '{}'", other)),
        }
    }
}

/// One row of the case/death table. Deaths never exceed cases in valid input,
/// but nothing here enforces it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CaseRecord {
    #[serde(rename = "Date", deserialize_with = "deserialize_period")]
    pub date: NaiveDate,
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Island")]
    pub island: Island,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Dengue_Cases")]
    pub cases: u64,
    #[serde(rename = "Dengue_Deaths")]
    pub deaths: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HospitalPoint {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HospitalIslandCount {
    #[serde(rename = "Island")]
    pub island: Island,
    #[serde(rename = "Hospital_Count")]
    pub hospital_count: u64,
}

#[derive(Debug, Clone)]
pub struct RegionGeometry {
    pub region: String,
    pub geometry: MultiPolygon<f64>,
    pub total_cases: u64,
    pub total_deaths: u64,
}

/// Everything loaded at startup. Read-only for the life of the process.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub cases: Vec<CaseRecord>,
    pub hospitals: Vec<HospitalPoint>,
    pub hospital_counts: Vec<HospitalIslandCount>,
    pub regions: Vec<RegionGeometry>,
}

/// Parses `YYYY-MM-DD`, `YYYY-MM` or `YYYY` into the first day of that period.
pub fn parse_period(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    // pandas may write timestamps with a time component
    let raw = raw.split([' ', 'T']).next().unwrap_or(raw);
    let mut parts = raw.split('-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u32 = match parts.next() {
        Some(m) => m.parse().ok()?,
        None => 1,
    };
    let day: u32 = match parts.next() {
        Some(d) => d.parse().ok()?,
        None => 1,
    };
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn deserialize_period<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_period(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{}'", raw)))
}
