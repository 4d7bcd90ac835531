use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    pub server: ServerConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub cases_csv: PathBuf,
    pub hospitals_csv: PathBuf,
    pub hospital_counts_csv: PathBuf,
    pub regions: PathBuf, // .shp or .geojson
    #[serde(default = "default_region_field")]
    pub region_field: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProcessingConfig {
    #[serde(default = "default_tolerance")]
    pub simplify_tolerance: f64,
    #[serde(default = "default_year_min")]
    pub year_min: i32,
    #[serde(default = "default_year_max")]
    pub year_max: i32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    #[serde(default = "default_refresh_secs")]
    pub hospital_refresh_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub chart_dir: PathBuf,
}

fn default_region_field() -> String {
    "Region".to_string()
}

fn default_tolerance() -> f64 {
    0.01
}

fn default_year_min() -> i32 {
    2016
}

fn default_year_max() -> i32 {
    2020
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_refresh_secs() -> u64 {
    60
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            simplify_tolerance: default_tolerance(),
            year_min: default_year_min(),
            year_max: default_year_max(),
        }
    }
}

impl ProcessingConfig {
    /// Number of whole years covered by the data, used for per-year averages.
    pub fn span_years(&self) -> u32 {
        (self.year_max - self.year_min + 1).max(1) as u32
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}
