use crate::config::AppConfig;
use crate::types::{CaseRecord, Dataset, HospitalIslandCount, HospitalPoint, RegionGeometry};
use anyhow::{Context, Result, anyhow};
use csv::ReaderBuilder;
use geo::{CoordsIter, MultiPolygon, Simplify};
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use shapefile::Reader;
use shapefile::dbase::FieldValue;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{info, warn};

const CASES_FIELD: &str = "Dengue_Cas";
const DEATHS_FIELD: &str = "Dengue_Dea";

pub fn load_data(config: &AppConfig) -> Result<Dataset> {
    info!("Loading data...");

    let cases = load_cases(&config.input.cases_csv)?;
    info!("Loaded {} case rows", cases.len());

    let hospitals = load_hospitals(&config.input.hospitals_csv)?;
    info!("Loaded {} hospital and clinic points", hospitals.len());

    let hospital_counts = load_hospital_counts(&config.input.hospital_counts_csv)?;
    info!("Loaded hospital counts for {} island groups", hospital_counts.len());

    let mut regions = load_regions(config)?;
    let before: usize = regions.iter().map(|r| r.geometry.coords_count()).sum();
    simplify_regions(&mut regions, config.processing.simplify_tolerance);
    let after: usize = regions.iter().map(|r| r.geometry.coords_count()).sum();
    info!(
        "Loaded {} region boundaries, simplified {} -> {} vertices",
        regions.len(),
        before,
        after
    );

    Ok(Dataset {
        cases,
        hospitals,
        hospital_counts,
        regions,
    })
}

pub fn load_cases(path: &Path) -> Result<Vec<CaseRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open case CSV: {:?}", path))?;
    cases_from_reader(file).with_context(|| format!("Failed to read case CSV: {:?}", path))
}

pub fn cases_from_reader<R: Read>(reader: R) -> Result<Vec<CaseRecord>> {
    read_csv(reader)
}

pub fn load_hospitals(path: &Path) -> Result<Vec<HospitalPoint>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open hospital CSV: {:?}", path))?;
    hospitals_from_reader(file).with_context(|| format!("Failed to read hospital CSV: {:?}", path))
}

pub fn hospitals_from_reader<R: Read>(reader: R) -> Result<Vec<HospitalPoint>> {
    read_csv(reader)
}

pub fn load_hospital_counts(path: &Path) -> Result<Vec<HospitalIslandCount>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open hospital count CSV: {:?}", path))?;
    hospital_counts_from_reader(file)
        .with_context(|| format!("Failed to read hospital count CSV: {:?}", path))
}

pub fn hospital_counts_from_reader<R: Read>(reader: R) -> Result<Vec<HospitalIslandCount>> {
    read_csv(reader)
}

fn read_csv<T: DeserializeOwned, R: Read>(reader: R) -> Result<Vec<T>> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = Vec::new();
    for (i, result) in rdr.deserialize().enumerate() {
        // +2: one for the header, one for 1-based numbering
        let row: T = result.with_context(|| format!("Malformed row {}", i + 2))?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn load_regions(config: &AppConfig) -> Result<Vec<RegionGeometry>> {
    let path = &config.input.regions;
    let extension = path.extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| anyhow!("Region geometry file has no extension"))?;

    match extension.as_str() {
        "shp" => load_region_shapefile(path, &config.input.region_field),
        "json" | "geojson" => {
            info!("Loading GeoJSON from {:?}...", path);
            let file = File::open(path)
                .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
            regions_from_geojson(BufReader::new(file), &config.input.region_field)
        }
        _ => Err(anyhow!("Unsupported geometry format: {}", extension)),
    }
}

fn load_region_shapefile(path: &Path, region_field: &str) -> Result<Vec<RegionGeometry>> {
    info!("Loading Shapefile from {:?}...", path);
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open Shapefile: {:?}", path))?;

    let mut regions = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;

        let region = match record.get(region_field) {
            Some(FieldValue::Character(Some(s))) => s.trim().to_string(),
            Some(FieldValue::Character(None)) | None => {
                warn!("Skipping shape without a '{}' value", region_field);
                continue;
            }
            Some(_) => return Err(anyhow!("Shapefile field '{}' must be a string", region_field)),
        };

        let geometry: MultiPolygon<f64> = match shape {
            shapefile::Shape::Polygon(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygon: {:?}", e))?,
            shapefile::Shape::PolygonM(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygonM: {:?}", e))?,
            shapefile::Shape::PolygonZ(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygonZ: {:?}", e))?,
            _ => {
                warn!("Skipping non-polygon shape for region {}", region);
                continue;
            }
        };

        regions.push(RegionGeometry {
            region,
            geometry,
            total_cases: dbase_count(record.get(CASES_FIELD)),
            total_deaths: dbase_count(record.get(DEATHS_FIELD)),
        });
    }

    Ok(regions)
}

fn dbase_count(value: Option<&FieldValue>) -> u64 {
    let n = match value {
        Some(FieldValue::Numeric(Some(n))) => *n,
        Some(FieldValue::Float(Some(n))) => *n as f64,
        Some(FieldValue::Double(n)) => *n,
        Some(FieldValue::Integer(n)) => *n as f64,
        _ => 0.0,
    };
    n.max(0.0).round() as u64
}

pub fn regions_from_geojson<R: Read>(reader: R, region_field: &str) -> Result<Vec<RegionGeometry>> {
    use geojson::GeoJson;

    let geojson = GeoJson::from_reader(reader).context("Failed to parse GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut regions = Vec::new();

    for feature in collection.features {
        let props = feature.properties.as_ref();

        let region = match props.and_then(|p| p.get(region_field)) {
            Some(serde_json::Value::String(s)) => s.trim().to_string(),
            _ => {
                warn!("Skipping feature without a '{}' value", region_field);
                continue;
            }
        };

        let json_count = |field: &str| -> u64 {
            props
                .and_then(|p| p.get(field))
                .and_then(|v| v.as_f64())
                .map(|n| n.max(0.0).round() as u64)
                .unwrap_or(0)
        };
        let total_cases = json_count(CASES_FIELD);
        let total_deaths = json_count(DEATHS_FIELD);

        let geometry = match feature.geometry {
            Some(geom) => {
                let geo_geom: geo::Geometry<f64> = geom.value.try_into()
                    .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;

                match geo_geom {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => {
                        warn!("Skipping non-polygon geometry for region {}", region);
                        continue;
                    }
                }
            }
            None => {
                warn!("Skipping region {} without geometry", region);
                continue;
            }
        };

        regions.push(RegionGeometry {
            region,
            geometry,
            total_cases,
            total_deaths,
        });
    }

    Ok(regions)
}

/// Ramer-Douglas-Peucker simplification, in place. Only run once at load.
pub fn simplify_regions(regions: &mut [RegionGeometry], tolerance: f64) {
    if tolerance <= 0.0 {
        return;
    }
    regions.par_iter_mut().for_each(|region| {
        region.geometry = region.geometry.simplify(&tolerance);
    });
}
