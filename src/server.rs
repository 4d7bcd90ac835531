use crate::config::AppConfig;
use crate::metric::{Button, Metric};
use crate::processing::{self, SummaryCards};
use crate::theme;
use crate::render::ChartSpec;
use crate::types::{Dataset, RegionGeometry};
use crate::wiring::{self, ChartId, Control, Controls, Update};
use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use axum_extra::extract::Query as RepeatedQuery;
use geo::{BoundingRect, Contains, Point};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

// Wrapper for RTree indexing
pub struct RegionIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for RegionIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct AppState {
    pub dataset: Dataset,
    pub tree: RTree<RegionIndex>,
    pub config: AppConfig,
    pub region_options: Vec<String>,
    pub summary: SummaryCards,
}

impl AppState {
    pub fn new(config: AppConfig, dataset: Dataset) -> Self {
        let tree = build_region_index(&dataset.regions);
        let region_options = processing::region_options(&dataset.cases);
        let summary = processing::summary(&dataset.cases, config.processing.span_years());
        Self {
            dataset,
            tree,
            config,
            region_options,
            summary,
        }
    }

    /// Region whose boundary contains the point, if any.
    pub fn locate_region(&self, lat: f64, lon: f64) -> Option<&RegionGeometry> {
        let point = Point::new(lon, lat);
        let envelope = AABB::from_point([lon, lat]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|candidate| self.dataset.regions.get(candidate.index))
            .find(|region| region.geometry.contains(&point))
    }
}

pub fn build_region_index(regions: &[RegionGeometry]) -> RTree<RegionIndex> {
    let items: Vec<RegionIndex> = regions
        .iter()
        .enumerate()
        .filter_map(|(i, region)| {
            let rect = region.geometry.bounding_rect()?;
            Some(RegionIndex {
                index: i,
                aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
            })
        })
        .collect();
    RTree::bulk_load(items)
}

#[derive(Serialize)]
pub struct MetaResponse {
    regions: Vec<String>,
    year_min: i32,
    year_max: i32,
    hospital_refresh_secs: u64,
    summary: SummaryCards,
    card_colors: [&'static str; 4],
    controls: Controls,
}

#[derive(Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    controls: Controls,
    changed: Option<Control>,
    /// A metric button press; counted server-side and overrides `changed`
    clicked: Option<Button>,
}

/// Flat query-string form of the control values for a single chart.
#[derive(Debug, Default, Deserialize)]
pub struct ChartQuery {
    metric: Option<Metric>,
    #[serde(default)]
    cases_clicks: u64,
    #[serde(default)]
    deaths_clicks: u64,
    /// Checklist selection, one `regions=` pair per region
    #[serde(default)]
    regions: Vec<String>,
    region: Option<String>,
    year_lo: Option<i32>,
    year_hi: Option<i32>,
}

impl ChartQuery {
    fn into_controls(self, config: &AppConfig) -> Controls {
        let mut controls = Controls::initial(&config.processing);
        controls.cases_clicks = self.cases_clicks;
        controls.deaths_clicks = self.deaths_clicks;
        controls.metric = Metric::next(
            self.cases_clicks,
            self.deaths_clicks,
            self.metric.unwrap_or_default(),
        );
        controls.checklist_regions = self
            .regions
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        controls.dropdown_region = self.region;
        let years = (
            self.year_lo.unwrap_or(config.processing.year_min),
            self.year_hi.unwrap_or(config.processing.year_max),
        );
        controls.checklist_years = years;
        controls.dropdown_years = years;
        controls
    }
}

#[derive(Deserialize)]
pub struct RegionQuery {
    lat: f64,
    lon: f64,
}

#[derive(Serialize)]
pub struct RegionResponse {
    region: String,
    total_cases: u64,
    total_deaths: u64,
}

pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = ServeDir::new(&state.config.server.static_dir);
    Router::new()
        .route("/api/meta", get(meta_handler))
        .route("/api/update", post(update_handler))
        .route("/api/charts/:id", get(chart_handler))
        .route("/api/region", get(region_handler))
        .fallback_service(static_dir)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, dataset: Dataset) -> Result<()> {
    info!("Building spatial index for {} regions...", dataset.regions.len());
    let state = Arc::new(AppState::new(config, dataset));

    let port = state.config.server.port;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    info!("Starting server on http://{}", addr);

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn meta_handler(State(state): State<Arc<AppState>>) -> Json<MetaResponse> {
    let settings = &state.config.processing;
    Json(MetaResponse {
        regions: state.region_options.clone(),
        year_min: settings.year_min,
        year_max: settings.year_max,
        hospital_refresh_secs: state.config.server.hospital_refresh_secs,
        summary: state.summary.clone(),
        card_colors: theme::CARD_COLORS,
        controls: Controls::initial(settings),
    })
}

async fn update_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpdateRequest>,
) -> Json<Update> {
    let mut controls = request.controls;
    let changed = match request.clicked {
        Some(button) => Some(controls.press(button)),
        None => request.changed,
    };
    Json(wiring::update(
        &state.dataset,
        &state.config.processing,
        &controls,
        changed,
    ))
}

async fn chart_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    RepeatedQuery(query): RepeatedQuery<ChartQuery>,
) -> Result<Json<ChartSpec>, StatusCode> {
    let id = ChartId::from_slug(&id).ok_or(StatusCode::NOT_FOUND)?;
    let controls = query.into_controls(&state.config);
    Ok(Json(wiring::build_chart(
        &state.dataset,
        &state.config.processing,
        &controls,
        id,
    )))
}

async fn region_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RegionQuery>,
) -> Json<Option<RegionResponse>> {
    Json(state.locate_region(params.lat, params.lon).map(|region| RegionResponse {
        region: region.region.clone(),
        total_cases: region.total_cases,
        total_deaths: region.total_deaths,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn config() -> AppConfig {
        AppConfig::from_toml(
            r#"
            [input]
            cases_csv = "cases.csv"
            hospitals_csv = "hospitals.csv"
            hospital_counts_csv = "counts.csv"
            regions = "regions.geojson"

            [server]
            port = 0

            [output]
            chart_dir = "out"
            "#,
        )
        .unwrap()
    }

    fn square(name: &str, x0: f64, y0: f64) -> RegionGeometry {
        RegionGeometry {
            region: name.to_string(),
            geometry: MultiPolygon::new(vec![polygon![
                (x: x0, y: y0),
                (x: x0 + 1.0, y: y0),
                (x: x0 + 1.0, y: y0 + 1.0),
                (x: x0, y: y0 + 1.0),
                (x: x0, y: y0),
            ]]),
            total_cases: 100,
            total_deaths: 3,
        }
    }

    #[test]
    fn test_locate_region() {
        let dataset = Dataset {
            regions: vec![square("Region I", 120.0, 16.0), square("Region VII", 123.0, 9.0)],
            ..Dataset::default()
        };
        let state = AppState::new(config(), dataset);
        assert_eq!(state.locate_region(16.5, 120.5).map(|r| r.region.as_str()), Some("Region I"));
        assert_eq!(state.locate_region(9.5, 123.5).map(|r| r.region.as_str()), Some("Region VII"));
        assert!(state.locate_region(0.0, 0.0).is_none());
    }

    #[test]
    fn test_chart_query_into_controls() {
        let query = ChartQuery {
            metric: Some(Metric::Cases),
            deaths_clicks: 2,
            regions: vec!["Region I".to_string(), " NCR, Metro Manila ".to_string(), String::new()],
            year_lo: Some(2018),
            ..ChartQuery::default()
        };
        let controls = query.into_controls(&config());
        assert_eq!(controls.metric, Metric::Deaths);
        assert_eq!(controls.checklist_regions, ["Region I", "NCR, Metro Manila"]);
        assert_eq!(controls.checklist_years, (2018, 2020));
        assert_eq!(controls.dropdown_years, (2018, 2020));
        assert_eq!(controls.dropdown_region, None);
    }

    mod http {
        use super::*;
        use crate::types::{CaseRecord, HospitalIslandCount, Island};
        use axum::body::{to_bytes, Body};
        use axum::http::Request;
        use serde_json::{json, Value};
        use tower::ServiceExt;

        fn app() -> Router {
            let row = |date: &str, region: &str, island, cases, deaths| {
                let date = crate::types::parse_period(date).unwrap();
                CaseRecord {
                    year: chrono::Datelike::year(&date),
                    date,
                    region: region.to_string(),
                    island,
                    cases,
                    deaths,
                }
            };
            let dataset = Dataset {
                cases: vec![
                    row("2016-01", "Region I", Island::Luzon, 10, 2),
                    row("2017-01", "NCR, Metro Manila", Island::Luzon, 20, 1),
                ],
                hospital_counts: vec![HospitalIslandCount { island: Island::Luzon, hospital_count: 7 }],
                regions: vec![square("Region I", 120.0, 16.0)],
                ..Dataset::default()
            };
            router(Arc::new(AppState::new(config(), dataset)))
        }

        async fn send(request: Request<Body>) -> (StatusCode, Value) {
            let response = app().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, body)
        }

        fn get(uri: &str) -> Request<Body> {
            Request::builder().uri(uri).body(Body::empty()).unwrap()
        }

        fn post_update(body: Value) -> Request<Body> {
            Request::builder()
                .method("POST")
                .uri("/api/update")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap()
        }

        fn chart_ids(update: &Value) -> Vec<String> {
            update["charts"].as_object().unwrap().keys().cloned().collect()
        }

        #[tokio::test]
        async fn test_meta_lists_regions_summary_and_initial_controls() {
            let (status, meta) = send(get("/api/meta")).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(meta["regions"], json!(["Region I", "NCR, Metro Manila"]));
            assert_eq!(meta["summary"]["total_cases"], 30);
            assert_eq!(meta["summary"]["total_deaths"], 3);
            assert_eq!(meta["summary"]["average_cases_display"], "6.00");
            assert_eq!(meta["controls"]["metric"], "Cases");
            assert_eq!(meta["controls"]["cases_clicks"], 0);
            assert_eq!(meta["controls"]["checklist_years"], json!([2016, 2020]));
            assert_eq!(meta["year_min"], 2016);
        }

        #[tokio::test]
        async fn test_click_overrides_changed_and_counts_one_press() {
            let (status, update) = send(post_update(json!({
                "controls": {},
                "clicked": "deaths",
                "changed": "region_checklist",
            })))
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(update["metric"], "Deaths");
            assert_eq!(update["controls"]["deaths_clicks"], 1);
            assert_eq!(update["controls"]["cases_clicks"], 0);
            assert_eq!(chart_ids(&update), ["island_pie", "region_choropleth"]);
            assert_eq!(update["charts"]["island_pie"]["layout"]["title"]["text"], "Dengue Deaths per Island");
        }

        #[tokio::test]
        async fn test_clicks_accumulate_when_controls_are_echoed_back() {
            let (_, first) = send(post_update(json!({"clicked": "deaths"}))).await;
            let (_, second) = send(post_update(json!({
                "controls": first["controls"],
                "clicked": "deaths",
            })))
            .await;
            assert_eq!(second["controls"]["deaths_clicks"], 2);

            // a timer tick carrying the latest controls keeps the selection
            let (_, tick) = send(post_update(json!({
                "controls": second["controls"],
                "changed": "refresh_timer",
            })))
            .await;
            assert_eq!(tick["metric"], "Deaths");
            assert_eq!(tick["controls"], second["controls"]);
            assert_eq!(chart_ids(&tick), ["hospital_counts"]);
        }

        #[tokio::test]
        async fn test_unknown_chart_is_not_found() {
            let (status, body) = send(get("/api/charts/no_such_chart")).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body, Value::Null);
        }

        #[tokio::test]
        async fn test_repeated_regions_keep_commas_in_names() {
            let (status, chart) = send(get(
                "/api/charts/region_year_stacked?regions=Region%20I&regions=NCR%2C%20Metro%20Manila",
            ))
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(chart["data"].as_array().map(|d| d.len()), Some(2));
            assert_eq!(chart["data"][0]["x"], json!(["NCR, Metro Manila", "Region I"]));
        }

        #[tokio::test]
        async fn test_chart_without_selection_is_empty_state() {
            let (status, chart) = send(get("/api/charts/region_year_stacked")).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(chart["data"], json!([]));
            assert_eq!(chart["layout"]["title"]["text"], "No Region Selected");
        }

        #[tokio::test]
        async fn test_region_lookup() {
            let (_, hit) = send(get("/api/region?lat=16.5&lon=120.5")).await;
            assert_eq!(hit["region"], "Region I");
            assert_eq!(hit["total_cases"], 100);

            let (status, miss) = send(get("/api/region?lat=0&lon=0")).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(miss, Value::Null);
        }
    }
}
