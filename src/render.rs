use crate::metric::Metric;
use crate::processing::{DateTotals, RegionYearTotals, YearRange};
use crate::theme;
use crate::types::{HospitalIslandCount, HospitalPoint, Island, RegionGeometry};
use geojson::{Feature, FeatureCollection, Geometry};
use serde::Serialize;

pub const NO_REGION_SELECTED: &str = "No Region Selected";
pub const NO_DATA: &str = "No Data Available";

/// A figure in the JSON shape plotly.js takes: traces plus layout.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSpec {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

impl ChartSpec {
    fn empty(layout: Layout) -> Self {
        Self { data: Vec::new(), layout }
    }

    pub fn title(&self) -> &str {
        &self.layout.title.text
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Scatter(LineTrace),
    Pie(PieTrace),
    Bar(BarTrace),
    Choroplethmapbox(ChoroplethTrace),
    Scattermapbox(PointTrace),
}

#[derive(Debug, Clone, Serialize)]
pub struct LineTrace {
    pub name: String,
    pub x: Vec<String>,
    pub y: Vec<u64>,
    pub mode: &'static str,
    pub line: LineStyle,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineStyle {
    pub color: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PieTrace {
    pub labels: Vec<String>,
    pub values: Vec<u64>,
    pub hole: f64,
    pub textinfo: &'static str,
    pub sort: bool,
    pub marker: PieMarker,
}

#[derive(Debug, Clone, Serialize)]
pub struct PieMarker {
    pub colors: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BarTrace {
    pub name: String,
    pub x: Vec<String>,
    pub y: Vec<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub text: Vec<String>,
    pub marker: Marker,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChoroplethTrace {
    pub geojson: FeatureCollection,
    pub locations: Vec<String>,
    pub z: Vec<u64>,
    pub text: Vec<String>,
    pub hoverinfo: &'static str,
    pub colorscale: Vec<(f64, &'static str)>,
    pub colorbar: ColorBar,
    pub marker: Marker,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColorBar {
    pub title: Title,
}

#[derive(Debug, Clone, Serialize)]
pub struct PointTrace {
    pub name: String,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub text: Vec<String>,
    pub mode: &'static str,
    pub hoverinfo: &'static str,
    pub marker: Marker,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Marker {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Font {
    pub color: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

impl Font {
    fn plain() -> Self {
        Self { color: theme::FOREGROUND, size: None }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Title {
    pub text: String,
    pub font: Font,
}

impl Title {
    fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), font: Font::plain() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Axis {
    pub title: Title,
    pub linecolor: &'static str,
    pub gridcolor: &'static str,
    pub zeroline: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tickformat: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dtick: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<[String; 2]>,
}

impl Axis {
    fn new(title: &str) -> Self {
        Self {
            title: Title::new(title),
            linecolor: theme::FOREGROUND,
            gridcolor: theme::GRID,
            zeroline: false,
            tickformat: None,
            dtick: None,
            range: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Legend {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    pub font: Font,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    pub style: &'static str,
    pub center: LatLon,
    pub zoom: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    pub title: Title,
    pub paper_bgcolor: &'static str,
    pub plot_bgcolor: &'static str,
    pub font: Font,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Legend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hovermode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barmode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapbox: Option<MapView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl Layout {
    /// Dark background, white text, large title.
    fn dark(title: impl Into<String>) -> Self {
        let mut title = Title::new(title);
        title.font.size = Some(theme::TITLE_FONT_SIZE);
        Self {
            title,
            paper_bgcolor: theme::BACKGROUND,
            plot_bgcolor: theme::BACKGROUND,
            font: Font::plain(),
            xaxis: None,
            yaxis: None,
            legend: None,
            hovermode: None,
            barmode: None,
            mapbox: None,
            width: None,
            height: None,
        }
    }

    fn with_axes(mut self, x: &str, y: &str) -> Self {
        self.xaxis = Some(Axis::new(x));
        self.yaxis = Some(Axis::new(y));
        self
    }

    fn square(mut self) -> Self {
        self.width = Some(theme::SQUARE_FIGURE_PX);
        self.height = Some(theme::SQUARE_FIGURE_PX);
        self
    }

    fn with_legend(mut self, title: Option<&str>) -> Self {
        self.legend = Some(Legend {
            title: title.map(Title::new),
            font: Font::plain(),
        });
        self
    }
}

fn date_series(totals: &[DateTotals]) -> (Vec<String>, Vec<u64>, Vec<u64>) {
    let x = totals.iter().map(|t| t.date.format("%Y-%m-%d").to_string()).collect();
    let cases = totals.iter().map(|t| t.cases).collect();
    let deaths = totals.iter().map(|t| t.deaths).collect();
    (x, cases, deaths)
}

fn cases_and_deaths_lines(totals: &[DateTotals]) -> Vec<Trace> {
    let (x, cases, deaths) = date_series(totals);
    vec![
        Trace::Scatter(LineTrace {
            name: theme::CASES_LABEL.to_string(),
            x: x.clone(),
            y: cases,
            mode: "lines",
            line: LineStyle { color: theme::metric_color(Metric::Cases) },
        }),
        Trace::Scatter(LineTrace {
            name: theme::DEATHS_LABEL.to_string(),
            x,
            y: deaths,
            mode: "lines",
            line: LineStyle { color: theme::metric_color(Metric::Deaths) },
        }),
    ]
}

/// Nationwide cases and deaths per date, x axis pinned to the data's year span.
pub fn total_over_time(totals: &[DateTotals], span: YearRange) -> ChartSpec {
    let mut layout = Layout::dark("Dengue Cases and Deaths Over Time")
        .with_axes("Year", "Count")
        .with_legend(Some("Metric"));
    if let Some(x) = layout.xaxis.as_mut() {
        x.tickformat = Some("%Y");
        x.dtick = Some("M12");
        x.range = Some([format!("{}-01-01", span.lo), format!("{}-12-31", span.hi)]);
    }

    if totals.is_empty() {
        layout.title.text = NO_DATA.to_string();
        return ChartSpec::empty(layout);
    }

    layout.hovermode = Some("x unified");
    ChartSpec {
        data: cases_and_deaths_lines(totals),
        layout,
    }
}

pub fn island_pie(totals: &[(Island, u64)], metric: Metric) -> ChartSpec {
    let layout = Layout::dark(format!("Dengue {} per Island", metric)).square();
    if totals.is_empty() {
        let mut layout = layout;
        layout.title.text = NO_DATA.to_string();
        return ChartSpec::empty(layout);
    }

    ChartSpec {
        data: vec![Trace::Pie(PieTrace {
            labels: totals.iter().map(|(island, _)| island.to_string()).collect(),
            values: totals.iter().map(|(_, total)| *total).collect(),
            hole: 0.4,
            textinfo: "percent+label",
            sort: false,
            marker: PieMarker {
                colors: totals.iter().map(|(island, _)| theme::island_color(*island)).collect(),
            },
        })],
        layout,
    }
}

/// Region shading by the selected metric's stored totals, hospitals on top.
pub fn region_choropleth(
    regions: &[RegionGeometry],
    hospitals: &[HospitalPoint],
    metric: Metric,
) -> ChartSpec {
    let mut layout = Layout::dark(format!("Dengue {} by Region", metric))
        .square()
        .with_legend(None);
    layout.mapbox = Some(MapView {
        style: theme::MAP_STYLE,
        center: LatLon { lat: theme::MAP_CENTER.0, lon: theme::MAP_CENTER.1 },
        zoom: theme::MAP_ZOOM,
    });

    if regions.is_empty() {
        layout.title.text = NO_DATA.to_string();
        return ChartSpec::empty(layout);
    }

    // Feature ids are positions, so locations line up with z.
    let features = regions
        .iter()
        .enumerate()
        .map(|(i, region)| Feature {
            bbox: None,
            geometry: Some(Geometry::new(geojson::Value::from(&region.geometry))),
            id: Some(geojson::feature::Id::String(i.to_string())),
            properties: None,
            foreign_members: None,
        })
        .collect();

    let column = match metric {
        Metric::Cases => "Dengue_Cas",
        Metric::Deaths => "Dengue_Dea",
    };

    let mut data = vec![Trace::Choroplethmapbox(ChoroplethTrace {
        geojson: FeatureCollection { bbox: None, features, foreign_members: None },
        locations: (0..regions.len()).map(|i| i.to_string()).collect(),
        z: regions.iter().map(|r| metric.select(r.total_cases, r.total_deaths)).collect(),
        text: regions.iter().map(|r| r.region.clone()).collect(),
        hoverinfo: "text+z",
        colorscale: theme::CHOROPLETH_SCALE.to_vec(),
        colorbar: ColorBar { title: Title::new(column) },
        marker: Marker { opacity: Some(theme::MAP_OPACITY), ..Marker::default() },
    })];

    if !hospitals.is_empty() {
        data.push(Trace::Scattermapbox(PointTrace {
            name: "Hospitals and Clinics".to_string(),
            lat: hospitals.iter().map(|h| h.lat).collect(),
            lon: hospitals.iter().map(|h| h.lon).collect(),
            text: hospitals.iter().map(|h| h.name.clone()).collect(),
            mode: "markers",
            hoverinfo: "text",
            marker: Marker {
                color: Some(theme::BLUE),
                size: Some(theme::HOSPITAL_MARKER_SIZE),
                opacity: Some(theme::MAP_OPACITY),
            },
        }));
    }

    ChartSpec { data, layout }
}

/// `None` means the checklist is empty; `Some(&[])` means nothing matched.
pub fn region_year_stacked(groups: Option<&[RegionYearTotals]>) -> ChartSpec {
    let mut layout = Layout::dark("Cases and Deaths per Region and Year").with_axes("Region", "Count");
    layout.title.font.size = None;

    let groups = match groups {
        None => {
            layout.title.text = NO_REGION_SELECTED.to_string();
            return ChartSpec::empty(layout);
        }
        Some([]) => {
            layout.title.text = format!("{} for Selected Regions and Years", NO_DATA);
            return ChartSpec::empty(layout);
        }
        Some(groups) => groups,
    };

    let x: Vec<String> = groups.iter().map(|g| g.region.clone()).collect();
    let years: Vec<String> = groups.iter().map(|g| g.year.to_string()).collect();

    layout.barmode = Some("stack");
    layout.hovermode = Some("x unified");
    layout = layout.with_legend(None);

    ChartSpec {
        data: vec![
            Trace::Bar(BarTrace {
                name: "Dengue Cases (Excluding Deaths)".to_string(),
                x: x.clone(),
                y: groups.iter().map(|g| g.cases.saturating_sub(g.deaths)).collect(),
                text: years.clone(),
                marker: Marker { color: Some(theme::TEAL), ..Marker::default() },
            }),
            Trace::Bar(BarTrace {
                name: "Dengue Deaths".to_string(),
                x,
                y: groups.iter().map(|g| g.deaths).collect(),
                text: years,
                marker: Marker { color: Some(theme::YELLOW), ..Marker::default() },
            }),
        ],
        layout,
    }
}

/// `None` means no region is chosen in the dropdown.
pub fn specific_region(selection: Option<(&str, &[DateTotals])>) -> ChartSpec {
    let mut layout = Layout::dark("").with_axes("Date", "Number of Cases/Deaths");

    let (region, totals) = match selection {
        None => {
            layout.title.text = NO_REGION_SELECTED.to_string();
            layout.title.font.size = None;
            return ChartSpec::empty(layout);
        }
        Some((_, [])) => {
            layout.title.text = format!("{} for Selected Region and Years", NO_DATA);
            layout.title.font.size = None;
            return ChartSpec::empty(layout);
        }
        Some(selection) => selection,
    };

    layout.title.text = format!("Dengue Cases and Deaths Over Time in {}", region);
    layout.hovermode = Some("x unified");
    layout = layout.with_legend(Some("Metric"));

    ChartSpec {
        data: cases_and_deaths_lines(totals),
        layout,
    }
}

pub fn hospital_counts(counts: &[HospitalIslandCount]) -> ChartSpec {
    let mut layout = Layout::dark("Hospitals and Clinics per Island").with_axes("Island", "Hospital Count");
    if counts.is_empty() {
        layout.title.text = NO_DATA.to_string();
        return ChartSpec::empty(layout);
    }

    ChartSpec {
        data: counts
            .iter()
            .map(|c| {
                Trace::Bar(BarTrace {
                    name: c.island.to_string(),
                    x: vec![c.island.to_string()],
                    y: vec![c.hospital_count],
                    text: Vec::new(),
                    marker: Marker { color: Some(theme::island_color(c.island)), ..Marker::default() },
                })
            })
            .collect(),
        layout,
    }
}
