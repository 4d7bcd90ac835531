//! Which control feeds which chart, and recomputation of the affected charts
//! from the loaded tables.

use crate::config::ProcessingConfig;
use crate::metric::{Button, Metric, MetricToggle};
use crate::processing::{self, YearRange};
use crate::render::{self, ChartSpec};
use crate::types::Dataset;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartId {
    TotalOverTime,
    IslandPie,
    RegionChoropleth,
    RegionYearStacked,
    SpecificRegion,
    HospitalCounts,
}

impl ChartId {
    pub const ALL: [ChartId; 6] = [
        ChartId::TotalOverTime,
        ChartId::IslandPie,
        ChartId::RegionChoropleth,
        ChartId::RegionYearStacked,
        ChartId::SpecificRegion,
        ChartId::HospitalCounts,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            ChartId::TotalOverTime => "total_over_time",
            ChartId::IslandPie => "island_pie",
            ChartId::RegionChoropleth => "region_choropleth",
            ChartId::RegionYearStacked => "region_year_stacked",
            ChartId::SpecificRegion => "specific_region",
            ChartId::HospitalCounts => "hospital_counts",
        }
    }

    pub fn from_slug(slug: &str) -> Option<ChartId> {
        ChartId::ALL.into_iter().find(|id| id.slug() == slug)
    }
}

/// Inputs on the page that can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    CasesButton,
    DeathsButton,
    RegionChecklist,
    ChecklistYears,
    RegionDropdown,
    DropdownYears,
    RefreshTimer,
}

/// Charts to recompute when `control` changes.
pub fn dependents(control: Control) -> &'static [ChartId] {
    match control {
        // both buttons only move the metric; the metric drives these two
        Control::CasesButton | Control::DeathsButton => {
            &[ChartId::IslandPie, ChartId::RegionChoropleth]
        }
        Control::RegionChecklist | Control::ChecklistYears => &[ChartId::RegionYearStacked],
        Control::RegionDropdown | Control::DropdownYears => &[ChartId::SpecificRegion],
        Control::RefreshTimer => &[ChartId::HospitalCounts],
    }
}

/// Every control value on the page. Held by the client and sent with each
/// update, so no session state lives on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Controls {
    pub cases_clicks: u64,
    pub deaths_clicks: u64,
    pub metric: Metric,
    pub checklist_regions: Vec<String>,
    pub checklist_years: (i32, i32),
    pub dropdown_region: Option<String>,
    pub dropdown_years: (i32, i32),
}

impl Controls {
    pub fn initial(settings: &ProcessingConfig) -> Self {
        let years = (settings.year_min, settings.year_max);
        Self {
            cases_clicks: 0,
            deaths_clicks: 0,
            metric: Metric::default(),
            checklist_regions: Vec::new(),
            checklist_years: years,
            dropdown_region: None,
            dropdown_years: years,
        }
    }
}

impl Controls {
    /// Register one click on a metric button; returns the control that changed.
    pub fn press(&mut self, button: Button) -> Control {
        let mut toggle = MetricToggle {
            cases_clicks: self.cases_clicks,
            deaths_clicks: self.deaths_clicks,
            selection: self.metric,
        };
        self.metric = toggle.click(button);
        self.cases_clicks = toggle.cases_clicks;
        self.deaths_clicks = toggle.deaths_clicks;
        match button {
            Button::Cases => Control::CasesButton,
            Button::Deaths => Control::DeathsButton,
        }
    }
}

impl Default for Controls {
    fn default() -> Self {
        Self::initial(&ProcessingConfig::default())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Update {
    pub metric: Metric,
    pub controls: Controls,
    pub charts: BTreeMap<ChartId, ChartSpec>,
}

/// Apply the metric toggle, then rebuild the charts downstream of `changed`.
/// `None` rebuilds everything (first paint).
pub fn update(
    dataset: &Dataset,
    settings: &ProcessingConfig,
    controls: &Controls,
    changed: Option<Control>,
) -> Update {
    let metric = Metric::next(controls.cases_clicks, controls.deaths_clicks, controls.metric);
    let controls = Controls { metric, ..controls.clone() };

    let targets: &[ChartId] = match changed {
        Some(control) => dependents(control),
        None => &ChartId::ALL,
    };

    let charts = targets
        .iter()
        .map(|id| (*id, build_chart(dataset, settings, &controls, *id)))
        .collect();

    Update { metric, controls, charts }
}

/// Build one chart from scratch for the given control values.
pub fn build_chart(
    dataset: &Dataset,
    settings: &ProcessingConfig,
    controls: &Controls,
    id: ChartId,
) -> ChartSpec {
    let chart = match id {
        ChartId::TotalOverTime => {
            let totals = processing::totals_by_date(&dataset.cases);
            render::total_over_time(
                &totals,
                YearRange::new(settings.year_min, settings.year_max),
            )
        }
        ChartId::IslandPie => {
            let totals = processing::totals_by_island(&dataset.cases, controls.metric);
            render::island_pie(&totals, controls.metric)
        }
        ChartId::RegionChoropleth => {
            render::region_choropleth(&dataset.regions, &dataset.hospitals, controls.metric)
        }
        ChartId::RegionYearStacked => {
            if controls.checklist_regions.is_empty() {
                render::region_year_stacked(None)
            } else {
                let (lo, hi) = controls.checklist_years;
                let subset = processing::filter_by_regions_and_years(
                    &dataset.cases,
                    controls.checklist_regions.as_slice(),
                    YearRange::new(lo, hi),
                );
                let groups = processing::group_by_region_year(&subset);
                render::region_year_stacked(Some(groups.as_slice()))
            }
        }
        ChartId::SpecificRegion => {
            match controls.dropdown_region.as_deref() {
                Some(region) if !region.is_empty() => {
                    let (lo, hi) = controls.dropdown_years;
                    let subset =
                        processing::filter_by_region(&dataset.cases, region, YearRange::new(lo, hi));
                    let totals = processing::totals_by_date(subset);
                    render::specific_region(Some((region, totals.as_slice())))
                }
                _ => render::specific_region(None),
            }
        }
        ChartId::HospitalCounts => render::hospital_counts(&dataset.hospital_counts),
    };
    if chart.is_empty() {
        debug!("Chart {} in empty state: {}", id.slug(), chart.title());
    } else {
        debug!("Recomputed chart {} ({} traces)", id.slug(), chart.data.len());
    }
    chart
}
