//! Fixed colour and label tables shared by every chart.

use crate::metric::Metric;
use crate::types::Island;

pub const BACKGROUND: &str = "#1D2419";
pub const FOREGROUND: &str = "#FFFFFF";
pub const GRID: &str = "#19647E";

pub const TEAL: &str = "#28AFB0";
pub const YELLOW: &str = "#F4D35E";
pub const ORANGE: &str = "#EE964B";
pub const BLUE: &str = "#19647E";

pub const TITLE_FONT_SIZE: u32 = 20;
pub const SQUARE_FIGURE_PX: u32 = 600;

/// White to orange, low to high.
pub const CHOROPLETH_SCALE: [(f64, &str); 2] = [(0.0, FOREGROUND), (1.0, ORANGE)];
pub const MAP_STYLE: &str = "carto-darkmatter";
pub const MAP_CENTER: (f64, f64) = (12.8797, 121.7740); // lat, lon
pub const MAP_ZOOM: f64 = 4.0;
pub const MAP_OPACITY: f64 = 0.7;
pub const HOSPITAL_MARKER_SIZE: f64 = 5.0;

pub const CASES_LABEL: &str = "Dengue_Cases";
pub const DEATHS_LABEL: &str = "Dengue_Deaths";

pub fn metric_color(metric: Metric) -> &'static str {
    match metric {
        Metric::Cases => TEAL,
        Metric::Deaths => YELLOW,
    }
}

pub fn island_color(island: Island) -> &'static str {
    match island {
        Island::Luzon => TEAL,
        Island::Visayas => YELLOW,
        Island::Mindanao => ORANGE,
    }
}

/// Card colours for the summary row: total cases, total deaths,
/// average cases, average deaths.
pub const CARD_COLORS: [&str; 4] = [BLUE, ORANGE, TEAL, YELLOW];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_islands_have_distinct_colors() {
        let colors: Vec<_> = Island::ALL.iter().map(|i| island_color(*i)).collect();
        assert_eq!(colors, [TEAL, YELLOW, ORANGE]);
    }

    #[test]
    fn test_metric_colors_match_line_series() {
        assert_eq!(metric_color(Metric::Cases), TEAL);
        assert_eq!(metric_color(Metric::Deaths), YELLOW);
    }
}
