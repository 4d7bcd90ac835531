use serde::{Deserialize, Serialize};
use std::fmt;

/// Which figure the shared charts (pie and choropleth) display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Metric {
    #[default]
    Cases,
    Deaths,
}

impl Metric {
    pub fn name(self) -> &'static str {
        match self {
            Metric::Cases => "Cases",
            Metric::Deaths => "Deaths",
        }
    }

    /// Pick this metric's value out of a (cases, deaths) pair.
    pub fn select(self, cases: u64, deaths: u64) -> u64 {
        match self {
            Metric::Cases => cases,
            Metric::Deaths => deaths,
        }
    }

    /// Toggle transition driven by the cumulative click totals of the two
    /// buttons.
    ///
    /// Whichever button has the strictly larger total wins; a tie keeps the
    /// current selection. Because totals never decrease, once one side is
    /// ahead the other has to overtake it before the selection moves back.
    pub fn next(cases_clicks: u64, deaths_clicks: u64, current: Metric) -> Metric {
        if cases_clicks > deaths_clicks && current != Metric::Cases {
            Metric::Cases
        } else if deaths_clicks > cases_clicks && current != Metric::Deaths {
            Metric::Deaths
        } else {
            current
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    Cases,
    Deaths,
}

/// Click counters plus the selection they drive, one per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetricToggle {
    pub cases_clicks: u64,
    pub deaths_clicks: u64,
    pub selection: Metric,
}

impl MetricToggle {
    pub fn click(&mut self, button: Button) -> Metric {
        match button {
            Button::Cases => self.cases_clicks += 1,
            Button::Deaths => self.deaths_clicks += 1,
        }
        self.selection = Metric::next(self.cases_clicks, self.deaths_clicks, self.selection);
        self.selection
    }
}
