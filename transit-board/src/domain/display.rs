//! Presentation projections of routes and departures.
//!
//! Everything here is a pure function of domain values; cosmetic rules
//! (direction merging, colour fallbacks) stay on this side of the
//! projection and never feed back into retrieval.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::departure::Departure;
use super::route::Route;
use super::time::minutes_until;

/// White, used as the fallback text colour.
pub const COLOR_WHITE: u32 = 0xFFFFFF;

/// A route as shown in the route legend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRoute {
    pub onestop_id: String,
    pub name: String,
    pub line_color: u32,
    pub text_color: u32,
    pub agency_onestop_id: String,
}

impl From<&Route> for DisplayRoute {
    fn from(route: &Route) -> Self {
        Self {
            onestop_id: route.onestop_id.clone(),
            name: route.name.clone(),
            line_color: route.line_color,
            text_color: route.text_color,
            agency_onestop_id: route.agency_onestop_id.clone(),
        }
    }
}

/// One row of the departure board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayDeparture {
    pub agency_onestop_id: String,
    /// Headsign
    pub direction: String,
    /// Route name
    pub line: String,
    /// Whole minutes until departure, never negative
    pub mins: i64,
    pub text_color: u32,
    pub route_color: u32,
    pub delay_color: u32,
}

/// Colour thresholds for the delay indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayColors {
    pub on_time: u32,
    pub delayed: u32,
    pub early: u32,
    pub no_real_time: u32,
    /// Delays within +/- this many seconds count as on time
    pub cutoff_secs: i64,
}

impl Default for DelayColors {
    fn default() -> Self {
        Self {
            on_time: 0x00FF00,
            delayed: 0xFF0000,
            early: 0xFFFF00,
            no_real_time: COLOR_WHITE,
            cutoff_secs: 60,
        }
    }
}

impl DelayColors {
    /// Colour for a departure with the given real-time status and delay.
    pub fn color_for(&self, is_real_time: bool, delay_secs: i64) -> u32 {
        if !is_real_time {
            self.no_real_time
        } else if delay_secs > self.cutoff_secs {
            self.delayed
        } else if delay_secs < -self.cutoff_secs {
            self.early
        } else {
            self.on_time
        }
    }
}

impl DisplayDeparture {
    /// Project a departure relative to `now`.
    pub fn project(departure: &Departure, now: DateTime<Utc>, colors: &DelayColors) -> Self {
        Self {
            agency_onestop_id: departure.agency_onestop_id.clone(),
            direction: departure.direction.clone(),
            line: departure.route.name.clone(),
            mins: minutes_until(departure.actual, now),
            text_color: departure.route.text_color,
            route_color: departure.route.line_color,
            delay_color: colors.color_for(departure.is_real_time, departure.delay_secs),
        }
    }
}

/// Strip a trailing `-N`, `-S`, `-E` or `-W` direction suffix.
///
/// ```
/// use transit_board::domain::strip_direction;
///
/// assert_eq!(strip_direction("J-N"), "J");
/// assert_eq!(strip_direction("Red-Express"), "Red-Express");
/// assert_eq!(strip_direction("F"), "F");
/// ```
pub fn strip_direction(name: &str) -> &str {
    match name.rsplit_once('-') {
        Some((base, "N" | "S" | "E" | "W")) => base,
        _ => name,
    }
}

/// Merge per-direction variants of the same line into one entry.
///
/// Names lose their direction suffix and the result is de-duplicated by
/// `(agency, name)`, keeping the first route seen for each key. Output is
/// sorted by agency then name.
pub fn combine_directions(routes: &[DisplayRoute]) -> Vec<DisplayRoute> {
    let mut unique: BTreeMap<(String, String), DisplayRoute> = BTreeMap::new();
    for route in routes {
        let name = strip_direction(&route.name).to_string();
        unique
            .entry((route.agency_onestop_id.clone(), name.clone()))
            .or_insert_with(|| DisplayRoute {
                name,
                ..route.clone()
            });
    }
    unique.into_values().collect()
}

/// Give routes published without any colour a readable text colour.
pub fn apply_color_fallback(routes: &mut [DisplayRoute]) {
    for route in routes {
        if route.line_color == 0 && route.text_color == 0 {
            route.text_color = COLOR_WHITE;
        }
    }
}

/// Format a colour as a CSS hex string.
pub fn css_color(color: u32) -> String {
    format!("#{:06X}", color & 0xFF_FFFF)
}
