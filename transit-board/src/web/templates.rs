//! Askama templates for the web frontend.

use askama::Template;

use crate::config::ZoneConfig;
use crate::domain::{DisplayDeparture, DisplayRoute, css_color};
use crate::manager::{BoardPhase, BoardSnapshot};

/// Departures this far out are not drawn.
pub const MAX_DISPLAY_MINS: i64 = 100;

/// Seconds between page reloads.
pub const PAGE_REFRESH_SECS: u64 = 15;

// ============================================================================
// Page Templates
// ============================================================================

/// The departure board.
#[derive(Template)]
#[template(path = "board.html")]
pub struct BoardTemplate {
    pub zone: String,
    pub zones: Vec<ZoneLink>,
    pub loading: bool,
    pub error: Option<String>,
    pub departures: Vec<DepartureView>,
    pub routes: Vec<RouteView>,
    pub faults: Vec<&'static str>,
    pub updated_at: String,
    pub refresh_secs: u64,
}

impl BoardTemplate {
    pub fn new(snapshot: &BoardSnapshot, zones: &[ZoneConfig], current: usize) -> Self {
        let i = snapshot.indicators;
        let faults = [
            (i.route_fault, "routes"),
            (i.stop_fault, "stops"),
            (i.departure_fault, "departures"),
            (i.rate_limited, "rate limited"),
        ]
        .into_iter()
        .filter_map(|(raised, label)| raised.then_some(label))
        .collect();

        Self {
            zone: snapshot.zone.clone(),
            zones: zones
                .iter()
                .enumerate()
                .map(|(index, z)| ZoneLink {
                    index,
                    name: z.name.clone(),
                    active: index == current,
                })
                .collect(),
            loading: snapshot.phase == BoardPhase::Loading,
            error: snapshot.error.clone(),
            departures: visible_departures(&snapshot.departures),
            routes: snapshot.routes.iter().map(RouteView::from_route).collect(),
            faults,
            updated_at: snapshot.updated_at.clone().unwrap_or_default(),
            refresh_secs: PAGE_REFRESH_SECS,
        }
    }
}

// ============================================================================
// View Models (for templates)
// ============================================================================

/// A zone in the switcher.
#[derive(Debug, Clone)]
pub struct ZoneLink {
    pub index: usize,
    pub name: String,
    pub active: bool,
}

/// One departure row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartureView {
    pub line: String,
    pub direction: String,
    pub mins_text: String,
    pub route_color: String,
    pub text_color: String,
    pub delay_color: String,
}

impl DepartureView {
    pub fn from_departure(dep: &DisplayDeparture) -> Self {
        Self {
            line: dep.line.clone(),
            direction: dep.direction.clone(),
            mins_text: mins_text(dep.mins),
            route_color: css_color(dep.route_color),
            text_color: css_color(dep.text_color),
            delay_color: css_color(dep.delay_color),
        }
    }
}

/// A route in the legend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteView {
    pub name: String,
    pub line_color: String,
    pub text_color: String,
}

impl RouteView {
    pub fn from_route(route: &DisplayRoute) -> Self {
        Self {
            name: route.name.clone(),
            line_color: css_color(route.line_color),
            text_color: css_color(route.text_color),
        }
    }
}

/// Rows to draw, stopping at the first departure [`MAX_DISPLAY_MINS`] out.
pub fn visible_departures(departures: &[DisplayDeparture]) -> Vec<DepartureView> {
    departures
        .iter()
        .take_while(|d| d.mins < MAX_DISPLAY_MINS)
        .map(DepartureView::from_departure)
        .collect()
}

/// "Now" for departures due or past, otherwise "N min".
pub fn mins_text(mins: i64) -> String {
    if mins <= 0 {
        "Now".to_string()
    } else {
        format!("{mins} min")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieve::IndicatorStatus;

    fn departure(line: &str, mins: i64) -> DisplayDeparture {
        DisplayDeparture {
            agency_onestop_id: "o-a".into(),
            direction: "Downtown".into(),
            line: line.into(),
            mins,
            text_color: 0xFFFFFF,
            route_color: 0x0039A6,
            delay_color: 0x00FF00,
        }
    }

    fn snapshot(departures: Vec<DisplayDeparture>) -> BoardSnapshot {
        BoardSnapshot {
            departures,
            phase: BoardPhase::Ready,
            ..BoardSnapshot::loading("Montgomery")
        }
    }

    #[test]
    fn minutes_text() {
        assert_eq!(mins_text(-1), "Now");
        assert_eq!(mins_text(0), "Now");
        assert_eq!(mins_text(1), "1 min");
        assert_eq!(mins_text(42), "42 min");
    }

    #[test]
    fn departure_view_colors() {
        let view = DepartureView::from_departure(&departure("N", 4));
        assert_eq!(view.route_color, "#0039A6");
        assert_eq!(view.text_color, "#FFFFFF");
        assert_eq!(view.delay_color, "#00FF00");
        assert_eq!(view.mins_text, "4 min");
    }

    #[test]
    fn far_departures_hidden() {
        let views = visible_departures(&[
            departure("A", 5),
            departure("B", 99),
            departure("C", 100),
            departure("D", 3),
        ]);
        let lines: Vec<_> = views.iter().map(|v| v.line.as_str()).collect();
        assert_eq!(lines, vec!["A", "B"]);
    }

    #[test]
    fn renders_rows() {
        let zones = vec![
            ZoneConfig::new("Montgomery", 37.78, -122.40, 100.0),
            ZoneConfig::new("Powell", 37.78, -122.41, 100.0),
        ];
        let template = BoardTemplate::new(&snapshot(vec![departure("J", 0)]), &zones, 0);
        let html = template.render().unwrap();

        assert!(html.contains("Montgomery"));
        assert!(html.contains("Powell"));
        assert!(html.contains("Now"));
        assert!(html.contains("#0039A6"));
        assert!(!html.contains("No departures found"));
    }

    #[test]
    fn renders_empty_board() {
        let zones = vec![ZoneConfig::new("Montgomery", 37.78, -122.40, 100.0)];
        let html = BoardTemplate::new(&snapshot(vec![]), &zones, 0)
            .render()
            .unwrap();
        assert!(html.contains("No departures found"));
    }

    #[test]
    fn renders_loading_and_faults() {
        let zones = vec![ZoneConfig::new("Montgomery", 37.78, -122.40, 100.0)];
        let mut snap = BoardSnapshot::loading("Montgomery");
        snap.indicators = IndicatorStatus {
            rate_limited: true,
            ..IndicatorStatus::default()
        };
        let template = BoardTemplate::new(&snap, &zones, 0);
        assert!(template.loading);
        assert_eq!(template.faults, vec!["rate limited"]);

        let html = template.render().unwrap();
        assert!(html.contains("Loading"));
        assert!(html.contains("rate limited"));
    }
}
