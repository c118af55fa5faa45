//! Departure retrieval for a single stop.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, trace};

use super::base::{ElementParser, Paginator};
use super::error::RetrieveError;
use super::stop::{STOPS_ENDPOINT, is_boarding_stop};
use crate::clock::TimeRetriever;
use crate::domain::{Departure, DepartureList, RouteList, Stop};
use crate::transitland::{ApiCaller, FieldFilter};

/// Nesting depth of a filtered departures page.
pub const DEPARTURES_NESTING_LIMIT: usize = 20;

const DEPARTURES_STOPS_KEY: &str = "stops";

/// Largest accepted `timestamp_cutoff_secs`: one day.
pub const MAX_TIMESTAMP_CUTOFF_SECS: i64 = 86_400;

/// How many departures to ask for and how far ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepartureConfig {
    /// Departures requested per stop; also the capacity of the zone-level list
    pub departure_limit: usize,
    /// Look-ahead window in seconds
    pub next_n_seconds: u64,
    /// Departures this many seconds in the past are still kept
    pub timestamp_cutoff_secs: i64,
}

impl Default for DepartureConfig {
    fn default() -> Self {
        Self {
            departure_limit: 7,
            next_n_seconds: 6000,
            timestamp_cutoff_secs: 60,
        }
    }
}

/// Build the departures query for one stop.
pub fn departures_endpoint(stop: &Stop, config: &DepartureConfig) -> String {
    format!(
        "{STOPS_ENDPOINT}/{}/departures?limit={}&next={}&include_alerts=true&use_service_window=false",
        stop.onestop_id, config.departure_limit, config.next_n_seconds
    )
}

/// Fields kept from each departures page.
pub fn departures_filter() -> FieldFilter {
    FieldFilter::new(json!({
        "meta": { "next": true },
        "stops": [{
            "location_type": true,
            "departures": [{
                "schedule_relationship": true,
                "stop_headsign": true,
                "departure": {
                    "estimated_utc": true,
                    "estimated_delay": true,
                    "scheduled_utc": true,
                },
                "trip": {
                    "schedule_relationship": true,
                    "trip_headsign": true,
                    "route": {
                        "onestop_id": true,
                        "agency": { "onestop_id": true },
                    },
                },
            }],
        }],
    }))
}

fn present<'v>(value: Option<&'v Value>) -> Option<&'v Value> {
    value.filter(|v| !v.is_null())
}

/// Schedule relationship of a departure, preferring the stop-time value
/// over the trip-level one.
fn schedule_relationship(dep: &Value) -> Option<&str> {
    present(dep.get("schedule_relationship"))
        .or_else(|| present(dep.pointer("/trip/schedule_relationship")))
        .map(|v| v.as_str().unwrap_or_default())
}

/// Retrieves departures from one stop, keeping only routes already known.
#[derive(Debug)]
pub struct DepartureRetriever<'a> {
    stop: Stop,
    routes: &'a RouteList,
    clock: &'a TimeRetriever,
    config: DepartureConfig,
    endpoint: String,
    departures: DepartureList,
}

impl<'a> DepartureRetriever<'a> {
    pub fn new(
        stop: Stop,
        routes: &'a RouteList,
        clock: &'a TimeRetriever,
        config: DepartureConfig,
    ) -> Self {
        Self {
            endpoint: departures_endpoint(&stop, &config),
            stop,
            routes,
            clock,
            config,
            departures: DepartureList::unbounded(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn stop(&self) -> &Stop {
        &self.stop
    }

    pub fn departures(&self) -> &DepartureList {
        &self.departures
    }

    pub fn into_departures(self) -> DepartureList {
        self.departures
    }

    /// Clear the departure list and fill it from the API.
    pub async fn retrieve<C: ApiCaller>(
        &mut self,
        pages: &Paginator<'_, C>,
    ) -> Result<(), RetrieveError> {
        self.departures.clear();
        let endpoint = self.endpoint.clone();
        let count = pages.run(&endpoint, &departures_filter(), self).await?;
        debug!(
            stop = %self.stop.onestop_id,
            pages = count,
            departures = self.departures.len(),
            "departures retrieved"
        );
        Ok(())
    }

    fn parse_departure(&self, dep: &Value) -> Option<Departure> {
        let is_real_time = match schedule_relationship(dep) {
            None | Some("STATIC" | "NO_DATA") => false,
            Some(relationship @ ("DELETED" | "SKIPPED" | "CANCELED")) => {
                trace!(stop = %self.stop.onestop_id, relationship, "departure not running");
                return None;
            }
            Some(_) => true,
        };

        let direction = present(dep.pointer("/trip/trip_headsign"))
            .or_else(|| present(dep.get("stop_headsign")))?
            .as_str()?;

        let route_id = dep.pointer("/trip/route/onestop_id").and_then(Value::as_str)?;
        let Some(route) = self.routes.get(route_id) else {
            trace!(route = route_id, "departure for unknown route");
            return None;
        };
        let agency = dep
            .pointer("/trip/route/agency/onestop_id")
            .and_then(Value::as_str)?;

        let (expected, actual, delay_secs, is_real_time) =
            self.resolve_times(present(dep.get("departure"))?, is_real_time)?;

        let cutoff = self.clock.now() - Duration::seconds(self.config.timestamp_cutoff_secs);
        if actual < cutoff {
            trace!(stop = %self.stop.onestop_id, %actual, "departure already gone");
            return None;
        }

        Some(Departure {
            route: route.clone(),
            stop: self.stop.clone(),
            direction: direction.to_string(),
            expected,
            actual,
            is_real_time,
            agency_onestop_id: agency.to_string(),
            delay_secs,
            is_valid: true,
        })
    }

    /// Returns `(expected, actual, delay_secs, is_real_time)`.
    fn resolve_times(
        &self,
        info: &Value,
        is_real_time: bool,
    ) -> Option<(DateTime<Utc>, DateTime<Utc>, i64, bool)> {
        let scheduled = info.get("scheduled_utc").and_then(Value::as_str);
        let estimated = info
            .get("estimated_utc")
            .and_then(Value::as_str)
            .filter(|_| is_real_time);

        let Some(estimated) = estimated else {
            let at = self.parse_time(scheduled?)?;
            return Some((at, at, 0, false));
        };

        let actual = self.parse_time(estimated)?;
        let expected = match scheduled {
            Some(s) => self.parse_time(s)?,
            None => actual,
        };
        let delay = info
            .get("estimated_delay")
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
            .unwrap_or_else(|| (actual - expected).num_seconds());

        Some((expected, actual, delay, true))
    }

    fn parse_time(&self, s: &str) -> Option<DateTime<Utc>> {
        self.clock
            .parse_utc(s)
            .inspect_err(|e| debug!(stop = %self.stop.onestop_id, error = %e, "skipping departure"))
            .ok()
    }
}

impl ElementParser for DepartureRetriever<'_> {
    const ARRAY_KEY: &'static str = DEPARTURES_STOPS_KEY;
    const NESTING_LIMIT: usize = DEPARTURES_NESTING_LIMIT;

    fn parse_element(&mut self, element: &Value) {
        if !is_boarding_stop(element) {
            return;
        }
        let Some(departures) = element.get("departures").and_then(Value::as_array) else {
            return;
        };

        for dep in departures {
            if !dep.is_object() || present(dep.get("trip")).is_none() {
                continue;
            }
            if let Some(departure) = self.parse_departure(dep) {
                self.departures.add_departure(departure);
            }
        }
    }
}
