//! Stop retrieval around a point.

use serde_json::{Value, json};
use tracing::debug;

use super::base::{ElementParser, Paginator};
use super::error::RetrieveError;
use crate::domain::{Stop, StopList, Whitelist};
use crate::transitland::{ApiCaller, FieldFilter};

/// REST path of the stops endpoint.
pub const STOPS_ENDPOINT: &str = "/api/v2/rest/stops";

/// `location_type` of a boarding stop or platform.
pub const LOCATION_TYPE_STOP: i64 = 0;

const STOPS_KEY: &str = "stops";

/// Build the stops query for a circle around `(lat, lon)`.
///
/// An active whitelist restricts results server-side via
/// `served_by_onestop_ids`.
pub fn stops_endpoint(lat: f64, lon: f64, radius: f64, whitelist: &Whitelist) -> String {
    let mut endpoint = format!("{STOPS_ENDPOINT}?lat={lat:.6}&lon={lon:.6}&radius={radius:.6}");
    if whitelist.is_active() {
        endpoint.push_str("&served_by_onestop_ids=");
        endpoint.push_str(&whitelist.query_value());
    }
    endpoint
}

/// Fields kept from each stops page.
pub fn stops_filter() -> FieldFilter {
    FieldFilter::new(json!({
        "meta": { "next": true },
        "stops": [{
            "stop_name": true,
            "onestop_id": true,
            "location_type": true,
        }],
    }))
}

/// Whether a stop element is a boarding stop rather than an entrance,
/// generic node or parent station.
pub fn is_boarding_stop(element: &Value) -> bool {
    element.get("location_type").and_then(Value::as_i64) == Some(LOCATION_TYPE_STOP)
}

/// Retrieves the boarding stops of a zone into a [`StopList`].
#[derive(Debug, Clone)]
pub struct StopRetriever {
    lat: f64,
    lon: f64,
    radius: f64,
    whitelist: Whitelist,
    endpoint: String,
    stops: StopList,
}

impl StopRetriever {
    pub fn new(lat: f64, lon: f64, radius: f64, whitelist: Whitelist) -> Self {
        Self {
            endpoint: stops_endpoint(lat, lon, radius, &whitelist),
            lat,
            lon,
            radius,
            whitelist,
            stops: StopList::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    /// Replace the whitelist and rebuild the endpoint to match.
    pub fn set_whitelist(&mut self, whitelist: Whitelist) {
        self.endpoint = stops_endpoint(self.lat, self.lon, self.radius, &whitelist);
        self.whitelist = whitelist;
    }

    pub fn stops(&self) -> &StopList {
        &self.stops
    }

    pub fn into_stops(self) -> StopList {
        self.stops
    }

    /// Clear the stop list and fill it from the API.
    pub async fn retrieve<C: ApiCaller>(
        &mut self,
        pages: &Paginator<'_, C>,
    ) -> Result<(), RetrieveError> {
        self.stops.clear();
        let endpoint = self.endpoint.clone();
        let count = pages.run(&endpoint, &stops_filter(), self).await?;
        debug!(pages = count, stops = self.stops.len(), "stops retrieved");
        Ok(())
    }
}

impl ElementParser for StopRetriever {
    const ARRAY_KEY: &'static str = STOPS_KEY;

    fn parse_element(&mut self, element: &Value) {
        if !is_boarding_stop(element) {
            return;
        }
        let Some(onestop_id) = element.get("onestop_id").and_then(Value::as_str) else {
            return;
        };
        let name = element
            .get("stop_name")
            .and_then(Value::as_str)
            .unwrap_or_default();

        self.stops.add_stop(Stop::new(onestop_id, name));
    }
}
