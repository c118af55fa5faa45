//! Zone-wide departure aggregation across stops.

use tracing::{debug, warn};

use super::base::Paginator;
use super::departure::{DepartureConfig, DepartureRetriever};
use super::error::RetrieveError;
use crate::clock::TimeRetriever;
use crate::domain::{DepartureList, RouteList, Stop, StopList};
use crate::transitland::ApiCaller;

/// Result of one refresh over every stop.
///
/// A failed stop does not discard the departures gathered from the others.
#[derive(Debug, Default)]
pub struct RefreshOutcome {
    pub stops_attempted: usize,
    /// Stops whose retrieval failed, with the reason
    pub failures: Vec<(Stop, RetrieveError)>,
}

impl RefreshOutcome {
    /// True when every stop was retrieved.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_stops(&self) -> impl Iterator<Item = &Stop> {
        self.failures.iter().map(|(stop, _)| stop)
    }
}

/// Runs one [`DepartureRetriever`] per stop and merges the results.
#[derive(Debug, Clone)]
pub struct DepartureListRetriever {
    config: DepartureConfig,
    routes: RouteList,
    stops: Vec<Stop>,
    departures: DepartureList,
}

impl DepartureListRetriever {
    /// The merged list is bounded to `config.departure_limit`.
    pub fn new(config: DepartureConfig) -> Self {
        Self {
            config,
            routes: RouteList::new(),
            stops: Vec::new(),
            departures: DepartureList::bounded(config.departure_limit),
        }
    }

    /// Take the route and stop snapshots used by every later refresh.
    pub fn init(&mut self, routes: RouteList, stops: &StopList) {
        let mut stops = stops.all_stops();
        stops.sort_by(|a, b| a.onestop_id.cmp(&b.onestop_id));
        self.routes = routes;
        self.stops = stops;
    }

    pub fn config(&self) -> &DepartureConfig {
        &self.config
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn departures(&self) -> &DepartureList {
        &self.departures
    }

    pub fn clear(&mut self) {
        self.departures.clear();
    }

    /// Rebuild the merged list from every stop, in stop order.
    pub async fn retrieve<C: ApiCaller>(
        &mut self,
        pages: &Paginator<'_, C>,
        clock: &TimeRetriever,
    ) -> RefreshOutcome {
        self.departures.clear();
        let mut outcome = RefreshOutcome {
            stops_attempted: self.stops.len(),
            failures: Vec::new(),
        };

        for stop in &self.stops {
            let mut retriever = DepartureRetriever::new(stop.clone(), &self.routes, clock, self.config);
            match retriever.retrieve(pages).await {
                Ok(()) => self.departures.concat(retriever.departures()),
                Err(e) => {
                    warn!(stop = %stop.onestop_id, error = %e, "departure retrieval failed for stop");
                    outcome.failures.push((stop.clone(), e));
                }
            }
        }

        debug!(
            stops = outcome.stops_attempted,
            failed = outcome.failures.len(),
            departures = self.departures.len(),
            "departure refresh finished"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Route;
    use crate::retrieve::{PageConfig, departures_endpoint};
    use crate::transitland::{ApiError, ScriptedCaller};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::{Value, json};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()
    }

    fn dep(offset: i64, headsign: &str) -> Value {
        json!({
            "departure": {
                "scheduled_utc": (now() + Duration::seconds(offset)).format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            },
            "trip": {
                "trip_headsign": headsign,
                "route": { "onestop_id": "r-1", "agency": { "onestop_id": "o-a" } },
            },
        })
    }

    fn page(departures: Vec<Value>) -> Value {
        json!({ "stops": [{ "location_type": 0, "departures": departures }] })
    }

    fn setup(limit: usize) -> (DepartureListRetriever, Vec<Stop>) {
        let mut routes = RouteList::new();
        routes.add_route(Route {
            onestop_id: "r-1".into(),
            name: "1".into(),
            agency_onestop_id: "o-a".into(),
            ..Route::default()
        });
        let mut stops = StopList::new();
        let a = Stop::new("s-a", "A");
        let b = Stop::new("s-b", "B");
        stops.add_stop(a.clone());
        stops.add_stop(b.clone());

        let config = DepartureConfig {
            departure_limit: limit,
            ..DepartureConfig::default()
        };
        let mut retriever = DepartureListRetriever::new(config);
        retriever.init(routes, &stops);
        (retriever, vec![a, b])
    }

    #[tokio::test(start_paused = true)]
    async fn merges_stops_in_time_order() {
        let (mut retriever, stops) = setup(7);
        let config = *retriever.config();
        let caller = ScriptedCaller::new();
        caller
            .respond(
                departures_endpoint(&stops[0], &config),
                page(vec![dep(600, "a-late"), dep(60, "a-soon")]),
            )
            .respond(
                departures_endpoint(&stops[1], &config),
                page(vec![dep(300, "b-mid")]),
            );

        let page_config = PageConfig::default();
        let clock = TimeRetriever::starting_at(now());
        let outcome = retriever
            .retrieve(&Paginator::new(&caller, &page_config), &clock)
            .await;

        assert!(outcome.is_complete());
        assert_eq!(outcome.stops_attempted, 2);
        let order: Vec<_> = retriever
            .departures()
            .departures()
            .map(|d| d.direction.as_str())
            .collect();
        assert_eq!(order, vec!["a-soon", "b-mid", "a-late"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_stop_keeps_other_results() {
        let (mut retriever, stops) = setup(7);
        let config = *retriever.config();
        let caller = ScriptedCaller::new();
        caller
            .enqueue(
                departures_endpoint(&stops[0], &config),
                Err(ApiError::Http {
                    status: 502,
                    message: "bad gateway".into(),
                }),
            )
            .respond(
                departures_endpoint(&stops[1], &config),
                page(vec![dep(300, "b")]),
            );

        let page_config = PageConfig::default();
        let clock = TimeRetriever::starting_at(now());
        let outcome = retriever
            .retrieve(&Paginator::new(&caller, &page_config), &clock)
            .await;

        assert!(!outcome.is_complete());
        let failed: Vec<_> = outcome.failed_stops().map(|s| s.onestop_id.as_str()).collect();
        assert_eq!(failed, vec!["s-a"]);
        assert_eq!(retriever.departures().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn merged_list_bounded_by_limit() {
        let (mut retriever, stops) = setup(2);
        let config = *retriever.config();
        let caller = ScriptedCaller::new();
        caller
            .respond(
                departures_endpoint(&stops[0], &config),
                page(vec![dep(100, "a1"), dep(400, "a2")]),
            )
            .respond(
                departures_endpoint(&stops[1], &config),
                page(vec![dep(200, "b1"), dep(300, "b2")]),
            );

        let page_config = PageConfig::default();
        let clock = TimeRetriever::starting_at(now());
        retriever
            .retrieve(&Paginator::new(&caller, &page_config), &clock)
            .await;

        let order: Vec<_> = retriever
            .departures()
            .departures()
            .map(|d| d.direction.as_str())
            .collect();
        assert_eq!(order, vec!["a1", "b1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_replaces_previous_results() {
        let (mut retriever, stops) = setup(7);
        let config = *retriever.config();
        let caller = ScriptedCaller::new();
        caller
            .enqueue(
                departures_endpoint(&stops[0], &config),
                Ok(page(vec![dep(100, "old")])),
            )
            .respond(
                departures_endpoint(&stops[0], &config),
                page(vec![dep(200, "new")]),
            )
            .respond(departures_endpoint(&stops[1], &config), page(vec![]));

        let page_config = PageConfig::default();
        let clock = TimeRetriever::starting_at(now());
        let pages = Paginator::new(&caller, &page_config);
        retriever.retrieve(&pages, &clock).await;
        retriever.retrieve(&pages, &clock).await;

        let order: Vec<_> = retriever
            .departures()
            .departures()
            .map(|d| d.direction.as_str())
            .collect();
        assert_eq!(order, vec!["new"]);
    }
}
