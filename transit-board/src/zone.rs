//! A geographic zone and its retrieval state machine.
//!
//! A zone is initialized by fetching its routes and then its stops. Only
//! after both succeed can departures be refreshed, which happens once per
//! stop on every cycle.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::TimeRetriever;
use crate::config::ZoneConfig;
use crate::domain::{DepartureList, RouteList, StopList, Whitelist};
use crate::retrieve::{
    DepartureConfig, DepartureListRetriever, Indicators, PageConfig, Paginator, RefreshOutcome,
    RetrieveError, RouteRetriever, StopRetriever,
};
use crate::transitland::ApiCaller;

/// Where a zone is in its retrieval cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneStatus {
    Uninitialized,
    RetrievingRoutes,
    RetrievingStops,
    RetrievingDepartures,
    Idle,
}

/// Why a zone could not be initialized.
#[derive(Debug, thiserror::Error)]
pub enum ZoneError {
    #[error("route retrieval failed: {0}")]
    RouteRetrieval(#[source] RetrieveError),

    #[error("stop retrieval failed: {0}")]
    StopRetrieval(#[source] RetrieveError),
}

/// Routes, stops and departures around one point.
pub struct TransitZone<C> {
    config: ZoneConfig,
    caller: Arc<C>,
    clock: Arc<TimeRetriever>,
    pages: PageConfig,
    indicators: Indicators,
    status: ZoneStatus,
    is_valid: bool,
    is_initialized: bool,
    whitelist: Whitelist,
    routes: RouteList,
    stops: StopList,
    departures: DepartureListRetriever,
}

impl<C: ApiCaller> TransitZone<C> {
    pub fn new(
        config: ZoneConfig,
        caller: Arc<C>,
        clock: Arc<TimeRetriever>,
        departure_config: DepartureConfig,
    ) -> Self {
        Self {
            config,
            caller,
            clock,
            pages: PageConfig::default(),
            indicators: Indicators::default(),
            status: ZoneStatus::Uninitialized,
            is_valid: false,
            is_initialized: false,
            whitelist: Whitelist::inactive(),
            routes: RouteList::new(),
            stops: StopList::new(),
            departures: DepartureListRetriever::new(departure_config),
        }
    }

    /// Use custom pagination limits and pacing.
    pub fn with_page_config(mut self, pages: PageConfig) -> Self {
        self.pages = pages;
        self
    }

    /// Report faults through shared indicators.
    pub fn with_indicators(mut self, indicators: Indicators) -> Self {
        self.indicators = indicators;
        self
    }

    /// Fetch routes and then stops, replacing anything retrieved before.
    ///
    /// On failure the zone is left invalid and uninitialized, in whichever
    /// status it had reached, and no further stage is attempted.
    pub async fn init(&mut self, whitelist: Whitelist) -> Result<(), ZoneError> {
        self.departures.clear();
        self.is_initialized = false;
        self.is_valid = false;

        let (lat, lon, radius) = (self.config.lat, self.config.lon, self.config.radius);
        let caller = &*self.caller;

        self.status = ZoneStatus::RetrievingRoutes;
        let route_pages = Paginator::new(caller, &self.pages)
            .with_fault(&self.indicators.route_fault)
            .with_rate_limit(&self.indicators.rate_limit);
        let mut route_retriever = RouteRetriever::new(lat, lon, radius, whitelist.clone());
        if let Err(e) = route_retriever.retrieve(&route_pages).await {
            warn!(zone = %self.config.name, error = %e, "zone route retrieval failed");
            return Err(ZoneError::RouteRetrieval(e));
        }
        self.routes = route_retriever.into_routes();

        self.status = ZoneStatus::RetrievingStops;
        let stop_pages = Paginator::new(caller, &self.pages)
            .with_fault(&self.indicators.stop_fault)
            .with_rate_limit(&self.indicators.rate_limit);
        let mut stop_retriever = StopRetriever::new(lat, lon, radius, whitelist.clone());
        if let Err(e) = stop_retriever.retrieve(&stop_pages).await {
            warn!(zone = %self.config.name, error = %e, "zone stop retrieval failed");
            return Err(ZoneError::StopRetrieval(e));
        }
        self.stops = stop_retriever.into_stops();

        self.departures.init(self.routes.clone(), &self.stops);
        self.is_initialized = true;
        self.is_valid = !self.routes.is_empty();
        self.whitelist = whitelist;
        self.status = ZoneStatus::Idle;

        info!(
            zone = %self.config.name,
            routes = self.routes.len(),
            stops = self.stops.len(),
            valid = self.is_valid,
            "zone initialized"
        );
        Ok(())
    }

    /// Refresh departures for every stop.
    ///
    /// Does nothing and returns `None` until the zone is initialized.
    /// Individual stop failures are reported in the outcome; the zone
    /// always returns to [`ZoneStatus::Idle`].
    pub async fn call_departures_api(&mut self) -> Option<RefreshOutcome> {
        if !self.is_initialized {
            debug!(zone = %self.config.name, "departure refresh skipped, zone not initialized");
            return None;
        }

        self.status = ZoneStatus::RetrievingDepartures;
        let pages = Paginator::new(&*self.caller, &self.pages)
            .with_fault(&self.indicators.departure_fault)
            .with_rate_limit(&self.indicators.rate_limit);
        let outcome = self.departures.retrieve(&pages, &self.clock).await;
        self.status = ZoneStatus::Idle;

        Some(outcome)
    }

    pub fn clear_departures(&mut self) {
        self.departures.clear();
    }

    pub fn config(&self) -> &ZoneConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn lat(&self) -> f64 {
        self.config.lat
    }

    pub fn lon(&self) -> f64 {
        self.config.lon
    }

    pub fn radius(&self) -> f64 {
        self.config.radius
    }

    pub fn status(&self) -> ZoneStatus {
        self.status
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn is_initialized(&self) -> bool {
        self.is_initialized
    }

    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    pub fn routes(&self) -> &RouteList {
        &self.routes
    }

    pub fn stops(&self) -> &StopList {
        &self.stops
    }

    pub fn departures(&self) -> &DepartureList {
        self.departures.departures()
    }

    pub fn indicators(&self) -> &Indicators {
        &self.indicators
    }

    pub fn clock(&self) -> &Arc<TimeRetriever> {
        &self.clock
    }

    /// Emit the zone and all of its collections as debug events.
    pub fn log_contents(&self) {
        debug!(
            zone = %self.config.name,
            lat = self.config.lat,
            lon = self.config.lon,
            radius = self.config.radius,
            valid = self.is_valid,
            initialized = self.is_initialized,
            status = ?self.status,
            "zone"
        );
        self.routes.log_contents();
        self.stops.log_contents();
        self.departures().log_contents();
    }
}
