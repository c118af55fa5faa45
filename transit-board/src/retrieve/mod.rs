//! Paginated retrieval of routes, stops and departures.
//!
//! Every retriever drives the same [`Paginator`] loop and differs only in
//! the endpoint it builds, the filter it sends, and how it parses one
//! element of the response array.

mod base;
mod departure;
mod departure_list;
mod error;
mod indicator;
mod route;
mod stop;

pub use base::{ElementParser, MAX_PAGES, PAGE_DELAY, PageConfig, Paginator, RETRY_DELAY};
pub use departure::{
    DEPARTURES_NESTING_LIMIT, DepartureConfig, DepartureRetriever, MAX_TIMESTAMP_CUTOFF_SECS,
    departures_endpoint, departures_filter,
};
pub use departure_list::{DepartureListRetriever, RefreshOutcome};
pub use error::RetrieveError;
pub use indicator::{Indicator, IndicatorStatus, Indicators};
pub use route::{ROUTES_ENDPOINT, RouteRetriever, parse_hex_color, routes_endpoint, routes_filter};
pub use stop::{
    LOCATION_TYPE_STOP, STOPS_ENDPOINT, StopRetriever, is_boarding_stop, stops_endpoint,
    stops_filter,
};
