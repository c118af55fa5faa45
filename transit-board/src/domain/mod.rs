//! Domain types for the transit departure board.
//!
//! Routes, stops and departures as retrieved from transitland, the
//! collections the retrievers fill, and the pure projections the
//! presentation layer reads.

mod departure;
mod display;
mod route;
mod stop;
mod time;
mod whitelist;

pub use departure::{Departure, DepartureList};
pub use display::{
    COLOR_WHITE, DelayColors, DisplayDeparture, DisplayRoute, apply_color_fallback,
    combine_directions, css_color, strip_direction,
};
pub use route::{Route, RouteList};
pub use stop::{Stop, StopList};
pub use time::{TimeError, minutes_until, utc_timestamp};
pub use whitelist::Whitelist;
