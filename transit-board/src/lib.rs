//! Transit departure board server.
//!
//! Retrieves routes, stops and upcoming departures around a location from
//! the transit.land API and keeps a display-ready board of the next
//! departures, refreshed in the background.

pub mod clock;
pub mod config;
pub mod domain;
pub mod manager;
pub mod retrieve;
pub mod transitland;
pub mod web;
pub mod zone;
