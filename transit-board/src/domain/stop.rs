//! Stops and the per-zone stop table.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

/// A boarding platform or stop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Stop {
    /// Transitland onestop ID, e.g. `s-9q8yyzcq3s-montgomery`
    pub onestop_id: String,
    pub name: String,
}

impl Stop {
    pub fn new(onestop_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            onestop_id: onestop_id.into(),
            name: name.into(),
        }
    }

    /// True for the placeholder returned by lookups that found nothing.
    pub fn is_empty(&self) -> bool {
        self.onestop_id.is_empty()
    }
}

/// Stops keyed by onestop ID.
#[derive(Debug, Clone, Default)]
pub struct StopList {
    stops: HashMap<String, Stop>,
}

impl StopList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, onestop_id: &str) -> bool {
        self.stops.contains_key(onestop_id)
    }

    pub fn get(&self, onestop_id: &str) -> Option<&Stop> {
        self.stops.get(onestop_id)
    }

    /// Look up a stop by ID, returning an empty [`Stop`] when absent.
    pub fn get_or_default(&self, onestop_id: &str) -> Stop {
        self.get(onestop_id).cloned().unwrap_or_default()
    }

    /// Copies of all stops, in no particular order.
    pub fn all_stops(&self) -> Vec<Stop> {
        self.stops.values().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    /// Insert a stop, replacing any stop with the same ID.
    pub fn add_stop(&mut self, stop: Stop) {
        self.stops.insert(stop.onestop_id.clone(), stop);
    }

    pub fn clear(&mut self) {
        self.stops.clear();
    }

    /// Emit every stop as a debug event.
    pub fn log_contents(&self) {
        if self.stops.is_empty() {
            debug!("no stops found");
            return;
        }
        for stop in self.stops.values() {
            debug!(id = %stop.onestop_id, name = %stop.name, "stop");
        }
    }
}
