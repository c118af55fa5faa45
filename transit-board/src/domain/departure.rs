//! Departures and the bounded, time-ordered departure list.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::display::{DelayColors, DisplayDeparture};
use super::route::Route;
use super::stop::Stop;

/// A single departure of a trip from a stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    /// Route served, held by value
    pub route: Route,
    /// Stop departed from
    pub stop: Stop,
    /// Headsign
    pub direction: String,
    /// Scheduled departure time
    pub expected: DateTime<Utc>,
    /// Best estimate of the real departure time (equals `expected` when not real-time)
    pub actual: DateTime<Utc>,
    pub is_real_time: bool,
    pub agency_onestop_id: String,
    /// Seconds late (negative when early); zero when not real-time
    pub delay_secs: i64,
    pub is_valid: bool,
}

impl Departure {
    /// Build a departure from the static schedule only.
    pub fn scheduled(
        route: Route,
        stop: Stop,
        direction: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        let agency_onestop_id = route.agency_onestop_id.clone();
        Self {
            route,
            stop,
            direction: direction.into(),
            expected: at,
            actual: at,
            is_real_time: false,
            agency_onestop_id,
            delay_secs: 0,
            is_valid: true,
        }
    }

    /// Build a departure backed by a real-time estimate.
    ///
    /// When `delay_secs` is `None` the delay is computed as `actual - expected`.
    pub fn real_time(
        route: Route,
        stop: Stop,
        direction: impl Into<String>,
        expected: DateTime<Utc>,
        actual: DateTime<Utc>,
        delay_secs: Option<i64>,
    ) -> Self {
        let agency_onestop_id = route.agency_onestop_id.clone();
        Self {
            route,
            stop,
            direction: direction.into(),
            expected,
            actual,
            is_real_time: true,
            agency_onestop_id,
            delay_secs: delay_secs.unwrap_or_else(|| (actual - expected).num_seconds()),
            is_valid: true,
        }
    }
}

/// Departures ordered by actual time, optionally bounded in size.
///
/// Entries with equal timestamps keep their insertion order. When an
/// insertion pushes the list past its capacity, the entry furthest in the
/// future is dropped, so a bounded list always holds the soonest departures
/// it has seen.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use transit_board::domain::{Departure, DepartureList, Route, Stop};
///
/// let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
/// let mut list = DepartureList::bounded(2);
/// for mins in [10, 2, 5] {
///     list.add_departure(Departure::scheduled(
///         Route::default(),
///         Stop::default(),
///         "Downtown",
///         t0 + Duration::minutes(mins),
///     ));
/// }
///
/// let times: Vec<_> = list.departures().map(|d| d.actual).collect();
/// assert_eq!(times, vec![t0 + Duration::minutes(2), t0 + Duration::minutes(5)]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DepartureList {
    departures: BTreeMap<(DateTime<Utc>, u64), Departure>,
    capacity: Option<usize>,
    next_seq: u64,
}

impl DepartureList {
    /// Create a list; `None` means unbounded.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            departures: BTreeMap::new(),
            capacity,
            next_seq: 0,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn bounded(capacity: usize) -> Self {
        Self::new(Some(capacity))
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.departures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.departures.len()
    }

    /// Departures in ascending time order.
    pub fn departures(&self) -> impl Iterator<Item = &Departure> {
        self.departures.values()
    }

    /// Copies of all departures in ascending time order.
    pub fn to_vec(&self) -> Vec<Departure> {
        self.departures().cloned().collect()
    }

    /// Insert a departure, evicting the latest entry if over capacity.
    ///
    /// Invalid departures are ignored.
    pub fn add_departure(&mut self, departure: Departure) {
        if !departure.is_valid {
            return;
        }

        let key = (departure.actual, self.next_seq);
        self.next_seq += 1;
        self.departures.insert(key, departure);

        if let Some(capacity) = self.capacity
            && self.departures.len() > capacity
        {
            self.departures.pop_last();
        }
    }

    /// Merge every entry of `other` into this list under this list's capacity.
    pub fn concat(&mut self, other: &DepartureList) {
        for departure in other.departures() {
            self.add_departure(departure.clone());
        }
    }

    /// Drop every departure strictly before `t`.
    pub fn remove_all_before(&mut self, t: DateTime<Utc>) {
        self.departures = self.departures.split_off(&(t, 0));
    }

    /// Keep only the `n` soonest departures.
    pub fn shrink_to(&mut self, n: usize) {
        while self.departures.len() > n {
            self.departures.pop_last();
        }
    }

    pub fn clear(&mut self) {
        self.departures.clear();
    }

    /// Departures projected for the board, relative to `now`.
    pub fn display_departures(
        &self,
        now: DateTime<Utc>,
        colors: &DelayColors,
    ) -> Vec<DisplayDeparture> {
        self.departures()
            .map(|d| DisplayDeparture::project(d, now, colors))
            .collect()
    }

    /// Emit every departure as a debug event.
    pub fn log_contents(&self) {
        if self.departures.is_empty() {
            debug!("no departures found");
            return;
        }
        for dep in self.departures() {
            debug!(
                stop = %dep.stop.name,
                route = %dep.route.name,
                direction = %dep.direction,
                real_time = dep.is_real_time,
                agency = %dep.agency_onestop_id,
                expected = %dep.expected,
                actual = %dep.actual,
                delay_secs = dep.delay_secs,
                "departure"
            );
        }
    }
}
