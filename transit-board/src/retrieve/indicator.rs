//! Fault indicators raised by the retrievers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{info, warn};

/// A shared on/off fault flag.
///
/// Clones share state, so a retriever can raise an indicator that the
/// board reads elsewhere.
#[derive(Debug, Clone)]
pub struct Indicator {
    name: &'static str,
    raised: Arc<AtomicBool>,
}

impl Indicator {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            raised: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn raise(&self) {
        if !self.raised.swap(true, Ordering::Relaxed) {
            warn!(indicator = self.name, "indicator raised");
        }
    }

    pub fn lower(&self) {
        if self.raised.swap(false, Ordering::Relaxed) {
            info!(indicator = self.name, "indicator cleared");
        }
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Relaxed)
    }
}

/// The full set of indicators for one board.
///
/// Each retriever kind has its own fault indicator, lowered at the start of
/// every page and raised on failure. The rate-limit indicator is shared and
/// sticky: nothing lowers it except [`Indicators::reset_rate_limit`].
#[derive(Debug, Clone)]
pub struct Indicators {
    pub route_fault: Indicator,
    pub stop_fault: Indicator,
    pub departure_fault: Indicator,
    pub rate_limit: Indicator,
}

impl Default for Indicators {
    fn default() -> Self {
        Self {
            route_fault: Indicator::new("route_fault"),
            stop_fault: Indicator::new("stop_fault"),
            departure_fault: Indicator::new("departure_fault"),
            rate_limit: Indicator::new("rate_limit"),
        }
    }
}

impl Indicators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset_rate_limit(&self) {
        self.rate_limit.lower();
    }

    /// Point-in-time copy of every flag.
    pub fn status(&self) -> IndicatorStatus {
        IndicatorStatus {
            route_fault: self.route_fault.is_raised(),
            stop_fault: self.stop_fault.is_raised(),
            departure_fault: self.departure_fault.is_raised(),
            rate_limited: self.rate_limit.is_raised(),
        }
    }
}

/// Snapshot of [`Indicators`] for the presentation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndicatorStatus {
    pub route_fault: bool,
    pub stop_fault: bool,
    pub departure_fault: bool,
    pub rate_limited: bool,
}

impl IndicatorStatus {
    pub fn any(&self) -> bool {
        self.route_fault || self.stop_fault || self.departure_fault || self.rate_limited
    }
}
