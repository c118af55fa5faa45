//! Background refresh of one zone.
//!
//! A [`ZoneManager`] owns a spawned task that initializes its zone,
//! refreshes departures on a fixed period, and re-syncs time on a longer
//! one. Every refresh publishes a display-ready [`BoardSnapshot`] on a
//! watch channel; readers only ever see complete snapshots and never touch
//! the retrieval stack.
//!
//! Zones outlive their managers. A [`SharedZone`] keeps routes, stops and
//! the initialized flag across zone switches, so coming back to a zone only
//! refreshes departures.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::clock::{TimeRetriever, TimeSource};
use crate::config::{AppConfig, DisplayConfig, ZoneConfig};
use crate::domain::{
    DisplayDeparture, DisplayRoute, Whitelist, apply_color_fallback, combine_directions,
};
use crate::retrieve::{IndicatorStatus, RefreshOutcome};
use crate::transitland::ApiCaller;
use crate::zone::{TransitZone, ZoneStatus};

/// Lifecycle of a board as the presentation layer sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardPhase {
    /// Initial retrieval still running
    Loading,
    Ready,
    /// The zone could not be initialized; retried every departure period
    Failed,
}

/// Everything the board needs to draw one frame.
#[derive(Debug, Clone, Serialize)]
pub struct BoardSnapshot {
    pub zone: String,
    pub phase: BoardPhase,
    pub status: ZoneStatus,
    pub is_valid: bool,
    pub routes: Vec<DisplayRoute>,
    pub departures: Vec<DisplayDeparture>,
    pub indicators: IndicatorStatus,
    /// Stops whose last departure refresh failed
    pub failed_stops: Vec<String>,
    pub error: Option<String>,
    /// RFC 3339 time the snapshot was built
    pub updated_at: Option<String>,
}

impl BoardSnapshot {
    pub fn loading(zone: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            phase: BoardPhase::Loading,
            status: ZoneStatus::Uninitialized,
            is_valid: false,
            routes: Vec::new(),
            departures: Vec::new(),
            indicators: IndicatorStatus::default(),
            failed_stops: Vec::new(),
            error: None,
            updated_at: None,
        }
    }
}

/// Timing and presentation settings for a manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub departure_period: Duration,
    pub time_sync_period: Duration,
    pub poll_interval: Duration,
    /// Departures this many seconds in the past are still shown
    pub timestamp_cutoff_secs: i64,
    pub display: DisplayConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ManagerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            departure_period: config.refresh.departure_period(),
            time_sync_period: config.refresh.time_sync_period(),
            poll_interval: config.refresh.poll_interval(),
            timestamp_cutoff_secs: config.departures.timestamp_cutoff_secs,
            display: config.display.clone(),
        }
    }
}

/// A zone kept for the life of the board and handed to successive managers.
///
/// Only one manager refreshes a zone at a time: its task holds the lock
/// until it is aborted.
pub struct SharedZone<C> {
    config: ZoneConfig,
    zone: Arc<Mutex<TransitZone<C>>>,
}

impl<C> Clone for SharedZone<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            zone: Arc::clone(&self.zone),
        }
    }
}

impl<C: ApiCaller> SharedZone<C> {
    pub fn new(zone: TransitZone<C>) -> Self {
        Self {
            config: zone.config().clone(),
            zone: Arc::new(Mutex::new(zone)),
        }
    }

    pub fn config(&self) -> &ZoneConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }
}

/// Handle to a running zone refresh task.
///
/// Dropping the handle stops the task.
#[derive(Debug)]
pub struct ZoneManager {
    zone_name: String,
    handle: Option<JoinHandle<()>>,
    snapshots: watch::Receiver<BoardSnapshot>,
}

impl ZoneManager {
    /// Spawn the refresh task for `zone`.
    ///
    /// The first snapshot is [`BoardPhase::Loading`]; the task then syncs
    /// time, initializes the zone unless it already is, fetches departures
    /// once and publishes the result before settling into its refresh loop.
    pub fn start<C, S>(
        zone: SharedZone<C>,
        whitelist: Whitelist,
        time_source: Arc<S>,
        config: ManagerConfig,
    ) -> Self
    where
        C: ApiCaller + 'static,
        S: TimeSource + 'static,
    {
        let zone_name = zone.name().to_string();
        let (tx, rx) = watch::channel(BoardSnapshot::loading(&zone_name));
        let handle = tokio::spawn(refresh_loop(zone.zone, whitelist, time_source, config, tx));
        info!(zone = %zone_name, "zone manager started");

        Self {
            zone_name,
            handle: Some(handle),
            snapshots: rx,
        }
    }

    pub fn zone_name(&self) -> &str {
        &self.zone_name
    }

    /// A receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<BoardSnapshot> {
        self.snapshots.clone()
    }

    /// The latest snapshot.
    pub fn snapshot(&self) -> BoardSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Abort the refresh task, even mid-request.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!(zone = %self.zone_name, "zone manager stopped");
        }
    }
}

impl Drop for ZoneManager {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Starts a manager for whichever zone the board switches to.
pub type Launcher = Arc<dyn Fn(&ZoneConfig) -> ZoneManager + Send + Sync>;

/// A [`Launcher`] sharing one caller, time source and clock across zones.
///
/// Each distinct zone is built once, on first launch, and reused after.
pub fn launcher<C, S>(
    caller: Arc<C>,
    time_source: Arc<S>,
    clock: Arc<TimeRetriever>,
    config: &AppConfig,
) -> Launcher
where
    C: ApiCaller + 'static,
    S: TimeSource + 'static,
{
    let departures = config.departures;
    let pages = config.page_config();
    let whitelist = config.whitelist.clone();
    let manager_config = ManagerConfig::from(config);
    let built: std::sync::Mutex<Vec<SharedZone<C>>> = std::sync::Mutex::new(Vec::new());

    Arc::new(move |zone: &ZoneConfig| {
        let zone = {
            let mut built = built.lock().unwrap_or_else(|e| e.into_inner());
            match built.iter().find(|z| z.config() == zone) {
                Some(shared) => shared.clone(),
                None => {
                    let shared = SharedZone::new(
                        TransitZone::new(
                            zone.clone(),
                            Arc::clone(&caller),
                            Arc::clone(&clock),
                            departures,
                        )
                        .with_page_config(pages.clone()),
                    );
                    built.push(shared.clone());
                    shared
                }
            }
        };
        ZoneManager::start(
            zone,
            whitelist.clone(),
            Arc::clone(&time_source),
            manager_config.clone(),
        )
    })
}

async fn refresh_loop<C, S>(
    zone: Arc<Mutex<TransitZone<C>>>,
    whitelist: Whitelist,
    time_source: Arc<S>,
    config: ManagerConfig,
    tx: watch::Sender<BoardSnapshot>,
) where
    C: ApiCaller,
    S: TimeSource,
{
    let mut zone = zone.lock_owned().await;
    let clock = Arc::clone(zone.clock());
    if let Err(e) = clock.sync(&*time_source).await {
        debug!(zone = %zone.name(), error = %e, "time sync failed, keeping previous anchor");
    }
    let mut last_sync = Instant::now();

    let mut init_error = None;
    if !zone.is_initialized() {
        init_error = zone.init(whitelist.clone()).await.err().map(|e| e.to_string());
    }
    let outcome = zone.call_departures_api().await;
    tx.send_replace(build_snapshot(&*zone, clock.now(), &config, outcome.as_ref(), init_error));

    let mut last_refresh = Instant::now();
    loop {
        tokio::time::sleep(config.poll_interval).await;

        if last_refresh.elapsed() >= config.departure_period {
            last_refresh = Instant::now();

            let mut init_error = None;
            if !zone.is_initialized() {
                debug!(zone = %zone.name(), "retrying zone initialization");
                init_error = zone.init(whitelist.clone()).await.err().map(|e| e.to_string());
            }
            let outcome = zone.call_departures_api().await;
            tx.send_replace(build_snapshot(
                &*zone,
                clock.now(),
                &config,
                outcome.as_ref(),
                init_error,
            ));
        }

        if last_sync.elapsed() >= config.time_sync_period {
            last_sync = Instant::now();
            if let Err(e) = clock.sync(&*time_source).await {
                debug!(zone = %zone.name(), error = %e, "time sync failed, keeping previous anchor");
            }
        }
    }
}

/// Project the zone's current state for display at `now`.
pub fn build_snapshot<C: ApiCaller>(
    zone: &TransitZone<C>,
    now: DateTime<Utc>,
    config: &ManagerConfig,
    outcome: Option<&RefreshOutcome>,
    init_error: Option<String>,
) -> BoardSnapshot {
    let phase = if zone.is_initialized() {
        BoardPhase::Ready
    } else {
        BoardPhase::Failed
    };
    if let Some(e) = &init_error {
        error!(zone = %zone.name(), error = %e, "zone initialization failed");
    }

    let mut departures = zone.departures().clone();
    departures.remove_all_before(now - chrono::Duration::seconds(config.timestamp_cutoff_secs));
    departures.shrink_to(config.display.rows);

    let mut routes = zone.routes().display_routes();
    if config.display.combine_directions {
        routes = combine_directions(&routes);
    }
    apply_color_fallback(&mut routes);

    let failed_stops: Vec<String> = outcome
        .map(|o| o.failed_stops().map(|s| s.onestop_id.clone()).collect())
        .unwrap_or_default();
    if !failed_stops.is_empty() {
        warn!(zone = %zone.name(), failed = failed_stops.len(), "some stops failed to refresh");
    }

    BoardSnapshot {
        zone: zone.name().to_string(),
        phase,
        status: zone.status(),
        is_valid: zone.is_valid(),
        routes,
        departures: departures.display_departures(now, &config.display.colors),
        indicators: zone.indicators().status(),
        failed_stops,
        error: init_error,
        updated_at: Some(now.to_rfc3339()),
    }
}
