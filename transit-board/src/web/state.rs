//! Application state for the web layer.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::config::ZoneConfig;
use crate::manager::{BoardSnapshot, Launcher, ZoneManager};

/// The zone currently on the board.
struct ActiveZone {
    index: usize,
    manager: ZoneManager,
}

/// Shared application state.
///
/// Exactly one zone is refreshed at a time; switching zones stops the old
/// manager before the new one starts.
#[derive(Clone)]
pub struct AppState {
    /// Zones the board can show
    pub zones: Arc<Vec<ZoneConfig>>,

    launcher: Launcher,
    active: Arc<Mutex<ActiveZone>>,
}

impl AppState {
    /// Start the first zone. Returns `None` when `zones` is empty.
    pub fn new(zones: Vec<ZoneConfig>, launcher: Launcher) -> Option<Self> {
        let manager = launcher(zones.first()?);
        Some(Self {
            zones: Arc::new(zones),
            launcher,
            active: Arc::new(Mutex::new(ActiveZone { index: 0, manager })),
        })
    }

    /// Index of the zone on the board.
    pub async fn current_zone(&self) -> usize {
        self.active.lock().await.index
    }

    /// Latest snapshot of the zone on the board.
    pub async fn snapshot(&self) -> BoardSnapshot {
        self.active.lock().await.manager.snapshot()
    }

    /// Switch the board to `index`.
    ///
    /// Returns `None` if there is no such zone. Selecting the zone already
    /// shown leaves its manager running.
    pub async fn select_zone(&self, index: usize) -> Option<&ZoneConfig> {
        let zone = self.zones.get(index)?;
        let mut active = self.active.lock().await;
        if active.index != index {
            active.manager.stop();
            active.manager = (self.launcher)(zone);
            active.index = index;
            info!(zone = %zone.name, "switched zone");
        }
        Some(zone)
    }
}
