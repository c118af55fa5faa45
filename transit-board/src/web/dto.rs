//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::config::ZoneConfig;

/// A configured zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneSummary {
    /// Position in the zone list, used to select it
    pub index: usize,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Search radius in metres
    pub radius: f64,
    /// Whether this zone is on the board
    pub active: bool,
}

impl ZoneSummary {
    pub fn from_config(index: usize, zone: &ZoneConfig, active: bool) -> Self {
        Self {
            index,
            name: zone.name.clone(),
            lat: zone.lat,
            lon: zone.lon,
            radius: zone.radius,
            active,
        }
    }
}

/// Response listing every zone.
#[derive(Debug, Serialize)]
pub struct ZoneListResponse {
    pub zones: Vec<ZoneSummary>,
}

/// Request to put another zone on the board.
#[derive(Debug, Deserialize)]
pub struct SelectZoneRequest {
    pub index: usize,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn zone_summary_json() {
        let zone = ZoneConfig::new("Powell", 37.7844, -122.4079, 150.0);
        let summary = ZoneSummary::from_config(2, &zone, true);
        assert_eq!(
            serde_json::to_value(&summary).unwrap(),
            json!({
                "index": 2,
                "name": "Powell",
                "lat": 37.7844,
                "lon": -122.4079,
                "radius": 150.0,
                "active": true,
            })
        );
    }

    #[test]
    fn select_request_parses() {
        let req: SelectZoneRequest = serde_json::from_str(r#"{ "index": 1 }"#).unwrap();
        assert_eq!(req.index, 1);
        assert!(serde_json::from_str::<SelectZoneRequest>(r#"{ "index": -1 }"#).is_err());
    }
}
