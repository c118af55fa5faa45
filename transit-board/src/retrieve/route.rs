//! Route retrieval around a point.

use serde_json::{Value, json};
use tracing::{debug, trace};

use super::base::{ElementParser, Paginator};
use super::error::RetrieveError;
use crate::domain::{Route, RouteList, Whitelist};
use crate::transitland::{ApiCaller, FieldFilter};

/// REST path of the routes endpoint.
pub const ROUTES_ENDPOINT: &str = "/api/v2/rest/routes";

const ROUTES_KEY: &str = "routes";

/// Build the routes query for a circle around `(lat, lon)`.
pub fn routes_endpoint(lat: f64, lon: f64, radius: f64) -> String {
    format!("{ROUTES_ENDPOINT}?lat={lat:.6}&lon={lon:.6}&radius={radius:.6}")
}

/// Fields kept from each routes page.
pub fn routes_filter() -> FieldFilter {
    FieldFilter::new(json!({
        "meta": { "next": true },
        "routes": [{
            "agency": { "onestop_id": true },
            "onestop_id": true,
            "route_color": true,
            "route_text_color": true,
            "route_short_name": true,
            "route_long_name": true,
        }],
    }))
}

/// Parse a hex colour the way `strtol(s, NULL, 16)` would.
///
/// Leading whitespace and an optional `0x` or `#` prefix are skipped and
/// parsing stops at the first non-hex character. Anything unparseable is 0.
pub fn parse_hex_color(s: &str) -> u32 {
    let s = s.trim_start();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .or_else(|| s.strip_prefix('#'))
        .unwrap_or(s);
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_hexdigit())
        .map_or(s.len(), |(i, _)| i);
    u32::from_str_radix(&s[..end], 16).unwrap_or(0)
}

/// Retrieves every route serving a zone into a [`RouteList`].
#[derive(Debug, Clone)]
pub struct RouteRetriever {
    endpoint: String,
    whitelist: Whitelist,
    routes: RouteList,
}

impl RouteRetriever {
    pub fn new(lat: f64, lon: f64, radius: f64, whitelist: Whitelist) -> Self {
        Self {
            endpoint: routes_endpoint(lat, lon, radius),
            whitelist,
            routes: RouteList::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    pub fn set_whitelist(&mut self, whitelist: Whitelist) {
        self.whitelist = whitelist;
    }

    pub fn routes(&self) -> &RouteList {
        &self.routes
    }

    pub fn into_routes(self) -> RouteList {
        self.routes
    }

    /// Clear the route list and fill it from the API.
    pub async fn retrieve<C: ApiCaller>(
        &mut self,
        pages: &Paginator<'_, C>,
    ) -> Result<(), RetrieveError> {
        self.routes.clear();
        let endpoint = self.endpoint.clone();
        let count = pages.run(&endpoint, &routes_filter(), self).await?;
        debug!(pages = count, routes = self.routes.len(), "routes retrieved");
        Ok(())
    }
}

impl ElementParser for RouteRetriever {
    const ARRAY_KEY: &'static str = ROUTES_KEY;

    fn parse_element(&mut self, element: &Value) {
        let Some(onestop_id) = element.get("onestop_id").and_then(Value::as_str) else {
            return;
        };
        let Some(agency) = element
            .pointer("/agency/onestop_id")
            .and_then(Value::as_str)
        else {
            return;
        };
        if !self.whitelist.admits(agency) {
            trace!(route = onestop_id, agency, "route agency not whitelisted");
            return;
        }

        let short_name = element.get("route_short_name").and_then(Value::as_str);
        let long_name = element.get("route_long_name").and_then(Value::as_str);
        let Some(name) = short_name.or(long_name) else {
            return;
        };

        let color = |key: &str| {
            element
                .get(key)
                .and_then(Value::as_str)
                .map_or(0, parse_hex_color)
        };

        self.routes.add_route(Route {
            onestop_id: onestop_id.to_string(),
            name: name.to_string(),
            line_color: color("route_color"),
            text_color: color("route_text_color"),
            agency_onestop_id: agency.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieve::PageConfig;
    use crate::retrieve::indicator::Indicator;
    use crate::transitland::{ApiError, ScriptedCaller};

    fn route_json(id: &str, short: Option<&str>, long: Option<&str>, agency: &str) -> Value {
        json!({
            "onestop_id": id,
            "route_short_name": short,
            "route_long_name": long,
            "route_color": "FF0000",
            "route_text_color": "ffffff",
            "agency": { "onestop_id": agency },
            "geometry": { "type": "MultiLineString" },
        })
    }

    fn endpoint() -> String {
        routes_endpoint(37.7749, -122.4194, 500.0)
    }

    #[test]
    fn endpoint_format() {
        assert_eq!(
            endpoint(),
            "/api/v2/rest/routes?lat=37.774900&lon=-122.419400&radius=500.000000"
        );
    }

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_color("FF0000"), 0xFF0000);
        assert_eq!(parse_hex_color("00aa3c"), 0x00AA3C);
        assert_eq!(parse_hex_color("#123456"), 0x123456);
        assert_eq!(parse_hex_color("0x0000ff"), 0x0000FF);
        assert_eq!(parse_hex_color("12zz"), 0x12);
        assert_eq!(parse_hex_color(""), 0);
        assert_eq!(parse_hex_color("none"), 0);
    }

    #[test]
    fn prefers_short_name() {
        let mut r = RouteRetriever::new(0.0, 0.0, 1.0, Whitelist::inactive());
        r.parse_element(&route_json("r-1", Some("N"), Some("Judah"), "o-a"));
        r.parse_element(&route_json("r-2", None, Some("Caltrain"), "o-b"));

        assert_eq!(r.routes().get("r-1").unwrap().name, "N");
        assert_eq!(r.routes().get("r-2").unwrap().name, "Caltrain");
        let red = r.routes().get("r-1").unwrap();
        assert_eq!(red.line_color, 0xFF0000);
        assert_eq!(red.text_color, 0xFFFFFF);
        assert_eq!(red.agency_onestop_id, "o-a");
    }

    #[test]
    fn rejects_incomplete_routes() {
        let mut r = RouteRetriever::new(0.0, 0.0, 1.0, Whitelist::inactive());
        r.parse_element(&route_json("r-1", None, None, "o-a"));
        r.parse_element(&json!({ "onestop_id": "r-2", "route_short_name": "2" }));
        r.parse_element(&json!({ "agency": { "onestop_id": "o-a" }, "route_short_name": "3" }));
        assert!(r.routes().is_empty());
    }

    #[test]
    fn missing_colors_are_zero() {
        let mut r = RouteRetriever::new(0.0, 0.0, 1.0, Whitelist::inactive());
        r.parse_element(&json!({
            "onestop_id": "r-1",
            "route_short_name": "1",
            "agency": { "onestop_id": "o-a" },
        }));
        let route = r.routes().get("r-1").unwrap();
        assert_eq!((route.line_color, route.text_color), (0, 0));
    }

    #[test]
    fn whitelist_excludes_other_agencies() {
        let mut r = RouteRetriever::new(0.0, 0.0, 1.0, Whitelist::new(["o-a"]));
        r.parse_element(&route_json("r-1", Some("1"), None, "o-a"));
        r.parse_element(&route_json("r-2", Some("2"), None, "o-b"));

        assert!(r.routes().contains("r-1"));
        assert!(!r.routes().contains("r-2"));
    }

    #[test]
    fn whitelist_rejects_before_reading_names() {
        let mut r = RouteRetriever::new(0.0, 0.0, 1.0, Whitelist::new(["o-a"]));
        // Excluded agencies are dropped whatever shape the rest of the element has.
        r.parse_element(&json!({
            "onestop_id": "r-x",
            "route_short_name": 7,
            "route_long_name": ["not", "a", "name"],
            "agency": { "onestop_id": "o-b" },
        }));
        r.parse_element(&route_json("r-1", Some("1"), None, "o-a"));

        assert!(!r.routes().contains("r-x"));
        assert_eq!(r.routes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retrieve_across_pages() {
        let caller = ScriptedCaller::new();
        let next = format!("https://transit.land{ROUTES_ENDPOINT}?after=2");
        caller
            .respond(
                endpoint(),
                json!({
                    "meta": { "next": next },
                    "routes": [route_json("r-1", Some("1"), None, "o-a"), null],
                }),
            )
            .respond(
                format!("{ROUTES_ENDPOINT}?after=2"),
                json!({ "meta": {}, "routes": [route_json("r-2", Some("2"), None, "o-a")] }),
            );

        let config = PageConfig::default();
        let mut r = RouteRetriever::new(37.7749, -122.4194, 500.0, Whitelist::inactive());
        r.retrieve(&Paginator::new(&caller, &config)).await.unwrap();

        assert_eq!(r.routes().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_on_middle_page_still_collects_last_page() {
        let caller = ScriptedCaller::new();
        let p2 = format!("{ROUTES_ENDPOINT}?after=1");
        let p3 = format!("{ROUTES_ENDPOINT}?after=2");
        caller
            .respond(
                endpoint(),
                json!({
                    "meta": { "next": format!("https://transit.land{p2}") },
                    "routes": [route_json("r-1", Some("1"), None, "o-a")],
                }),
            )
            .enqueue(p2.clone(), Err(ApiError::Timeout))
            .respond(
                p2.clone(),
                json!({
                    "meta": { "next": format!("https://transit.land{p3}") },
                    "routes": [route_json("r-2", Some("2"), None, "o-a")],
                }),
            )
            .respond(
                p3.clone(),
                json!({ "meta": {}, "routes": [route_json("r-3", Some("3"), None, "o-a")] }),
            );

        let config = PageConfig::default().with_max_pages(3);
        let mut r = RouteRetriever::new(37.7749, -122.4194, 500.0, Whitelist::inactive());
        r.retrieve(&Paginator::new(&caller, &config)).await.unwrap();

        assert!(r.routes().contains("r-3"));
        assert_eq!(r.routes().len(), 3);
        assert_eq!(caller.call_count(&p2), 2);
        assert_eq!(caller.call_count(&p3), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retrieve_clears_previous_routes() {
        let caller = ScriptedCaller::new();
        caller
            .enqueue(
                endpoint(),
                Ok(json!({ "routes": [route_json("r-old", Some("1"), None, "o-a")] })),
            )
            .respond(
                endpoint(),
                json!({ "routes": [route_json("r-new", Some("2"), None, "o-a")] }),
            );

        let config = PageConfig::default();
        let fault = Indicator::new("route_fault");
        let pages = Paginator::new(&caller, &config).with_fault(&fault);
        let mut r = RouteRetriever::new(37.7749, -122.4194, 500.0, Whitelist::inactive());
        r.retrieve(&pages).await.unwrap();
        r.retrieve(&pages).await.unwrap();

        assert!(!r.routes().contains("r-old"));
        assert!(r.routes().contains("r-new"));
    }
}
