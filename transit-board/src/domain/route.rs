//! Routes and the per-zone route table.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use super::display::DisplayRoute;

/// A transit route (line) serving a zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Route {
    /// Transitland onestop ID, e.g. `r-9q9-red`
    pub onestop_id: String,
    /// Short name when the agency publishes one, long name otherwise
    pub name: String,
    /// Line colour as 0xRRGGBB
    pub line_color: u32,
    /// Text colour as 0xRRGGBB
    pub text_color: u32,
    /// Onestop ID of the operating agency
    pub agency_onestop_id: String,
}

impl Route {
    /// True for the placeholder returned by lookups that found nothing.
    pub fn is_empty(&self) -> bool {
        self.onestop_id.is_empty()
    }
}

/// Routes keyed by onestop ID.
///
/// At most one route per ID; adding a route whose ID is already present
/// replaces the old entry.
#[derive(Debug, Clone, Default)]
pub struct RouteList {
    routes: HashMap<String, Route>,
}

impl RouteList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a route with this ID is present.
    pub fn contains(&self, onestop_id: &str) -> bool {
        self.routes.contains_key(onestop_id)
    }

    /// Look up a route by ID.
    pub fn get(&self, onestop_id: &str) -> Option<&Route> {
        self.routes.get(onestop_id)
    }

    /// Look up a route by ID, returning an empty [`Route`] when absent.
    pub fn get_or_default(&self, onestop_id: &str) -> Route {
        self.get(onestop_id).cloned().unwrap_or_default()
    }

    /// All routes, in no particular order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Insert a route, replacing any route with the same ID.
    pub fn add_route(&mut self, route: Route) {
        self.routes.insert(route.onestop_id.clone(), route);
    }

    pub fn clear(&mut self) {
        self.routes.clear();
    }

    /// Routes projected for display, sorted by agency then name.
    pub fn display_routes(&self) -> Vec<DisplayRoute> {
        let mut routes: Vec<DisplayRoute> = self.routes().map(DisplayRoute::from).collect();
        routes.sort_by(|a, b| {
            a.agency_onestop_id
                .cmp(&b.agency_onestop_id)
                .then_with(|| a.name.cmp(&b.name))
        });
        routes
    }

    /// Emit every route as a debug event.
    pub fn log_contents(&self) {
        if self.routes.is_empty() {
            debug!("no routes found");
            return;
        }
        for route in self.routes.values() {
            debug!(
                id = %route.onestop_id,
                name = %route.name,
                line_color = format_args!("{:06X}", route.line_color),
                text_color = format_args!("{:06X}", route.text_color),
                agency = %route.agency_onestop_id,
                "route"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(id: &str, name: &str, agency: &str) -> Route {
        Route {
            onestop_id: id.to_string(),
            name: name.to_string(),
            line_color: 0xFF0000,
            text_color: 0xFFFFFF,
            agency_onestop_id: agency.to_string(),
        }
    }

    #[test]
    fn add_and_lookup() {
        let mut list = RouteList::new();
        list.add_route(route("r-1", "Red", "o-a"));

        assert!(list.contains("r-1"));
        assert_eq!(list.get("r-1").unwrap().name, "Red");
        assert!(!list.contains("r-2"));
        assert!(list.get("r-2").is_none());
    }

    #[test]
    fn missing_lookup_returns_empty_route() {
        let list = RouteList::new();
        let r = list.get_or_default("r-404");
        assert!(r.is_empty());
        assert_eq!(r, Route::default());
    }

    #[test]
    fn re_add_overwrites() {
        let mut list = RouteList::new();
        list.add_route(route("r-1", "Red", "o-a"));
        list.add_route(route("r-1", "Crimson", "o-a"));

        assert_eq!(list.len(), 1);
        assert_eq!(list.get("r-1").unwrap().name, "Crimson");
    }

    #[test]
    fn clear_empties() {
        let mut list = RouteList::new();
        list.add_route(route("r-1", "Red", "o-a"));
        list.add_route(route("r-2", "Blue", "o-a"));
        list.clear();

        assert!(list.is_empty());
        assert!(!list.contains("r-1"));
    }

    #[test]
    fn display_routes_sorted_by_agency_then_name() {
        let mut list = RouteList::new();
        list.add_route(route("r-3", "N", "o-b"));
        list.add_route(route("r-2", "Yellow", "o-a"));
        list.add_route(route("r-1", "Blue", "o-a"));

        let names: Vec<_> = list
            .display_routes()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Blue", "Yellow", "N"]);
    }
}
