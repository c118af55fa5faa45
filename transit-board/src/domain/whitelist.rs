//! Agency allowlist.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// An optional set of agency onestop IDs to restrict retrieval to.
///
/// An inactive whitelist admits every agency, whatever it contains.
///
/// # Examples
///
/// ```
/// use transit_board::domain::Whitelist;
///
/// let wl = Whitelist::new(["o-9q9-bart", "o-9q8y-sfmta"]);
/// assert!(wl.admits("o-9q9-bart"));
/// assert!(!wl.admits("o-9q9-caltrain"));
/// assert_eq!(wl.query_value(), "o-9q8y-sfmta,o-9q9-bart");
///
/// assert!(Whitelist::inactive().admits("o-9q9-caltrain"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Whitelist {
    #[serde(default)]
    agencies: BTreeSet<String>,
    #[serde(default)]
    active: bool,
}

impl Whitelist {
    /// Create an active whitelist from agency IDs.
    pub fn new<I, S>(agencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            agencies: agencies.into_iter().map(Into::into).collect(),
            active: true,
        }
    }

    /// A whitelist that filters nothing.
    pub fn inactive() -> Self {
        Self::default()
    }

    pub fn add(&mut self, agency: impl Into<String>) {
        self.agencies.insert(agency.into());
    }

    pub fn remove(&mut self, agency: &str) {
        self.agencies.remove(agency);
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether `agency` is listed, regardless of whether the list is active.
    pub fn contains(&self, agency: &str) -> bool {
        self.agencies.contains(agency)
    }

    /// Whether `agency` passes this whitelist.
    pub fn admits(&self, agency: &str) -> bool {
        !self.active || self.contains(agency)
    }

    pub fn agencies(&self) -> impl Iterator<Item = &str> {
        self.agencies.iter().map(String::as_str)
    }

    /// Comma-joined agency list for the `served_by_onestop_ids` query parameter.
    pub fn query_value(&self) -> String {
        self.agencies
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}
