//! Monotonic-clock-anchored UTC time.
//!
//! [`TimeRetriever`] captures a UTC reading from a [`TimeSource`] together
//! with a monotonic instant, and derives the current time from the elapsed
//! monotonic time since then. Host clock jumps between syncs do not move it.

use std::future::Future;
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::{TimeError, utc_timestamp};

/// URL queried by [`HttpDateTimeSource`] when none is configured.
pub const DEFAULT_TIME_URL: &str = "https://transit.land";

/// Errors from fetching civil time.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    #[error("time request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("response has no Date header")]
    MissingDate,

    #[error("invalid Date header {0:?}")]
    InvalidDate(String),
}

/// A source of civil UTC time.
pub trait TimeSource: Send + Sync {
    fn fetch_utc(&self) -> impl Future<Output = Result<DateTime<Utc>, ClockError>> + Send;
}

/// The host's wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    async fn fetch_utc(&self) -> Result<DateTime<Utc>, ClockError> {
        Ok(Utc::now())
    }
}

/// Reads the `Date` header of an HTTP `HEAD` response.
///
/// Accurate to about a second, which is all a minutes-until display needs.
#[derive(Debug, Clone)]
pub struct HttpDateTimeSource {
    http: reqwest::Client,
    url: String,
}

impl HttpDateTimeSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ClockError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

impl TimeSource for HttpDateTimeSource {
    async fn fetch_utc(&self) -> Result<DateTime<Utc>, ClockError> {
        let response = self.http.head(&self.url).send().await?;
        let date = response
            .headers()
            .get(reqwest::header::DATE)
            .ok_or(ClockError::MissingDate)?;
        let date = date
            .to_str()
            .map_err(|_| ClockError::InvalidDate(format!("{date:?}")))?;
        parse_http_date(date)
    }
}

/// A source that always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource(pub DateTime<Utc>);

impl TimeSource for FixedTimeSource {
    async fn fetch_utc(&self) -> Result<DateTime<Utc>, ClockError> {
        Ok(self.0)
    }
}

/// Parse an RFC 2822 HTTP date such as `Mon, 01 Jan 2024 00:00:00 GMT`.
pub fn parse_http_date(s: &str) -> Result<DateTime<Utc>, ClockError> {
    DateTime::parse_from_rfc2822(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ClockError::InvalidDate(s.to_string()))
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    utc: DateTime<Utc>,
    instant: Instant,
    synced: bool,
}

/// Shared estimate of the current UTC time.
///
/// Until the first successful [`sync`](Self::sync) the estimate is anchored
/// to the host clock.
#[derive(Debug)]
pub struct TimeRetriever {
    anchor: RwLock<Anchor>,
}

impl Default for TimeRetriever {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeRetriever {
    pub fn new() -> Self {
        Self::anchored_at(Utc::now(), false)
    }

    /// A retriever whose current time starts at `utc`.
    pub fn starting_at(utc: DateTime<Utc>) -> Self {
        Self::anchored_at(utc, true)
    }

    fn anchored_at(utc: DateTime<Utc>, synced: bool) -> Self {
        Self {
            anchor: RwLock::new(Anchor {
                utc,
                instant: Instant::now(),
                synced,
            }),
        }
    }

    /// Re-anchor to a fresh reading from `source`.
    ///
    /// On failure the previous anchor is kept.
    pub async fn sync<S: TimeSource>(&self, source: &S) -> Result<(), ClockError> {
        let utc = match source.fetch_utc().await {
            Ok(utc) => utc,
            Err(e) => {
                warn!(error = %e, "time sync failed, keeping previous anchor");
                return Err(e);
            }
        };
        let instant = Instant::now();

        let mut anchor = self.anchor.write().unwrap_or_else(|e| e.into_inner());
        let drift = (utc - Self::project(&anchor, instant)).num_milliseconds();
        *anchor = Anchor {
            utc,
            instant,
            synced: true,
        };
        if drift.abs() > 1000 {
            info!(%utc, drift_ms = drift, "time synced");
        } else {
            debug!(%utc, drift_ms = drift, "time synced");
        }
        Ok(())
    }

    /// Current UTC time.
    pub fn now(&self) -> DateTime<Utc> {
        let anchor = *self.anchor.read().unwrap_or_else(|e| e.into_inner());
        Self::project(&anchor, Instant::now())
    }

    /// Whether a sync has ever succeeded.
    pub fn is_synced(&self) -> bool {
        self.anchor.read().unwrap_or_else(|e| e.into_inner()).synced
    }

    /// Parse a transitland UTC timestamp.
    pub fn parse_utc(&self, s: &str) -> Result<DateTime<Utc>, TimeError> {
        utc_timestamp(s)
    }

    fn project(anchor: &Anchor, at: Instant) -> DateTime<Utc> {
        let elapsed = at.saturating_duration_since(anchor.instant);
        anchor.utc + chrono::Duration::from_std(elapsed).unwrap_or(chrono::Duration::zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct FailingSource;

    impl TimeSource for FailingSource {
        async fn fetch_utc(&self) -> Result<DateTime<Utc>, ClockError> {
            Err(ClockError::MissingDate)
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn advances_with_monotonic_time() {
        let clock = TimeRetriever::new();
        clock.sync(&FixedTimeSource(t0())).await.unwrap();
        assert_eq!(clock.now(), t0());

        tokio::time::advance(Duration::from_secs(90)).await;
        assert_eq!(clock.now(), t0() + chrono::Duration::seconds(90));
    }

    #[tokio::test(start_paused = true)]
    async fn resync_replaces_anchor() {
        let clock = TimeRetriever::new();
        assert!(!clock.is_synced());
        clock.sync(&FixedTimeSource(t0())).await.unwrap();
        assert!(clock.is_synced());

        tokio::time::advance(Duration::from_secs(30)).await;
        let later = t0() + chrono::Duration::seconds(31);
        clock.sync(&FixedTimeSource(later)).await.unwrap();
        assert_eq!(clock.now(), later);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_sync_keeps_anchor() {
        let clock = TimeRetriever::starting_at(t0());
        tokio::time::advance(Duration::from_secs(5)).await;

        assert!(clock.sync(&FailingSource).await.is_err());
        assert_eq!(clock.now(), t0() + chrono::Duration::seconds(5));
    }

    #[tokio::test]
    async fn system_source_is_close_to_host_clock() {
        let clock = TimeRetriever::new();
        clock.sync(&SystemTimeSource).await.unwrap();
        let diff = (clock.now() - Utc::now()).num_seconds().abs();
        assert!(diff <= 1);
    }

    #[test]
    fn parses_http_dates() {
        assert_eq!(
            parse_http_date("Mon, 01 Jan 2024 00:00:00 GMT").unwrap(),
            t0()
        );
        assert!(matches!(
            parse_http_date("yesterday"),
            Err(ClockError::InvalidDate(_))
        ));
    }

    #[test]
    fn shares_timestamp_parser() {
        let clock = TimeRetriever::new();
        assert_eq!(clock.parse_utc("2024-01-01T00:00:00Z").unwrap(), t0());
    }
}
