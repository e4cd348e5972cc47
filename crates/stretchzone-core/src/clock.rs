//! Calendar-day source.
//!
//! Every "is it still today?" comparison in the engine goes through a
//! [`Clock`]. Commands read `today()` once and reuse it for the whole
//! operation so a single call never straddles midnight.

use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// A local calendar day, rendered as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The day `days` after this one (negative goes back).
    pub fn offset_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_KEY_FORMAT))
    }
}

impl FromStr for DateKey {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, DATE_KEY_FORMAT).map(Self)
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Supplies the current calendar day and instant.
pub trait Clock: Send + Sync {
    /// Today's date-key in device local time.
    fn today(&self) -> DateKey;

    /// Current instant, used to timestamp log entries.
    fn now(&self) -> DateTime<Utc>;

    /// Day and instant from one reading, so an entry's date-key always
    /// matches its timestamp.
    fn stamp(&self) -> (DateKey, DateTime<Utc>) {
        (self.today(), self.now())
    }
}

/// Wall clock in the device's local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> DateKey {
        DateKey(Local::now().date_naive())
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn stamp(&self) -> (DateKey, DateTime<Utc>) {
        let local = Local::now();
        (DateKey(local.date_naive()), local.with_timezone(&Utc))
    }
}

/// Hand-driven clock for tests and simulations.
///
/// `today()` is derived from the stored day, not from `now()`, so tests can
/// move across midnight without caring about timezones.
#[derive(Debug)]
pub struct ManualClock {
    inner: Mutex<ManualState>,
}

#[derive(Debug)]
struct ManualState {
    today: DateKey,
    now: DateTime<Utc>,
}

impl ManualClock {
    pub fn new(today: DateKey) -> Self {
        let now = today
            .date()
            .and_hms_opt(9, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(Utc::now);
        Self {
            inner: Mutex::new(ManualState { today, now }),
        }
    }

    /// Roll over to a later (or earlier) day.
    pub fn advance_days(&self, days: i64) {
        let mut state = self.lock();
        state.today = state.today.offset_days(days);
        state.now += Duration::days(days);
    }

    /// Move the instant forward without changing the day.
    pub fn advance(&self, by: Duration) {
        self.lock().now += by;
    }

    pub fn set_today(&self, today: DateKey) {
        self.lock().today = today;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        // Poisoning only happens if a test panicked mid-update; the state is
        // two plain values, so keep going.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for ManualClock {
    fn today(&self) -> DateKey {
        self.lock().today
    }

    fn now(&self) -> DateTime<Utc> {
        self.lock().now
    }

    fn stamp(&self) -> (DateKey, DateTime<Utc>) {
        let state = self.lock();
        (state.today, state.now)
    }
}
