//! Persisted save state: XP total, mood history and challenge completions.

mod mood;
mod xp;

pub use mood::{Mood, MoodEntry, MoodLog};
pub use xp::{LevelProgress, Tier, XpAmount, XpCurve};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::DateKey;
use crate::error::{CoreError, Result};

/// A challenge marked done on a given day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub challenge_id: String,
    pub date_key: DateKey,
    pub xp_awarded: u64,
    pub timestamp: DateTime<Utc>,
}

/// Derived XP figures for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub total_xp: u64,
    pub level: u64,
    pub tier: Tier,
    pub current: u64,
    pub needed: u64,
    pub progress_percent: f64,
}

impl ProgressSummary {
    pub fn from_total(total_xp: u64, curve: &XpCurve) -> Self {
        let progress = curve.progress_within_level(total_xp);
        Self {
            total_xp,
            level: progress.level,
            tier: Tier::for_level(progress.level),
            current: progress.current,
            needed: progress.needed,
            progress_percent: progress.percent(),
        }
    }
}

/// The user's save state.
///
/// Only raw facts are stored. Level and tier are derived from `total_xp`
/// through an [`XpCurve`] so they can never drift from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressAggregate {
    #[serde(default)]
    total_xp: u64,
    #[serde(default)]
    mood_log: MoodLog,
    #[serde(default)]
    completions: Vec<CompletionRecord>,
}

impl ProgressAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_xp(&self) -> u64 {
        self.total_xp
    }

    pub fn mood_log(&self) -> &MoodLog {
        &self.mood_log
    }

    pub fn completions(&self) -> &[CompletionRecord] {
        &self.completions
    }

    /// Add XP. Overflow is rejected and leaves the total untouched.
    pub fn add_xp(&mut self, amount: XpAmount) -> Result<u64> {
        self.total_xp = self
            .total_xp
            .checked_add(amount.get())
            .ok_or_else(|| CoreError::invalid_xp(amount, "would overflow the XP total"))?;
        Ok(self.total_xp)
    }

    pub fn append_mood(&mut self, entry: MoodEntry) {
        self.mood_log.append(entry);
    }

    pub fn has_completed(&self, challenge_id: &str, day: DateKey) -> bool {
        self.completions
            .iter()
            .any(|c| c.challenge_id == challenge_id && c.date_key == day)
    }

    /// Record a completion and award its XP together.
    pub fn record_completion(&mut self, record: CompletionRecord) -> Result<u64> {
        let total = self.add_xp(XpAmount::new(record.xp_awarded))?;
        self.completions.push(record);
        Ok(total)
    }
}
