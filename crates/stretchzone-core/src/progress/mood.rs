//! Append-only mood log.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::DateKey;

/// How the user feels, from the fixed check-in scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Overwhelmed,
    Nervous,
    Okay,
    Good,
    Brave,
}

impl Mood {
    pub const ALL: [Mood; 5] = [
        Mood::Overwhelmed,
        Mood::Nervous,
        Mood::Okay,
        Mood::Good,
        Mood::Brave,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Overwhelmed => "overwhelmed",
            Mood::Nervous => "nervous",
            Mood::Okay => "okay",
            Mood::Good => "good",
            Mood::Brave => "brave",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mood::Overwhelmed => "Overwhelmed",
            Mood::Nervous => "Nervous",
            Mood::Okay => "Okay",
            Mood::Good => "Good",
            Mood::Brave => "Brave",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Mood::Overwhelmed => "\u{1F630}",
            Mood::Nervous => "\u{1F61F}",
            Mood::Okay => "\u{1F60A}",
            Mood::Good => "\u{1F604}",
            Mood::Brave => "\u{1F981}",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|m| m.as_str()).collect();
                format!("unknown mood '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

/// One check-in. Never modified once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub date_key: DateKey,
    pub mood: Mood,
    pub timestamp: DateTime<Utc>,
}

/// Chronological mood history. Insertion order is write order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoodLog {
    entries: Vec<MoodEntry>,
}

impl MoodLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: MoodEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[MoodEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Latest entry for `day`: greatest timestamp, later insertion wins ties.
    pub fn latest_on(&self, day: DateKey) -> Option<&MoodEntry> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.date_key == day)
            .max_by_key(|(idx, e)| (e.timestamp, *idx))
            .map(|(_, e)| e)
    }

    /// All entries for `day`, in insertion order.
    pub fn on(&self, day: DateKey) -> impl Iterator<Item = &MoodEntry> {
        self.entries.iter().filter(move |e| e.date_key == day)
    }

    /// How many times each mood has been logged.
    pub fn counts(&self) -> BTreeMap<Mood, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.mood).or_insert(0) += 1;
        }
        counts
    }
}
