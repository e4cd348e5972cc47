use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::challenge::Challenge;
use crate::clock::DateKey;
use crate::progress::{Mood, Tier};

/// Engine commands produce an Event for each state change.
/// The UI renders these (toasts, level-up banners); the CLI prints them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A new daily challenge was picked. Re-reading an existing
    /// assignment produces no event.
    ChallengeAssigned {
        challenge: Challenge,
        date_key: DateKey,
    },
    /// The user swapped the active challenge.
    ChallengeSwapped {
        previous_id: Option<String>,
        challenge: Challenge,
        date_key: DateKey,
    },
    ChallengeCompleted {
        challenge_id: String,
        date_key: DateKey,
        xp_awarded: u64,
        total_xp: u64,
        leveled_up: bool,
        at: DateTime<Utc>,
    },
    /// Completing the same challenge twice on one day is a no-op.
    AlreadyCompleted {
        challenge_id: String,
        date_key: DateKey,
    },
    XpAwarded {
        amount: u64,
        total_xp: u64,
        previous_level: u64,
        new_level: u64,
        leveled_up: bool,
        tier: Tier,
    },
    MoodLogged {
        mood: Mood,
        date_key: DateKey,
        at: DateTime<Utc>,
    },
    ProgressReset {
        at: DateTime<Utc>,
    },
}
