//! Daily challenge rotation.
//!
//! `assigned_date_key` is the once-per-day guard: a daily pick only happens
//! when it differs from today, and a user-requested alternate stamps it with
//! today so the next daily check leaves the swap alone.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Challenge, ChallengeCatalog, SelectionPolicy};
use crate::clock::DateKey;
use crate::error::{CoreError, Result};

/// The persisted "current challenge" slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeAssignment {
    pub active_challenge_id: String,
    pub assigned_date_key: DateKey,
    /// Ids most recently made active, oldest first.
    #[serde(default)]
    pub recent_ids: Vec<String>,
}

/// Outcome of a rotation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rotation {
    pub challenge: Challenge,
    /// False when the existing assignment was returned untouched.
    pub changed: bool,
}

/// Owns the active-challenge state and applies the selection rules.
pub struct RotationManager {
    catalog: Arc<dyn ChallengeCatalog>,
    policy: Box<dyn SelectionPolicy>,
    assignment: Option<ChallengeAssignment>,
    recent_window: usize,
}

impl RotationManager {
    /// `recent_window` is how many previously active ids a daily pick
    /// avoids; values below 1 are treated as 1.
    pub fn new(
        catalog: Arc<dyn ChallengeCatalog>,
        policy: Box<dyn SelectionPolicy>,
        assignment: Option<ChallengeAssignment>,
        recent_window: usize,
    ) -> Self {
        let mut manager = Self {
            catalog,
            policy,
            assignment,
            recent_window: recent_window.max(1),
        };
        manager.trim_recent();
        manager
    }

    pub fn assignment(&self) -> Option<&ChallengeAssignment> {
        self.assignment.as_ref()
    }

    pub fn catalog(&self) -> &Arc<dyn ChallengeCatalog> {
        &self.catalog
    }

    /// Drop all rotation state.
    pub fn clear(&mut self) {
        self.assignment = None;
    }

    /// The assigned challenge, if it still exists in the catalog.
    pub fn resolve_active(&self) -> Option<Challenge> {
        let assignment = self.assignment.as_ref()?;
        self.catalog.find(&assignment.active_challenge_id)
    }

    /// Today's challenge, picking a new one only on a new day.
    pub fn ensure_for_day(&mut self, today: DateKey) -> Result<Rotation> {
        let is_current = self
            .assignment
            .as_ref()
            .is_some_and(|a| a.assigned_date_key == today);
        if is_current {
            if let Some(challenge) = self.resolve_active() {
                return Ok(Rotation {
                    challenge,
                    changed: false,
                });
            }
            tracing::warn!(%today, "assigned challenge left the catalog, picking a replacement");
        }

        let catalog = self.catalog.list_challenges();
        let challenge = self.pick_daily(&catalog)?;
        self.assign(&challenge, today);
        tracing::debug!(id = %challenge.id, %today, "assigned daily challenge");
        Ok(Rotation {
            challenge,
            changed: true,
        })
    }

    /// A different challenge on user request. Counts as today's pick.
    pub fn alternate(&mut self, today: DateKey) -> Result<Challenge> {
        let catalog = self.catalog.list_challenges();
        if catalog.is_empty() {
            return Err(CoreError::NoChallengesAvailable);
        }
        let current = self
            .assignment
            .as_ref()
            .map(|a| a.active_challenge_id.clone());
        let excluding: Vec<&str> = match &current {
            Some(id) if catalog.len() > 1 => vec![id.as_str()],
            _ => Vec::new(),
        };
        let challenge = self
            .policy
            .pick(&catalog, &excluding)
            .or_else(|| self.policy.pick(&catalog, &[]))
            .cloned()
            .ok_or(CoreError::NoChallengesAvailable)?;
        self.assign(&challenge, today);
        tracing::debug!(id = %challenge.id, %today, "swapped to alternate challenge");
        Ok(challenge)
    }

    /// Daily pick avoiding recently active ids. If the full window excludes
    /// everything, it shrinks from the oldest side; the single most recent
    /// id stays excluded whenever the catalog has more than one entry.
    fn pick_daily(&mut self, catalog: &[Challenge]) -> Result<Challenge> {
        if catalog.is_empty() {
            return Err(CoreError::NoChallengesAvailable);
        }
        let recent: Vec<&str> = self
            .assignment
            .as_ref()
            .map(|a| a.recent_ids.iter().map(String::as_str).collect())
            .unwrap_or_default();

        if catalog.len() > 1 {
            let window = recent.len().min(self.recent_window);
            for size in (1..=window).rev() {
                let excluding = &recent[recent.len() - size..];
                if let Some(picked) = self.policy.pick(catalog, excluding) {
                    return Ok(picked.clone());
                }
            }
        }
        self.policy
            .pick(catalog, &[])
            .cloned()
            .ok_or(CoreError::NoChallengesAvailable)
    }

    fn assign(&mut self, challenge: &Challenge, today: DateKey) {
        let mut recent = self
            .assignment
            .take()
            .map(|a| a.recent_ids)
            .unwrap_or_default();
        recent.retain(|id| id != &challenge.id);
        recent.push(challenge.id.clone());
        self.assignment = Some(ChallengeAssignment {
            active_challenge_id: challenge.id.clone(),
            assigned_date_key: today,
            recent_ids: recent,
        });
        self.trim_recent();
    }

    fn trim_recent(&mut self) {
        let window = self.recent_window;
        if let Some(assignment) = self.assignment.as_mut() {
            // Older saves may lack history; the active id is always the most recent.
            if assignment.recent_ids.last() != Some(&assignment.active_challenge_id) {
                let active = assignment.active_challenge_id.clone();
                assignment.recent_ids.retain(|id| id != &active);
                assignment.recent_ids.push(active);
            }
            let excess = assignment.recent_ids.len().saturating_sub(window);
            assignment.recent_ids.drain(..excess);
        }
    }
}
