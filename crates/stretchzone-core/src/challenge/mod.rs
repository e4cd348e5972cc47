//! Challenges, the catalog that supplies them, and daily rotation.

mod rotation;
mod selection;

pub use rotation::{ChallengeAssignment, Rotation, RotationManager};
pub use selection::{InOrderPolicy, RandomPolicy, SelectionPolicy};

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Highest value on the discomfort scale.
pub const MAX_DISCOMFORT: u8 = 5;

/// A catalog entry. The engine selects challenges but never edits them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// 0..=5, drives the intensity indicator.
    #[serde(default, alias = "discomfortRating")]
    pub discomfort_rating: u8,
}

impl Challenge {
    /// Category for display, e.g. `small-talk` -> `small talk`.
    pub fn category_label(&self) -> String {
        if self.category.trim().is_empty() {
            "General".to_string()
        } else {
            self.category.replace('-', " ")
        }
    }

    fn normalized(mut self) -> Self {
        self.discomfort_rating = self.discomfort_rating.min(MAX_DISCOMFORT);
        self
    }
}

/// Provider of selectable challenges.
pub trait ChallengeCatalog: Send + Sync {
    /// Every selectable challenge, in catalog order.
    fn list_challenges(&self) -> Vec<Challenge>;

    /// Look up one challenge by id.
    fn find(&self, id: &str) -> Option<Challenge> {
        self.list_challenges().into_iter().find(|c| c.id == id)
    }
}

/// A fixed in-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    challenges: Vec<Challenge>,
}

impl StaticCatalog {
    /// Build a catalog, clamping ratings and dropping repeated ids.
    pub fn new(challenges: Vec<Challenge>) -> Self {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(challenges.len());
        for challenge in challenges {
            if !seen.insert(challenge.id.clone()) {
                tracing::warn!(id = %challenge.id, "duplicate challenge id in catalog, keeping first");
                continue;
            }
            kept.push(challenge.normalized());
        }
        Self { challenges: kept }
    }

    /// Parse a JSON array of challenges.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let challenges: Vec<Challenge> = serde_json::from_str(json)?;
        Ok(Self::new(challenges))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }
}

impl ChallengeCatalog for StaticCatalog {
    fn list_challenges(&self) -> Vec<Challenge> {
        self.challenges.clone()
    }

    fn find(&self, id: &str) -> Option<Challenge> {
        self.challenges.iter().find(|c| c.id == id).cloned()
    }
}
