//! Pluggable challenge selection.

use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;

use super::Challenge;

/// Chooses one challenge from `candidates`, skipping any id in `excluding`.
///
/// Returns `None` only when every candidate is excluded.
pub trait SelectionPolicy: Send {
    fn pick<'a>(&mut self, candidates: &'a [Challenge], excluding: &[&str]) -> Option<&'a Challenge>;
}

fn eligible<'a>(candidates: &'a [Challenge], excluding: &[&str]) -> Vec<&'a Challenge> {
    candidates
        .iter()
        .filter(|c| !excluding.contains(&c.id.as_str()))
        .collect()
}

/// Uniform choice over the eligible candidates.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    rng: Mcg128Xsl64,
}

impl RandomPolicy {
    /// Reproducible sequence, for tests and replays.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mcg128Xsl64::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: Mcg128Xsl64::from_entropy(),
        }
    }

    /// Seeded when `seed` is set, otherwise from OS entropy.
    pub fn with_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl Default for RandomPolicy {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl SelectionPolicy for RandomPolicy {
    fn pick<'a>(&mut self, candidates: &'a [Challenge], excluding: &[&str]) -> Option<&'a Challenge> {
        eligible(candidates, excluding).choose(&mut self.rng).copied()
    }
}

/// Always takes the first eligible candidate in catalog order.
#[derive(Debug, Clone, Copy, Default)]
pub struct InOrderPolicy;

impl SelectionPolicy for InOrderPolicy {
    fn pick<'a>(&mut self, candidates: &'a [Challenge], excluding: &[&str]) -> Option<&'a Challenge> {
        eligible(candidates, excluding).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(ids: &[&str]) -> Vec<Challenge> {
        ids.iter()
            .map(|id| Challenge {
                id: id.to_string(),
                title: id.to_uppercase(),
                description: String::new(),
                category: String::new(),
                discomfort_rating: 1,
            })
            .collect()
    }

    #[test]
    fn random_policy_never_returns_excluded() {
        let challenges = catalog(&["a", "b", "c"]);
        let mut policy = RandomPolicy::seeded(7);
        for _ in 0..200 {
            let picked = policy.pick(&challenges, &["b"]).unwrap();
            assert_ne!(picked.id, "b");
        }
    }

    #[test]
    fn random_policy_is_reproducible_with_seed() {
        let challenges = catalog(&["a", "b", "c", "d", "e"]);
        let mut first = RandomPolicy::seeded(42);
        let mut second = RandomPolicy::seeded(42);
        let a: Vec<_> = (0..20).map(|_| first.pick(&challenges, &[]).unwrap().id.clone()).collect();
        let b: Vec<_> = (0..20).map(|_| second.pick(&challenges, &[]).unwrap().id.clone()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn random_policy_reaches_every_candidate() {
        let challenges = catalog(&["a", "b", "c"]);
        let mut policy = RandomPolicy::seeded(1);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(policy.pick(&challenges, &[]).unwrap().id.clone());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn all_excluded_yields_none() {
        let challenges = catalog(&["a"]);
        assert!(RandomPolicy::seeded(3).pick(&challenges, &["a"]).is_none());
        assert!(InOrderPolicy.pick(&challenges, &["a"]).is_none());
    }

    #[test]
    fn in_order_policy_skips_excluded() {
        let challenges = catalog(&["a", "b", "c"]);
        assert_eq!(InOrderPolicy.pick(&challenges, &["a"]).unwrap().id, "b");
    }
}
