//! Experience curve, levels and tiers.
//!
//! Everything here is a pure function of `total_xp`. Level, tier and
//! per-level progress are recomputed on demand and never persisted.
//!
//! ## Curve
//!
//! ```text
//! xp_required_for_level(L) = base_xp + xp_step * (L - 1)
//! xp_to_reach_level(L)     = sum of xp_required_for_level(1..L)
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Parameters of the leveling curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpCurve {
    /// XP needed to go from level 1 to level 2. Must be at least 1.
    pub base_xp: u64,
    /// Extra XP each subsequent level costs.
    pub xp_step: u64,
}

impl Default for XpCurve {
    fn default() -> Self {
        Self {
            base_xp: 100,
            xp_step: 50,
        }
    }
}

/// Where a total XP value sits on the curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub level: u64,
    /// XP earned since the start of `level`.
    pub current: u64,
    /// XP the whole of `level` spans.
    pub needed: u64,
}

impl LevelProgress {
    /// 0.0 .. 100.0 progress toward the next level.
    pub fn percent(&self) -> f64 {
        if self.needed == 0 {
            return 0.0;
        }
        (self.current as f64 / self.needed as f64 * 100.0).min(100.0)
    }
}

impl XpCurve {
    pub fn new(base_xp: u64, xp_step: u64) -> Self {
        Self {
            base_xp: base_xp.max(1),
            xp_step,
        }
    }

    fn base(&self) -> u128 {
        self.base_xp.max(1) as u128
    }

    fn required_wide(&self, level: u64) -> u128 {
        let level = level.max(1) as u128;
        self.base() + self.xp_step as u128 * (level - 1)
    }

    /// Cumulative XP for `n` completed levels. Fits in u128 for every
    /// `n <= u64::MAX + 1` and u64 curve parameters.
    fn cumulative_wide(&self, n: u128) -> u128 {
        if n == 0 {
            return 0;
        }
        let step = self.xp_step as u128;
        let triangle = if n % 2 == 0 {
            (n / 2) * (n - 1)
        } else {
            n * ((n - 1) / 2)
        };
        n.saturating_mul(self.base())
            .saturating_add(step.saturating_mul(triangle))
    }

    /// XP the given level spans before the next one is reached.
    pub fn xp_required_for_level(&self, level: u64) -> u64 {
        saturate(self.required_wide(level))
    }

    /// Cumulative XP at which `level` begins. Level 1 begins at zero.
    pub fn xp_to_reach_level(&self, level: u64) -> u64 {
        let completed = level.max(1) as u128 - 1;
        saturate(self.cumulative_wide(completed))
    }

    /// Number of fully completed levels at `total_xp`.
    fn completed_levels(&self, total_xp: u64) -> u128 {
        let total = total_xp as u128;
        // cumulative(n) >= n * base >= n, so n = total + 1 is always past it.
        let (mut lo, mut hi) = (0u128, total + 1);
        while lo < hi {
            let mid = lo + (hi - lo + 1) / 2;
            if self.cumulative_wide(mid) <= total {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        lo
    }

    /// Largest level whose threshold is at or below `total_xp`.
    pub fn level_for_xp(&self, total_xp: u64) -> u64 {
        saturate(self.completed_levels(total_xp) + 1)
    }

    pub fn progress_within_level(&self, total_xp: u64) -> LevelProgress {
        let completed = self.completed_levels(total_xp);
        let start = self.cumulative_wide(completed);
        LevelProgress {
            level: saturate(completed + 1),
            current: saturate(total_xp as u128 - start),
            needed: saturate(self.base() + self.xp_step as u128 * completed),
        }
    }
}

fn saturate(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

/// Display bands over levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Novice,
    Explorer,
    Adventurer,
    Trailblazer,
    Fearless,
}

impl Tier {
    pub const ALL: [Tier; 5] = [
        Tier::Novice,
        Tier::Explorer,
        Tier::Adventurer,
        Tier::Trailblazer,
        Tier::Fearless,
    ];

    /// First level that belongs to this tier.
    pub fn min_level(&self) -> u64 {
        match self {
            Tier::Novice => 1,
            Tier::Explorer => 5,
            Tier::Adventurer => 10,
            Tier::Trailblazer => 20,
            Tier::Fearless => 35,
        }
    }

    pub fn for_level(level: u64) -> Tier {
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|tier| level >= tier.min_level())
            .unwrap_or(Tier::Novice)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::Novice => "Novice",
            Tier::Explorer => "Explorer",
            Tier::Adventurer => "Adventurer",
            Tier::Trailblazer => "Trailblazer",
            Tier::Fearless => "Fearless",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Tier::Novice => "\u{1F331}",
            Tier::Explorer => "\u{1F9ED}",
            Tier::Adventurer => "\u{26F0}\u{FE0F}",
            Tier::Trailblazer => "\u{1F525}",
            Tier::Fearless => "\u{1F981}",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A validated, non-negative whole number of XP.
///
/// Raw input (signed integers, floats, user-typed strings) goes through the
/// `TryFrom`/`FromStr` impls, which reject anything negative or fractional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct XpAmount(u64);

impl XpAmount {
    pub const ZERO: XpAmount = XpAmount(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for XpAmount {
    fn from(value: u32) -> Self {
        Self(value as u64)
    }
}

impl From<u64> for XpAmount {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl TryFrom<i64> for XpAmount {
    type Error = CoreError;

    fn try_from(value: i64) -> Result<Self> {
        u64::try_from(value)
            .map(Self)
            .map_err(|_| CoreError::invalid_xp(value, "must not be negative"))
    }
}

impl TryFrom<f64> for XpAmount {
    type Error = CoreError;

    fn try_from(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(CoreError::invalid_xp(value, "must be a finite number"));
        }
        if value.fract() != 0.0 {
            return Err(CoreError::invalid_xp(value, "must be a whole number"));
        }
        if value < 0.0 {
            return Err(CoreError::invalid_xp(value, "must not be negative"));
        }
        if value >= u64::MAX as f64 {
            return Err(CoreError::invalid_xp(value, "is too large"));
        }
        Ok(Self(value as u64))
    }
}

impl FromStr for XpAmount {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Ok(whole) = trimmed.parse::<i64>() {
            return Self::try_from(whole);
        }
        if let Ok(whole) = trimmed.parse::<u64>() {
            return Ok(Self(whole));
        }
        match trimmed.parse::<f64>() {
            Ok(value) => Self::try_from(value),
            Err(_) => Err(CoreError::invalid_xp(s, "not a number")),
        }
    }
}

impl fmt::Display for XpAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn curve() -> XpCurve {
        XpCurve::default()
    }

    #[test]
    fn zero_xp_is_level_one_with_no_progress() {
        let progress = curve().progress_within_level(0);
        assert_eq!(progress.level, 1);
        assert_eq!(progress.current, 0);
        assert_eq!(progress.needed, 100);
    }

    #[test]
    fn thresholds_follow_the_curve() {
        let c = curve();
        assert_eq!(c.xp_required_for_level(1), 100);
        assert_eq!(c.xp_required_for_level(2), 150);
        assert_eq!(c.xp_required_for_level(3), 200);
        assert_eq!(c.xp_to_reach_level(1), 0);
        assert_eq!(c.xp_to_reach_level(2), 100);
        assert_eq!(c.xp_to_reach_level(3), 250);
        assert_eq!(c.xp_to_reach_level(4), 450);
    }

    #[test]
    fn level_changes_exactly_at_threshold() {
        let c = curve();
        assert_eq!(c.level_for_xp(99), 1);
        assert_eq!(c.level_for_xp(100), 2);
        assert_eq!(c.level_for_xp(249), 2);
        assert_eq!(c.level_for_xp(250), 3);
    }

    #[test]
    fn level_zero_is_treated_as_level_one() {
        let c = curve();
        assert_eq!(c.xp_required_for_level(0), c.xp_required_for_level(1));
        assert_eq!(c.xp_to_reach_level(0), 0);
    }

    #[test]
    fn flat_curve_levels_linearly() {
        let c = XpCurve::new(10, 0);
        assert_eq!(c.level_for_xp(0), 1);
        assert_eq!(c.level_for_xp(95), 10);
        assert_eq!(c.progress_within_level(95).current, 5);
    }

    #[test]
    fn extreme_totals_do_not_overflow() {
        let c = curve();
        let level = c.level_for_xp(u64::MAX);
        assert!(level > 1);
        let progress = c.progress_within_level(u64::MAX);
        assert!(progress.current < progress.needed);

        let steep = XpCurve::new(u64::MAX, u64::MAX);
        assert_eq!(steep.level_for_xp(u64::MAX), 2);
        assert_eq!(steep.xp_required_for_level(u64::MAX), u64::MAX);
    }

    #[test]
    fn tiers_are_banded_by_level() {
        assert_eq!(Tier::for_level(0), Tier::Novice);
        assert_eq!(Tier::for_level(1), Tier::Novice);
        assert_eq!(Tier::for_level(4), Tier::Novice);
        assert_eq!(Tier::for_level(5), Tier::Explorer);
        assert_eq!(Tier::for_level(19), Tier::Adventurer);
        assert_eq!(Tier::for_level(20), Tier::Trailblazer);
        assert_eq!(Tier::for_level(35), Tier::Fearless);
        assert_eq!(Tier::for_level(u64::MAX), Tier::Fearless);
    }

    #[test]
    fn percent_tracks_progress() {
        let progress = curve().progress_within_level(150);
        assert_eq!(progress.level, 2);
        assert_eq!(progress.current, 50);
        assert!((progress.percent() - 33.333).abs() < 0.01);
    }

    #[test]
    fn xp_amount_rejects_negative_and_fractional() {
        assert!(matches!(
            XpAmount::try_from(-1i64),
            Err(CoreError::InvalidXpAmount { .. })
        ));
        assert!(matches!(
            XpAmount::try_from(2.5f64),
            Err(CoreError::InvalidXpAmount { .. })
        ));
        assert!(XpAmount::try_from(f64::NAN).is_err());
        assert_eq!(XpAmount::try_from(40.0f64).unwrap().get(), 40);
        assert_eq!(XpAmount::try_from(0i64).unwrap(), XpAmount::ZERO);
    }

    #[test]
    fn xp_amount_parses_user_input() {
        assert_eq!("25".parse::<XpAmount>().unwrap().get(), 25);
        assert_eq!(" 7 ".parse::<XpAmount>().unwrap().get(), 7);
        assert_eq!("30.0".parse::<XpAmount>().unwrap().get(), 30);
        assert!("-3".parse::<XpAmount>().is_err());
        assert!("1.5".parse::<XpAmount>().is_err());
        assert!("lots".parse::<XpAmount>().is_err());
        assert_eq!(
            "18446744073709551615".parse::<XpAmount>().unwrap().get(),
            u64::MAX
        );
    }

    proptest! {
        #[test]
        fn level_is_monotone(a in any::<u64>(), b in any::<u64>()) {
            let c = curve();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(c.level_for_xp(lo) <= c.level_for_xp(hi));
        }

        #[test]
        fn progress_stays_below_needed(total in any::<u64>(), base in 1u64..10_000, step in 0u64..10_000) {
            let c = XpCurve::new(base, step);
            let p = c.progress_within_level(total);
            prop_assert!(p.current < p.needed);
            prop_assert_eq!(c.xp_to_reach_level(p.level) + p.current, total);
        }

        #[test]
        fn thresholds_start_levels(level in 1u64..5_000) {
            let c = curve();
            let p = c.progress_within_level(c.xp_to_reach_level(level));
            prop_assert_eq!(p.level, level);
            prop_assert_eq!(p.current, 0);
        }

        #[test]
        fn tier_is_monotone(a in 0u64..200, b in 0u64..200) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(Tier::for_level(lo) <= Tier::for_level(hi));
        }
    }
}
