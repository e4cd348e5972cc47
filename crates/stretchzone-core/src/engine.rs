//! The progress & challenge engine.
//!
//! An explicitly constructed instance owning the save state. Commands mutate
//! memory synchronously and hand the new bytes to a [`WriteQueue`]; reads are
//! always served from memory.
//!
//! ## Lifecycle
//!
//! ```ignore
//! let mut engine = Engine::builder(store, catalog).config(&cfg).init().await;
//! let challenge = engine.ensure_todays_challenge()?;
//! engine.log_mood(Mood::Brave);
//! engine.shutdown().await?;
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use crate::challenge::{
    Challenge, ChallengeAssignment, ChallengeCatalog, RandomPolicy, RotationManager,
    SelectionPolicy,
};
use crate::clock::{Clock, DateKey, SystemClock};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::progress::{
    CompletionRecord, LevelProgress, Mood, MoodEntry, ProgressAggregate, ProgressSummary, Tier,
    XpAmount, XpCurve,
};
use crate::storage::{
    encode, load_or_default, Config, KeyValueStore, WriteQueue, XpConfig, ASSIGNMENT_KEY,
    PROGRESS_KEY,
};

/// Undrained events kept before the oldest are dropped.
pub const MAX_BUFFERED_EVENTS: usize = 256;

/// Collects an engine's collaborators before loading state.
pub struct EngineBuilder {
    store: Arc<dyn KeyValueStore>,
    catalog: Arc<dyn ChallengeCatalog>,
    clock: Arc<dyn Clock>,
    policy: Option<Box<dyn SelectionPolicy>>,
    config: Config,
}

impl EngineBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(mut self, policy: Box<dyn SelectionPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn config(mut self, config: &Config) -> Self {
        self.config = config.clone();
        self
    }

    /// Load persisted state and start the writer. Never fails: missing or
    /// corrupt state starts from defaults.
    pub async fn init(self) -> Engine {
        let progress: ProgressAggregate = load_or_default(self.store.as_ref(), PROGRESS_KEY)
            .await
            .unwrap_or_default();
        let assignment: Option<ChallengeAssignment> =
            load_or_default(self.store.as_ref(), ASSIGNMENT_KEY).await;

        let seed = self.config.rotation.seed;
        let policy = self
            .policy
            .unwrap_or_else(|| Box::new(RandomPolicy::with_seed(seed)) as Box<dyn SelectionPolicy>);
        let rotation = RotationManager::new(
            self.catalog,
            policy,
            assignment,
            self.config.rotation.recent_window,
        );
        let writes = WriteQueue::spawn(self.store, self.config.persistence.debounce());

        tracing::debug!(
            total_xp = progress.total_xp(),
            moods = progress.mood_log().len(),
            "engine state loaded"
        );

        Engine {
            clock: self.clock,
            rotation,
            curve: self.config.xp.curve(),
            xp: self.config.xp,
            progress,
            writes,
            events: VecDeque::new(),
        }
    }
}

/// Owns the save state and exposes the read accessors and commands.
pub struct Engine {
    clock: Arc<dyn Clock>,
    rotation: RotationManager,
    progress: ProgressAggregate,
    xp: XpConfig,
    curve: XpCurve,
    writes: WriteQueue,
    events: VecDeque<Event>,
}

impl Engine {
    pub fn builder(store: Arc<dyn KeyValueStore>, catalog: Arc<dyn ChallengeCatalog>) -> EngineBuilder {
        EngineBuilder {
            store,
            catalog,
            clock: Arc::new(SystemClock),
            policy: None,
            config: Config::default(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn today(&self) -> DateKey {
        self.clock.today()
    }

    pub fn total_xp(&self) -> u64 {
        self.progress.total_xp()
    }

    pub fn curve(&self) -> &XpCurve {
        &self.curve
    }

    pub fn level(&self) -> u64 {
        self.curve.level_for_xp(self.progress.total_xp())
    }

    pub fn tier(&self) -> Tier {
        Tier::for_level(self.level())
    }

    pub fn level_progress(&self) -> LevelProgress {
        self.curve.progress_within_level(self.progress.total_xp())
    }

    pub fn progress_summary(&self) -> ProgressSummary {
        ProgressSummary::from_total(self.progress.total_xp(), &self.curve)
    }

    pub fn progress(&self) -> &ProgressAggregate {
        &self.progress
    }

    pub fn assignment(&self) -> Option<&ChallengeAssignment> {
        self.rotation.assignment()
    }

    /// Most recent mood logged today. Recomputed against the clock on each
    /// call so it resets when the app stays open past midnight.
    pub fn todays_mood(&self) -> Option<Mood> {
        let today = self.clock.today();
        self.progress.mood_log().latest_on(today).map(|e| e.mood)
    }

    pub fn mood_history(&self) -> &[MoodEntry] {
        self.progress.mood_log().entries()
    }

    pub fn moods_on(&self, day: DateKey) -> Vec<MoodEntry> {
        self.progress.mood_log().on(day).cloned().collect()
    }

    pub fn mood_counts(&self) -> std::collections::BTreeMap<Mood, usize> {
        self.progress.mood_log().counts()
    }

    pub fn completions(&self) -> &[CompletionRecord] {
        self.progress.completions()
    }

    /// Events produced since the last call, oldest first. At most
    /// [`MAX_BUFFERED_EVENTS`] are kept between calls.
    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    /// The active challenge, selecting one if none resolves. `None` only
    /// when the catalog is empty.
    pub fn active_challenge(&mut self) -> Option<Challenge> {
        if let Some(challenge) = self.rotation.resolve_active() {
            return Some(challenge);
        }
        match self.ensure_todays_challenge() {
            Ok(challenge) => Some(challenge),
            Err(e) => {
                tracing::debug!(error = %e, "no active challenge");
                None
            }
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Today's challenge. Repeated calls on one calendar day return the
    /// same challenge; a new day picks a fresh one.
    pub fn ensure_todays_challenge(&mut self) -> Result<Challenge> {
        let today = self.clock.today();
        let rotation = self.rotation.ensure_for_day(today)?;
        if rotation.changed {
            self.persist_assignment();
            self.emit(Event::ChallengeAssigned {
                challenge: rotation.challenge.clone(),
                date_key: today,
            });
        }
        Ok(rotation.challenge)
    }

    /// Swap to a different challenge. Allowed any number of times per day.
    pub fn request_alternate(&mut self) -> Result<Challenge> {
        let today = self.clock.today();
        let previous_id = self
            .rotation
            .assignment()
            .map(|a| a.active_challenge_id.clone());
        let challenge = self.rotation.alternate(today)?;
        self.persist_assignment();
        self.emit(Event::ChallengeSwapped {
            previous_id,
            challenge: challenge.clone(),
            date_key: today,
        });
        Ok(challenge)
    }

    /// Mark today's challenge done and award its XP, once per challenge
    /// per day.
    pub fn complete_active_challenge(&mut self) -> Result<Event> {
        let (today, at) = self.clock.stamp();
        let challenge = self.rotation.ensure_for_day(today)?;
        if challenge.changed {
            self.persist_assignment();
        }
        let challenge = challenge.challenge;

        let event = if self.progress.has_completed(&challenge.id, today) {
            Event::AlreadyCompleted {
                challenge_id: challenge.id,
                date_key: today,
            }
        } else {
            let previous_level = self.level();
            let xp_awarded = self.xp.completion_reward(challenge.discomfort_rating);
            let total_xp = self.progress.record_completion(CompletionRecord {
                challenge_id: challenge.id.clone(),
                date_key: today,
                xp_awarded,
                timestamp: at,
            })?;
            self.persist_progress();
            let leveled_up = self.level() > previous_level;
            if leveled_up {
                tracing::info!(level = self.level(), "level up");
            }
            Event::ChallengeCompleted {
                challenge_id: challenge.id,
                date_key: today,
                xp_awarded,
                total_xp,
                leveled_up,
                at,
            }
        };
        self.emit(event.clone());
        Ok(event)
    }

    /// Add XP. Zero succeeds without touching storage; an award that would
    /// overflow is rejected before any state changes.
    pub fn award_xp(&mut self, amount: XpAmount) -> Result<u64> {
        if amount.is_zero() {
            return Ok(self.progress.total_xp());
        }
        let previous_level = self.level();
        let total_xp = self.progress.add_xp(amount)?;
        self.persist_progress();

        let new_level = self.level();
        if new_level > previous_level {
            tracing::info!(level = new_level, "level up");
        }
        self.emit(Event::XpAwarded {
            amount: amount.get(),
            total_xp,
            previous_level,
            new_level,
            leveled_up: new_level > previous_level,
            tier: Tier::for_level(new_level),
        });
        Ok(total_xp)
    }

    /// Append a check-in for today. Earlier check-ins stay in the history.
    pub fn log_mood(&mut self, mood: Mood) -> MoodEntry {
        let (date_key, timestamp) = self.clock.stamp();
        let entry = MoodEntry {
            date_key,
            mood,
            timestamp,
        };
        self.progress.append_mood(entry.clone());
        self.persist_progress();
        self.emit(Event::MoodLogged {
            mood,
            date_key: entry.date_key,
            at: entry.timestamp,
        });
        entry
    }

    /// Wipe all progress and the challenge assignment.
    pub fn reset(&mut self) {
        self.progress = ProgressAggregate::default();
        self.rotation.clear();
        self.writes.enqueue_remove(PROGRESS_KEY);
        self.writes.enqueue_remove(ASSIGNMENT_KEY);
        tracing::info!("progress reset");
        self.emit(Event::ProgressReset {
            at: self.clock.now(),
        });
    }

    // ── Persistence ──────────────────────────────────────────────────

    /// Wait for every scheduled write to land.
    ///
    /// # Errors
    /// Returns [`CoreError::PersistenceWriteFailure`] if the store rejects a
    /// write; the value stays queued and in-memory state is unaffected.
    pub async fn flush(&self) -> Result<()> {
        self.writes.flush().await
    }

    /// Retry writes left over from an earlier failure, e.g. on app resume.
    pub fn resume(&self) {
        self.writes.resume();
    }

    /// Keys whose latest value has not reached the store yet.
    pub fn pending_writes(&self) -> Vec<String> {
        self.writes.pending_keys()
    }

    /// Flush and stop the writer.
    pub async fn shutdown(self) -> Result<()> {
        self.writes.shutdown().await
    }

    fn emit(&mut self, event: Event) {
        if self.events.len() == MAX_BUFFERED_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    fn persist_progress(&self) {
        self.enqueue(PROGRESS_KEY, encode(&self.progress));
    }

    fn persist_assignment(&self) {
        match self.rotation.assignment() {
            Some(assignment) => self.enqueue(ASSIGNMENT_KEY, encode(assignment)),
            None => self.writes.enqueue_remove(ASSIGNMENT_KEY),
        }
    }

    fn enqueue(&self, key: &str, bytes: Result<Vec<u8>>) {
        match bytes {
            Ok(bytes) => self.writes.enqueue(key, bytes),
            Err(e) => {
                let err = CoreError::PersistenceWriteFailure {
                    key: key.to_string(),
                    message: e.to_string(),
                };
                tracing::warn!(error = %err, "could not encode state");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::{InOrderPolicy, StaticCatalog};
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;

    fn catalog() -> Arc<dyn ChallengeCatalog> {
        Arc::new(StaticCatalog::new(vec![
            Challenge {
                id: "c1".into(),
                title: "Compliment a stranger".into(),
                description: String::new(),
                category: "social".into(),
                discomfort_rating: 2,
            },
            Challenge {
                id: "c2".into(),
                title: "Ask a question in a meeting".into(),
                description: String::new(),
                category: "work".into(),
                discomfort_rating: 3,
            },
        ]))
    }

    async fn engine(store: Arc<MemoryStore>, clock: Arc<ManualClock>) -> Engine {
        let mut config = Config::default();
        config.persistence.debounce_ms = 0;
        Engine::builder(store, catalog())
            .clock(clock)
            .policy(Box::new(InOrderPolicy))
            .config(&config)
            .init()
            .await
    }

    fn start_day() -> DateKey {
        DateKey::from_ymd(2024, 6, 1).unwrap()
    }

    #[tokio::test]
    async fn zero_award_is_a_silent_success() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(start_day()));
        let mut engine = engine(store.clone(), clock).await;
        assert_eq!(engine.award_xp(XpAmount::ZERO).unwrap(), 0);
        engine.flush().await.unwrap();
        assert_eq!(store.write_count(), 0);
        assert!(engine.take_events().is_empty());
    }

    #[tokio::test]
    async fn level_up_is_reported() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(start_day()));
        let mut engine = engine(store, clock).await;
        engine.award_xp(XpAmount::new(99)).unwrap();
        engine.award_xp(XpAmount::new(1)).unwrap();
        let events = engine.take_events();
        match events.last().unwrap() {
            Event::XpAwarded {
                previous_level,
                new_level,
                leveled_up,
                ..
            } => {
                assert_eq!(*previous_level, 1);
                assert_eq!(*new_level, 2);
                assert!(*leveled_up);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn completion_awards_once_per_day() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(start_day()));
        let mut engine = engine(store, clock.clone()).await;

        let first = engine.complete_active_challenge().unwrap();
        assert!(matches!(first, Event::ChallengeCompleted { xp_awarded: 40, .. }));
        let second = engine.complete_active_challenge().unwrap();
        assert!(matches!(second, Event::AlreadyCompleted { .. }));
        assert_eq!(engine.total_xp(), 40);

        clock.advance_days(1);
        let next_day = engine.complete_active_challenge().unwrap();
        assert!(matches!(next_day, Event::ChallengeCompleted { xp_awarded: 50, .. }));
        assert_eq!(engine.completions().len(), 2);
    }

    #[tokio::test]
    async fn todays_mood_clears_at_midnight() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(start_day()));
        let mut engine = engine(store, clock.clone()).await;
        engine.log_mood(Mood::Nervous);
        assert_eq!(engine.todays_mood(), Some(Mood::Nervous));
        clock.advance_days(1);
        assert_eq!(engine.todays_mood(), None);
        assert_eq!(engine.mood_history().len(), 1);
    }

    #[tokio::test]
    async fn reset_removes_persisted_state() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(start_day()));
        let mut engine = engine(store.clone(), clock).await;
        engine.ensure_todays_challenge().unwrap();
        engine.award_xp(XpAmount::new(10)).unwrap();
        engine.flush().await.unwrap();
        assert!(store.snapshot(PROGRESS_KEY).is_some());

        engine.reset();
        engine.flush().await.unwrap();
        assert!(store.snapshot(PROGRESS_KEY).is_none());
        assert!(store.snapshot(ASSIGNMENT_KEY).is_none());
        assert_eq!(engine.total_xp(), 0);
        assert!(engine.assignment().is_none());
    }

    #[tokio::test]
    async fn active_challenge_is_none_for_empty_catalog() {
        let store = Arc::new(MemoryStore::new());
        let mut engine = Engine::builder(store, Arc::new(StaticCatalog::default()))
            .clock(Arc::new(ManualClock::new(start_day())))
            .init()
            .await;
        assert!(engine.active_challenge().is_none());
        assert!(matches!(
            engine.request_alternate(),
            Err(CoreError::NoChallengesAvailable)
        ));
    }

    #[tokio::test]
    async fn same_day_reads_do_not_buffer_events() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(start_day()));
        let mut engine = engine(store, clock).await;
        for _ in 0..10_000 {
            engine.ensure_todays_challenge().unwrap();
            engine.active_challenge().unwrap();
        }
        let events = engine.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::ChallengeAssigned { .. }));
    }

    #[tokio::test]
    async fn undrained_events_are_capped() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(start_day()));
        let mut engine = engine(store, clock).await;
        for _ in 0..(MAX_BUFFERED_EVENTS + 50) {
            engine.log_mood(Mood::Okay);
        }
        engine.award_xp(XpAmount::new(5)).unwrap();
        let events = engine.take_events();
        assert_eq!(events.len(), MAX_BUFFERED_EVENTS);
        assert!(matches!(events.last(), Some(Event::XpAwarded { .. })));
    }

    #[tokio::test]
    async fn mood_entry_day_and_timestamp_come_from_one_reading() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(start_day()));
        let mut engine = engine(store, clock.clone()).await;
        clock.advance_days(1);
        let entry = engine.log_mood(Mood::Good);
        assert_eq!(entry.date_key, start_day().offset_days(1));
        assert_eq!(entry.timestamp, clock.now());
        match engine.complete_active_challenge().unwrap() {
            Event::ChallengeCompleted { date_key, at, .. } => {
                assert_eq!(date_key, entry.date_key);
                assert_eq!(at, entry.timestamp);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
