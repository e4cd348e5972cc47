//! # Stretchzone Core Library
//!
//! This library provides the progress and challenge engine behind the
//! Stretchzone personal-growth app. It follows a CLI-first philosophy: every
//! operation is available through the standalone `stretchzone` binary, and
//! any GUI is a thin layer over the same engine.
//!
//! ## Architecture
//!
//! - **Clock**: the single source of "today" as a local date-key
//! - **Challenge rotation**: one challenge per calendar day, swappable on demand
//! - **Progress**: XP total, derived level/tier, append-only mood log
//! - **Storage**: async key-value gateway (SQLite or in-memory) behind a
//!   coalescing write queue, plus TOML configuration
//!
//! ## Key Components
//!
//! - [`Engine`]: owns the save state; accessors and commands
//! - [`RotationManager`]: daily challenge selection
//! - [`XpCurve`]: level math
//! - [`KeyValueStore`]: persistence gateway trait
//! - [`Config`]: engine configuration management

pub mod challenge;
pub mod clock;
pub mod engine;
pub mod error;
pub mod events;
pub mod progress;
pub mod storage;

pub use challenge::{
    Challenge, ChallengeAssignment, ChallengeCatalog, InOrderPolicy, RandomPolicy,
    RotationManager, SelectionPolicy, StaticCatalog,
};
pub use clock::{Clock, DateKey, ManualClock, SystemClock};
pub use engine::{Engine, EngineBuilder};
pub use error::{ConfigError, CoreError, Result};
pub use events::Event;
pub use progress::{
    CompletionRecord, LevelProgress, Mood, MoodEntry, MoodLog, ProgressAggregate,
    ProgressSummary, Tier, XpAmount, XpCurve,
};
pub use storage::{Config, KeyValueStore, MemoryStore, SqliteStore, WriteQueue};
