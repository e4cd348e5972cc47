use std::path::Path;

use clap::Subcommand;
use serde::Serialize;
use stretchzone_core::{DateKey, Mood};

use super::{open_engine, print_json, CliResult};

#[derive(Subcommand)]
pub enum MoodAction {
    /// Record how you feel right now
    Log {
        /// overwhelmed, nervous, okay, good or brave
        mood: Mood,
    },
    /// Latest check-in for today, if any
    Today,
    /// Every check-in, oldest first
    History {
        /// Only this day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<DateKey>,
    },
    /// Number of check-ins per mood
    Counts,
}

#[derive(Serialize)]
struct TodaysMood {
    date_key: DateKey,
    mood: Option<Mood>,
    label: Option<String>,
}

pub async fn run(action: MoodAction, catalog: Option<&Path>) -> CliResult {
    let mut engine = open_engine(catalog).await?;

    match action {
        MoodAction::Log { mood } => {
            let entry = engine.log_mood(mood);
            print_json(&entry)?;
        }
        MoodAction::Today => {
            let mood = engine.todays_mood();
            print_json(&TodaysMood {
                date_key: engine.today(),
                mood,
                label: mood.map(|m| format!("{} {}", m.emoji(), m.label())),
            })?;
        }
        MoodAction::History { date } => match date {
            Some(day) => print_json(&engine.moods_on(day))?,
            None => print_json(&engine.mood_history())?,
        },
        MoodAction::Counts => {
            print_json(&engine.mood_counts())?;
        }
    }

    engine.shutdown().await?;
    Ok(())
}
