use std::path::Path;

use clap::Subcommand;
use serde::Serialize;
use stretchzone_core::{Event, ProgressSummary, XpAmount};

use super::{open_engine, print_json, CliResult};

#[derive(Subcommand)]
pub enum XpAction {
    /// Add experience points
    Award {
        /// Whole, non-negative number of points
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },
    /// Total XP, level, tier and progress toward the next level
    Status,
}

#[derive(Serialize)]
struct AwardOutcome {
    events: Vec<Event>,
    summary: ProgressSummary,
}

pub async fn run(action: XpAction, catalog: Option<&Path>) -> CliResult {
    let mut engine = open_engine(catalog).await?;

    match action {
        XpAction::Award { amount } => {
            let amount: XpAmount = amount.parse()?;
            engine.award_xp(amount)?;
            print_json(&AwardOutcome {
                events: engine.take_events(),
                summary: engine.progress_summary(),
            })?;
        }
        XpAction::Status => {
            print_json(&engine.progress_summary())?;
        }
    }

    engine.shutdown().await?;
    Ok(())
}
