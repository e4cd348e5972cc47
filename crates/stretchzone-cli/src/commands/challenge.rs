use std::path::Path;

use clap::Subcommand;
use serde::Serialize;
use stretchzone_core::{Challenge, ChallengeCatalog, DateKey};

use super::{load_catalog, open_engine, print_json, CliResult};

#[derive(Subcommand)]
pub enum ChallengeAction {
    /// Today's challenge, picking one if the day has none yet
    Today,
    /// Swap today's challenge for a different one
    Another,
    /// Mark today's challenge as done
    Complete,
    /// List the whole catalog
    List,
}

#[derive(Serialize)]
struct ChallengeView<'a> {
    date_key: DateKey,
    #[serde(flatten)]
    challenge: &'a Challenge,
    category_label: String,
}

impl<'a> ChallengeView<'a> {
    fn new(challenge: &'a Challenge, date_key: DateKey) -> Self {
        Self {
            date_key,
            challenge,
            category_label: challenge.category_label(),
        }
    }
}

pub async fn run(action: ChallengeAction, catalog: Option<&Path>) -> CliResult {
    let mut engine = open_engine(catalog).await?;
    let today = engine.today();

    match action {
        ChallengeAction::Today => {
            let challenge = engine.ensure_todays_challenge()?;
            print_json(&ChallengeView::new(&challenge, today))?;
        }
        ChallengeAction::Another => {
            let challenge = engine.request_alternate()?;
            print_json(&ChallengeView::new(&challenge, today))?;
        }
        ChallengeAction::Complete => {
            let event = engine.complete_active_challenge()?;
            print_json(&event)?;
        }
        ChallengeAction::List => {
            print_json(&load_catalog(catalog)?.list_challenges())?;
        }
    }

    engine.shutdown().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_flattens_challenge_fields() {
        let challenge = Challenge {
            id: "c1".into(),
            title: "Say hello".into(),
            description: String::new(),
            category: "small-talk".into(),
            discomfort_rating: 2,
        };
        let day = DateKey::from_ymd(2024, 5, 4).unwrap();
        let json = serde_json::to_value(ChallengeView::new(&challenge, day)).unwrap();
        assert_eq!(json["id"], "c1");
        assert_eq!(json["date_key"], "2024-05-04");
        assert_eq!(json["category_label"], "small talk");
        assert_eq!(json["discomfort_rating"], 2);
    }
}
