use clap::Subcommand;
use serde::Serialize;

use riven_core::storage::{Config, Database};
use riven_core::{Event, GardenProgress, StreakSnapshot};

#[derive(Subcommand)]
pub enum StreakAction {
    /// Print the current streak as JSON
    Status,
    /// Record a completed study or test session
    Study,
    /// Close out the streak if its grace window has lapsed
    Check,
    /// Erase the streak and all memorials
    Reset {
        /// Confirm the reset; it cannot be undone
        #[arg(long)]
        yes: bool,
    },
    /// Show recently recorded study sessions
    Log {
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Keep the session open, break-checking every `streak.check_interval_secs`
    /// and printing each new snapshot as a JSON line until Ctrl-C
    Watch,
}

#[derive(Serialize)]
struct Report {
    event: Option<Event>,
    streak: StreakSnapshot,
    garden: GardenProgress,
}

pub fn run(action: StreakAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    if let StreakAction::Log { limit } = action {
        let Some(user) = config.signed_in_user() else {
            return Err("not signed in; run `riven-cli auth login <user>`".into());
        };
        let entries = Database::open()?.recent_studies(user, limit)?;
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if let StreakAction::Reset { yes: false } = action {
        return Err("refusing to reset without --yes".into());
    }
    if let StreakAction::Watch = action {
        return watch(&config);
    }

    let garden = config.garden()?;
    let runtime = super::runtime()?;
    runtime.block_on(async {
        let session = super::open_session(&config).await?;
        if !session.is_loaded() {
            eprintln!("not signed in; streak changes are ignored");
        }

        let event = match action {
            StreakAction::Status | StreakAction::Log { .. } | StreakAction::Watch => None,
            StreakAction::Study => session.record_study_event(),
            StreakAction::Check => session.check_and_break_if_lapsed(),
            StreakAction::Reset { .. } => session.reset(),
        };

        if let (
            Some(Event::StudyRecorded {
                outcome,
                current_streak,
                at,
                ..
            }),
            Some(user),
        ) = (&event, config.signed_in_user())
        {
            Database::open()?.record_study(user, *outcome, *current_streak, *at)?;
        }

        let streak = session.snapshot();
        let report = Report {
            event,
            garden: garden.progress(streak.current_streak),
            streak,
        };
        session.shutdown().await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

fn watch(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let period = config.check_interval()?;
    let runtime = super::runtime()?;
    runtime.block_on(async {
        let mut session = super::open_session(config).await?;
        if !session.is_loaded() {
            session.shutdown().await;
            let err: Box<dyn std::error::Error> =
                "not signed in; run `riven-cli auth login <user>`".into();
            return Err(err);
        }
        let mut snapshots = session.subscribe();
        session.spawn_break_checker(period);
        println!("{}", serde_json::to_string(&*snapshots.borrow_and_update())?);

        loop {
            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = snapshots.borrow_and_update().clone();
                    println!("{}", serde_json::to_string(&snapshot)?);
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }
        session.shutdown().await;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
