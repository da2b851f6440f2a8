use clap::Subcommand;

use riven_core::storage::Config;

#[derive(Subcommand)]
pub enum GardenAction {
    /// Show the garden stage for the current streak
    Show {
        /// Use this streak length instead of the stored streak
        #[arg(long)]
        days: Option<u32>,
    },
    /// List every garden stage and its threshold
    Stages,
}

pub fn run(action: GardenAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let garden = config.garden()?;

    match action {
        GardenAction::Show { days } => {
            let streak = match days {
                Some(days) => days,
                None => {
                    let runtime = super::runtime()?;
                    runtime.block_on(async {
                        let session = super::open_session(&config).await?;
                        let current = session.snapshot().current_streak;
                        session.shutdown().await;
                        Ok::<u32, Box<dyn std::error::Error>>(current)
                    })?
                }
            };
            let progress = garden.progress(streak);
            println!("{}", serde_json::to_string_pretty(&progress)?);
            match (progress.next_stage, progress.days_to_next) {
                (Some(next), Some(days)) => eprintln!(
                    "{}: {} day(s) until {}",
                    progress.stage.name, days, next.name
                ),
                _ => eprintln!("{}: fully grown", progress.stage.name),
            }
        }
        GardenAction::Stages => {
            println!("{}", serde_json::to_string_pretty(garden.stages())?);
        }
    }
    Ok(())
}
