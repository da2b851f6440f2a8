use clap::Subcommand;
use serde_json::json;

use riven_core::storage::Config;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Sign in as `user`
    Login {
        /// Account name used to key stored streak state
        user: String,
    },
    /// Sign out; stored streak state is kept
    Logout,
    /// Print the signed-in account
    Status,
}

pub fn run(action: AuthAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;

    match action {
        AuthAction::Login { user } => {
            let user = user.trim();
            if user.is_empty() || user.eq_ignore_ascii_case("none") {
                return Err(format!("invalid user name: '{user}'").into());
            }
            config.account.user = Some(user.to_string());
            config.save()?;
            println!("signed in as {user}");
        }
        AuthAction::Logout => {
            config.account.user = None;
            config.save()?;
            println!("signed out");
        }
        AuthAction::Status => {
            let status = json!({
                "signed_in": config.signed_in_user().is_some(),
                "user": config.signed_in_user(),
                "backend": config.sync.backend,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }
    Ok(())
}
