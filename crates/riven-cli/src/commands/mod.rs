pub mod auth;
pub mod config;
pub mod garden;
pub mod streak;

use std::sync::Arc;

use riven_core::storage::{Config, Database, SyncBackend};
use riven_core::{
    HttpGateway, LocalGateway, MemoryGateway, PersistenceGateway, StaticAuth, StreakEngine,
    StreakSession, SystemClock,
};

/// Build a session for the configured account and load its state.
///
/// Signed-out users get an inert session backed by an empty in-memory
/// gateway.
pub(crate) async fn open_session(
    config: &Config,
) -> Result<StreakSession<SystemClock>, Box<dyn std::error::Error>> {
    let user = config.signed_in_user();
    let gateway: Arc<dyn PersistenceGateway> = match user {
        None => Arc::new(MemoryGateway::new()),
        Some(user) => match config.sync.backend {
            SyncBackend::Local => Arc::new(LocalGateway::new(Database::open()?, user)),
            SyncBackend::Http => {
                let base_url = config
                    .sync
                    .base_url
                    .as_deref()
                    .ok_or("sync.base_url is required for the http backend")?;
                Arc::new(HttpGateway::new(base_url, config.sync.token.clone())?)
            }
        },
    };

    tracing::debug!(
        backend = gateway.name(),
        signed_in = user.is_some(),
        "opening streak session"
    );
    let engine = StreakEngine::new(SystemClock, config.policy());
    let auth = Arc::new(StaticAuth::new(user.is_some()));
    let session = StreakSession::start(engine, gateway, auth);
    session.load().await;
    Ok(session)
}

pub(crate) fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}
