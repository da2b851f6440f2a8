//! Collaborators consumed by the streak session.
//!
//! A [`PersistenceGateway`] loads and saves the streak payload for the
//! signed-in user; an [`AuthGateway`] says whether anyone is signed in.
//! Implementations are stateless between calls apart from their own
//! connection handles.

mod auth;
mod http;
mod local;
mod memory;

pub use auth::{AuthGateway, StaticAuth};
pub use http::HttpGateway;
pub use local::LocalGateway;
pub use memory::MemoryGateway;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::streak::StreakStateDto;

/// Remote or local home of the streak payload.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Short name used in logs (e.g. "http", "local").
    fn name(&self) -> &str;

    /// Fetch the stored payload. `Ok(None)` means no record exists yet.
    async fn load(&self) -> Result<Option<StreakStateDto>, GatewayError>;

    /// Upsert the full payload.
    async fn save(&self, state: &StreakStateDto) -> Result<(), GatewayError>;
}
