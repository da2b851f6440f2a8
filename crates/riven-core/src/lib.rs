//! # Riven Core Library
//!
//! This library provides the study streak logic behind Riven's garden.
//! It implements a CLI-first philosophy where every operation is available
//! through the standalone CLI binary; richer clients are thin layers over the
//! same core library.
//!
//! ## Architecture
//!
//! - **Streak Engine**: A clock-driven state machine tracking consecutive
//!   study days, with a grace window and memorials for broken streaks
//! - **Garden**: Pure mapping from streak length to eleven growth stages
//! - **Gateways**: Persistence (HTTP API, local SQLite, in-memory) and auth
//!   collaborators
//! - **Session**: Async wiring of the engine to its gateways, with an ordered
//!   save queue, snapshot subscriptions and a periodic break checker
//!
//! ## Key Components
//!
//! - [`StreakEngine`]: Core streak state machine
//! - [`StreakSession`]: Engine bound to persistence and auth
//! - [`GardenStages`]: Garden stage table and lookup
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod garden;
pub mod gateway;
pub mod session;
pub mod storage;
pub mod streak;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, GatewayError, ValidationError};
pub use events::{Event, StudyOutcome};
pub use garden::{stage_index, stage_of, GardenProgress, GardenStage, GardenStages};
pub use gateway::{
    AuthGateway, HttpGateway, LocalGateway, MemoryGateway, PersistenceGateway, StaticAuth,
};
pub use session::StreakSession;
pub use storage::{Config, Database};
pub use streak::{
    StreakEngine, StreakMemorial, StreakPolicy, StreakSnapshot, StreakState, StreakStateDto,
    StreakStatus,
};
