//! Daily study streak: state, status rules, and the engine.

mod engine;
mod policy;
mod state;
mod status;

pub use engine::{Lifecycle, StreakEngine, StreakSnapshot};
pub use policy::StreakPolicy;
pub use state::{MemorialDto, StreakMemorial, StreakState, StreakStateDto};
pub use status::{derive_status, StatusReading, StreakStatus};
