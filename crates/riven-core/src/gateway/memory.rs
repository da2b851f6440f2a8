use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::PersistenceGateway;
use crate::error::GatewayError;
use crate::streak::StreakStateDto;

/// In-memory gateway with switchable failures.
///
/// Keeps every successful save so tests can inspect ordering.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    stored: Mutex<Option<StreakStateDto>>,
    saves: Mutex<Vec<StreakStateDto>>,
    fail_load: AtomicBool,
    fail_save: AtomicBool,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: StreakStateDto) -> Self {
        let gateway = Self::default();
        *gateway.stored.lock().unwrap_or_else(|e| e.into_inner()) = Some(state);
        gateway
    }

    pub fn stored(&self) -> Option<StreakStateDto> {
        self.stored.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Successful saves, oldest first.
    pub fn saves(&self) -> Vec<StreakStateDto> {
        self.saves.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_fail_load(&self, fail: bool) {
        self.fail_load.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_save(&self, fail: bool) {
        self.fail_save.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self) -> Result<Option<StreakStateDto>, GatewayError> {
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("load disabled".into()));
        }
        Ok(self.stored())
    }

    async fn save(&self, state: &StreakStateDto) -> Result<(), GatewayError> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("save disabled".into()));
        }
        *self.stored.lock().unwrap_or_else(|e| e.into_inner()) = Some(state.clone());
        self.saves
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(state.clone());
        Ok(())
    }
}
