use std::sync::atomic::{AtomicBool, Ordering};

/// Answers whether a user is currently signed in.
pub trait AuthGateway: Send + Sync {
    fn is_authenticated(&self) -> bool;
}

/// Flag-backed auth state, flipped by the host application.
#[derive(Debug, Default)]
pub struct StaticAuth {
    signed_in: AtomicBool,
}

impl StaticAuth {
    pub fn new(signed_in: bool) -> Self {
        Self {
            signed_in: AtomicBool::new(signed_in),
        }
    }

    pub fn sign_in(&self) {
        self.signed_in.store(true, Ordering::SeqCst);
    }

    pub fn sign_out(&self) {
        self.signed_in.store(false, Ordering::SeqCst);
    }
}

impl AuthGateway for StaticAuth {
    fn is_authenticated(&self) -> bool {
        self.signed_in.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggles() {
        let auth = StaticAuth::new(false);
        assert!(!auth.is_authenticated());
        auth.sign_in();
        assert!(auth.is_authenticated());
        auth.sign_out();
        assert!(!auth.is_authenticated());
    }
}
