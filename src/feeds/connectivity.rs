// src/feeds/connectivity.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Online/offline signal owned by the host application. Sampled, not pushed:
/// fetches read it before each attempt and after a failed one.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Shared flag; clones observe the same value.
#[derive(Debug, Clone)]
pub struct OnlineFlag {
    inner: Arc<AtomicBool>,
}

impl OnlineFlag {
    pub fn new(online: bool) -> Self {
        Self {
            inner: Arc::new(AtomicBool::new(online)),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.inner.store(online, Ordering::SeqCst);
    }
}

impl Default for OnlineFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for OnlineFlag {
    fn is_online(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let a = OnlineFlag::default();
        let b = a.clone();
        assert!(b.is_online());
        a.set_online(false);
        assert!(!b.is_online());
    }
}
