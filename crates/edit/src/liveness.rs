#![forbid(unsafe_code)]

use std::sync::{Arc, Weak};

/// Held by a view for as long as it is mounted.
#[derive(Debug, Default)]
pub struct Liveness(Arc<()>);

/// Weak handle given to background work; goes dead when the view unmounts.
#[derive(Debug, Clone)]
pub struct LivenessToken(Weak<()>);

impl Liveness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> LivenessToken {
        LivenessToken(Arc::downgrade(&self.0))
    }
}

impl LivenessToken {
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_dies_with_owner() {
        let live = Liveness::new();
        let t = live.token();
        let t2 = t.clone();
        assert!(t.is_alive());
        drop(live);
        assert!(!t.is_alive());
        assert!(!t2.is_alive());
    }
}
