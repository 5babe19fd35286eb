use dashmap::DashMap;
use std::sync::Arc;

use crate::app::config::SessionSeed;
use crate::models::principal::Principal;

/// Resolves bearer tokens issued by the account service into principals.
pub trait SessionStore: Send + Sync {
    fn resolve(&self, token: &str) -> Option<Principal>;
}

#[derive(Default, Clone)]
pub struct StaticSessionStore {
    sessions: Arc<DashMap<String, Principal>>,
}

impl StaticSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seeds(seeds: &[SessionSeed]) -> Self {
        let store = Self::new();
        for seed in seeds {
            store.insert(seed.token.clone(), Principal::new(seed.user_id.clone(), seed.role));
        }
        store
    }

    pub fn insert(&self, token: impl Into<String>, principal: Principal) {
        self.sessions.insert(token.into(), principal);
    }
}

impl SessionStore for StaticSessionStore {
    fn resolve(&self, token: &str) -> Option<Principal> {
        self.sessions.get(token).map(|entry| entry.clone())
    }
}
