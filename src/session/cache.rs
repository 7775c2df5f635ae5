//! Session cache keyed by (token, proxy)
//!
//! Sessions live for the lifetime of the process only. An entry is dropped
//! as soon as the service logs its session out, so the memory backend only
//! hits when a pair is bootstrapped again while its session is still live.

use std::sync::Arc;

use dashmap::DashMap;

use crate::models::{Session, SessionKey};

/// Cache backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionCacheKind {
    Memory,
    #[default]
    None,
}

impl SessionCacheKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "mem" => Some(Self::Memory),
            "none" | "off" | "disabled" => Some(Self::None),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::None => "none",
        }
    }
}

/// Load/save contract for established sessions
pub trait SessionCache: Send + Sync {
    fn load(&self, key: &SessionKey) -> Option<Session>;

    fn save(&self, session: &Session);

    /// Drop a session the service has revoked
    fn invalidate(&self, key: &SessionKey);

    fn name(&self) -> &'static str;
}

/// In-process cache backed by a concurrent map
#[derive(Debug, Default)]
pub struct MemorySessionCache {
    sessions: DashMap<SessionKey, Session>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionCache for MemorySessionCache {
    fn load(&self, key: &SessionKey) -> Option<Session> {
        self.sessions
            .get(key)
            .filter(|s| s.uid().is_some())
            .map(|s| s.clone())
    }

    fn save(&self, session: &Session) {
        self.sessions.insert(session.key.clone(), session.clone());
    }

    fn invalidate(&self, key: &SessionKey) {
        self.sessions.remove(key);
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Never hits; every bootstrap creates a fresh session
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSessionCache;

impl SessionCache for NoopSessionCache {
    fn load(&self, _key: &SessionKey) -> Option<Session> {
        None
    }

    fn save(&self, _session: &Session) {}

    fn invalidate(&self, _key: &SessionKey) {}

    fn name(&self) -> &'static str {
        "none"
    }
}

pub fn create_cache(kind: SessionCacheKind) -> Arc<dyn SessionCache> {
    match kind {
        SessionCacheKind::Memory => Arc::new(MemorySessionCache::new()),
        SessionCacheKind::None => Arc::new(NoopSessionCache),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccountInfo;
    use crate::test_utils::proxy;
    use serde_json::json;
    use uuid::Uuid;

    fn session(uid: Option<&str>) -> Session {
        let data = match uid {
            Some(uid) => json!({ "uid": uid }),
            None => json!({}),
        };
        Session::new(
            SessionKey::new("token-1", proxy("10.0.0.1:80")),
            AccountInfo::from_data(data),
            Uuid::new_v4(),
        )
    }

    #[test]
    fn test_cache_kind_parsing() {
        assert_eq!(SessionCacheKind::from_str("Memory"), Some(SessionCacheKind::Memory));
        assert_eq!(SessionCacheKind::from_str("off"), Some(SessionCacheKind::None));
        assert_eq!(SessionCacheKind::from_str("redis"), None);
        assert_eq!(SessionCacheKind::None.as_str(), "none");
        assert_eq!(SessionCacheKind::default(), SessionCacheKind::None);
    }

    #[test]
    fn test_memory_cache_round_trip_and_invalidate() {
        let cache = MemorySessionCache::new();
        let stored = session(Some("u1"));
        let key = stored.key.clone();

        assert!(cache.load(&key).is_none());
        cache.save(&stored);
        assert_eq!(cache.len(), 1);

        let loaded = cache.load(&key).unwrap();
        assert_eq!(loaded.uid().unwrap(), "u1");
        assert_eq!(loaded.browser_id, stored.browser_id);

        cache.invalidate(&key);
        assert!(cache.load(&key).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_memory_cache_ignores_sessions_without_uid() {
        let cache = MemorySessionCache::new();
        let stored = session(None);
        cache.save(&stored);
        assert!(cache.load(&stored.key).is_none());
    }

    #[test]
    fn test_noop_cache_never_hits() {
        let cache = create_cache(SessionCacheKind::None);
        let stored = session(Some("u1"));
        cache.save(&stored);
        assert!(cache.load(&stored.key).is_none());
        assert_eq!(cache.name(), "none");
        assert_eq!(create_cache(SessionCacheKind::Memory).name(), "memory");
    }
}
