//! Per-session studio state.
//!
//! Each session owns its own storyboard and preference model. Requests pick a
//! session with the `X-Session-Id` header; requests without one share the
//! `default` session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use regex::Regex;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use choreo_learning::PreferenceModel;
use choreo_storyboard::StoryboardStore;

use crate::error::ApiError;
use crate::state::AppState;

pub const SESSION_HEADER: &str = "X-Session-Id";
pub const DEFAULT_SESSION: &str = "default";

static SESSION_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid session id pattern"));

/// One user's working set.
#[derive(Debug)]
pub struct StudioSession {
    pub id: String,
    pub storyboard: StoryboardStore,
    pub preferences: PreferenceModel,
}

impl StudioSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            storyboard: StoryboardStore::new(),
            preferences: PreferenceModel::new(),
        }
    }
}

/// Default idle time after which a session is dropped.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

struct SessionEntry {
    session: Arc<StudioSession>,
    /// Milliseconds since the registry epoch, refreshed on every access.
    last_seen: AtomicU64,
}

/// Registry of live sessions, bounded by `max_sessions`.
///
/// Sessions idle for longer than `ttl` are dropped. At capacity the least
/// recently used session is evicted to make room.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    max_sessions: usize,
    ttl: Duration,
    epoch: Instant,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("max_sessions", &self.max_sessions)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionRegistry {
    pub fn new(max_sessions: usize, ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
            ttl,
            epoch: Instant::now(),
        }
    }

    fn now_millis(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn is_expired(&self, entry: &SessionEntry, now: u64) -> bool {
        let idle = now.saturating_sub(entry.last_seen.load(Ordering::Relaxed));
        u128::from(idle) >= self.ttl.as_millis()
    }

    /// Get the session for `id`, creating it on first use.
    pub async fn get_or_create(&self, id: &str) -> Arc<StudioSession> {
        {
            let sessions = self.sessions.read().await;
            if let Some(entry) = sessions.get(id) {
                let now = self.now_millis();
                if !self.is_expired(entry, now) {
                    entry.last_seen.store(now, Ordering::Relaxed);
                    return Arc::clone(&entry.session);
                }
            }
        }

        let mut sessions = self.sessions.write().await;
        let now = self.now_millis();

        let before = sessions.len();
        sessions.retain(|_, entry| !self.is_expired(entry, now));
        if sessions.len() < before {
            debug!(removed = before - sessions.len(), "Dropped idle studio sessions");
        }

        // Double-check after acquiring write lock
        if let Some(entry) = sessions.get(id) {
            entry.last_seen.store(now, Ordering::Relaxed);
            return Arc::clone(&entry.session);
        }

        if sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen.load(Ordering::Relaxed))
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                warn!(evicted = %oldest, "Session registry at capacity, evicted least recently used session");
            }
        }

        let session = Arc::new(StudioSession::new(id));
        sessions.insert(
            id.to_string(),
            SessionEntry {
                session: Arc::clone(&session),
                last_seen: AtomicU64::new(now),
            },
        );
        info!(session_id = %id, active = sessions.len(), "Created studio session");
        session
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

pub fn is_valid_session_id(id: &str) -> bool {
    SESSION_ID_PATTERN.is_match(id)
}

/// Extractor resolving the caller's [`StudioSession`].
pub struct Session(pub Arc<StudioSession>);

#[axum::async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let id = match parts.headers.get(SESSION_HEADER) {
            Some(value) => value
                .to_str()
                .map_err(|_| ApiError::bad_request("X-Session-Id must be ASCII"))?
                .trim(),
            None => DEFAULT_SESSION,
        };

        if !is_valid_session_id(id) {
            return Err(ApiError::bad_request(
                "X-Session-Id must be 1-64 characters of letters, digits, '-' or '_'",
            ));
        }

        debug!(session_id = %id, "Resolved session");
        Ok(Session(state.sessions.get_or_create(id).await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_validation() {
        assert!(is_valid_session_id("default"));
        assert!(is_valid_session_id("user_42-a"));
        assert!(!is_valid_session_id(""));
        assert!(!is_valid_session_id("has space"));
        assert!(!is_valid_session_id(&"x".repeat(65)));
    }

    #[tokio::test]
    async fn test_registry_reuses_sessions() {
        let registry = SessionRegistry::new(4, DEFAULT_SESSION_TTL);
        let a = registry.get_or_create("a").await;
        let again = registry.get_or_create("a").await;
        assert!(Arc::ptr_eq(&a, &again));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_idle_sessions_expire_and_free_slots() {
        let registry = SessionRegistry::new(3, Duration::from_millis(20));
        for id in ["x1", "x2", "x3"] {
            registry.get_or_create(id).await;
        }
        assert_eq!(registry.len().await, 3);

        tokio::time::sleep(Duration::from_millis(50)).await;

        let fresh = registry.get_or_create("new-user").await;
        assert_eq!(fresh.id, "new-user");
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_expired_session_starts_over() {
        let registry = SessionRegistry::new(4, Duration::from_millis(20));
        let first = registry.get_or_create("a").await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = registry.get_or_create("a").await;
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let registry = SessionRegistry::new(2, DEFAULT_SESSION_TTL);
        let a = registry.get_or_create("a").await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        registry.get_or_create("b").await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        // Touching "a" makes "b" the oldest
        registry.get_or_create("a").await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        registry.get_or_create("c").await;
        assert_eq!(registry.len().await, 2);
        assert!(Arc::ptr_eq(&a, &registry.get_or_create("a").await));

        let sessions = registry.sessions.read().await;
        assert!(sessions.contains_key("c"));
        assert!(!sessions.contains_key("b"));
    }
}
