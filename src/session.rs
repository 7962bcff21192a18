//! Authenticated sessions.
//!
//! A login issues an opaque bearer token that maps to a [`Session`]. The
//! [`SessionStore`] is created once at startup and shared through
//! `AppState`; it can be written to and restored from a JSON snapshot so
//! sessions survive a restart.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, PrimitiveDateTime};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::UserRole;
use crate::error::{AppError, AppResult};

/// The authenticated principal behind a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub role: UserRole,
    pub mentor_id: Option<Uuid>,
    pub freelancer_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl Session {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    pub fn require_mentor(&self) -> AppResult<Uuid> {
        self.mentor_id
            .ok_or_else(|| AppError::Authorization("Only mentors can do this".to_string()))
    }

    pub fn require_freelancer(&self) -> AppResult<Uuid> {
        self.freelancer_id
            .ok_or_else(|| AppError::Authorization("Only freelancers can do this".to_string()))
    }

    pub fn require_role(&self, role: UserRole) -> AppResult<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(AppError::Authorization(format!(
                "This action is restricted to the {:?} role",
                role
            )))
        }
    }
}

/// `now + ttl`, saturating at the largest representable instant.
fn expiry(now: OffsetDateTime, ttl: Duration) -> OffsetDateTime {
    time::Duration::try_from(ttl)
        .ok()
        .and_then(|ttl| now.checked_add(ttl))
        .unwrap_or_else(|| PrimitiveDateTime::MAX.assume_utc())
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    ttl: Duration,
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn issue(
        &self,
        user_id: Uuid,
        role: UserRole,
        mentor_id: Option<Uuid>,
        freelancer_id: Option<Uuid>,
    ) -> Session {
        let now = OffsetDateTime::now_utc();
        let session = Session {
            token: format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()),
            user_id,
            role,
            mentor_id,
            freelancer_id,
            issued_at: now,
            expires_at: expiry(now, self.ttl),
        };
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, existing| !existing.is_expired(now));
        sessions.insert(session.token.clone(), session.clone());
        session
    }

    /// Resolve a token, dropping it if it has expired.
    pub async fn resolve(&self, token: &str, now: OffsetDateTime) -> Option<Session> {
        let session = self.sessions.read().await.get(token).cloned()?;
        if session.is_expired(now) {
            self.sessions.write().await.remove(token);
            return None;
        }
        Some(session)
    }

    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn snapshot(&self) -> serde_json::Result<String> {
        let now = OffsetDateTime::now_utc();
        let sessions = self.sessions.read().await;
        let mut list: Vec<&Session> = sessions.values().filter(|s| !s.is_expired(now)).collect();
        list.sort_by_key(|s| s.issued_at);
        serde_json::to_string(&list)
    }

    /// Load sessions from a snapshot, skipping the ones already expired.
    /// Returns how many were restored.
    pub async fn restore(&self, snapshot: &str, now: OffsetDateTime) -> serde_json::Result<usize> {
        let list: Vec<Session> = serde_json::from_str(snapshot)?;
        let mut sessions = self.sessions.write().await;
        let mut restored = 0;
        for session in list.into_iter().filter(|s| !s.is_expired(now)) {
            sessions.insert(session.token.clone(), session);
            restored += 1;
        }
        Ok(restored)
    }

    pub async fn persist_to(&self, path: &Path) -> Result<()> {
        let snapshot = self.snapshot().await.context("Failed to serialize sessions")?;
        tokio::fs::write(path, snapshot)
            .await
            .with_context(|| format!("Failed to write session snapshot to {}", path.display()))?;
        info!(path = %path.display(), "Session snapshot written");
        Ok(())
    }

    pub async fn load_from(&self, path: &Path) -> Result<usize> {
        let snapshot = match tokio::fs::read_to_string(path).await {
            Ok(snapshot) => snapshot,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No session snapshot to restore");
                return Ok(0);
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read session snapshot {}", path.display()))
            }
        };
        let restored = self
            .restore(&snapshot, OffsetDateTime::now_utc())
            .await
            .context("Failed to parse session snapshot")?;
        info!(restored, "Sessions restored from snapshot");
        Ok(restored)
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Extractor for routes that require a logged-in principal.
#[derive(Debug, Clone)]
pub struct AuthSession(pub Session);

/// Extractor for routes that decide themselves what to do without one.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<Session>);

impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = match bearer_token(parts) {
            Some(token) => state.sessions.resolve(token, OffsetDateTime::now_utc()).await,
            None => None,
        };
        Ok(MaybeSession(session))
    }
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let MaybeSession(session) = MaybeSession::from_request_parts(parts, state).await?;
        session
            .map(AuthSession)
            .ok_or_else(|| AppError::Authentication("You must be logged in.".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration as TimeDuration;

    #[tokio::test]
    async fn issued_tokens_resolve_until_expiry() {
        let store = SessionStore::new(Duration::from_secs(60));
        let session = store.issue(Uuid::now_v7(), UserRole::User, None, None).await;

        let now = OffsetDateTime::now_utc();
        assert_eq!(store.resolve(&session.token, now).await, Some(session.clone()));
        assert_eq!(store.resolve(&session.token, now + TimeDuration::minutes(2)).await, None);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn issuing_drops_expired_sessions() {
        let store = SessionStore::new(Duration::ZERO);
        for _ in 0..100 {
            store.issue(Uuid::now_v7(), UserRole::User, None, None).await;
        }
        // Each issue evicts the previous, already expired, session.
        assert_eq!(store.len().await, 1);

        let live = SessionStore::new(Duration::from_secs(60));
        for _ in 0..3 {
            live.issue(Uuid::now_v7(), UserRole::User, None, None).await;
        }
        assert_eq!(live.len().await, 3);
    }

    #[tokio::test]
    async fn oversized_ttl_saturates_instead_of_overflowing() {
        let store = SessionStore::new(Duration::MAX);
        let session = store.issue(Uuid::now_v7(), UserRole::User, None, None).await;
        assert_eq!(session.expires_at, PrimitiveDateTime::MAX.assume_utc());
        assert!(store.resolve(&session.token, OffsetDateTime::now_utc()).await.is_some());
    }

    #[tokio::test]
    async fn revoked_tokens_stop_resolving() {
        let store = SessionStore::new(Duration::from_secs(60));
        let session = store
            .issue(Uuid::now_v7(), UserRole::Mentor, Some(Uuid::now_v7()), None)
            .await;
        assert!(store.revoke(&session.token).await);
        assert!(!store.revoke(&session.token).await);
        assert_eq!(store.resolve(&session.token, OffsetDateTime::now_utc()).await, None);
    }

    #[tokio::test]
    async fn snapshot_restores_live_sessions() {
        let store = SessionStore::new(Duration::from_secs(3600));
        let kept = store
            .issue(Uuid::now_v7(), UserRole::Freelancer, None, Some(Uuid::now_v7()))
            .await;
        let snapshot = store.snapshot().await.unwrap();

        let reloaded = SessionStore::new(Duration::from_secs(3600));
        let restored = reloaded.restore(&snapshot, OffsetDateTime::now_utc()).await.unwrap();
        assert_eq!(restored, 1);
        assert_eq!(
            reloaded.resolve(&kept.token, OffsetDateTime::now_utc()).await,
            Some(kept)
        );

        let later = OffsetDateTime::now_utc() + TimeDuration::hours(2);
        let expired = SessionStore::new(Duration::from_secs(3600));
        assert_eq!(expired.restore(&snapshot, later).await.unwrap(), 0);
    }

    #[test]
    fn role_checks() {
        let now = OffsetDateTime::now_utc();
        let session = Session {
            token: "t".into(),
            user_id: Uuid::now_v7(),
            role: UserRole::User,
            mentor_id: None,
            freelancer_id: None,
            issued_at: now,
            expires_at: now,
        };
        assert!(session.require_role(UserRole::User).is_ok());
        assert!(matches!(session.require_mentor(), Err(AppError::Authorization(_))));
        assert!(matches!(session.require_freelancer(), Err(AppError::Authorization(_))));
    }
}
