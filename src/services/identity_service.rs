use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, info};
use uuid::Uuid;

use crate::errors::BlogError;
use crate::models::session::SessionClaims;
use crate::models::user::{NewUser, User};
use crate::repositories::{SessionRepository, UserRepository};
use crate::services::clock::Clock;
use crate::services::password::PasswordHashing;

/// A login bound to one user. `token` goes into the session cookie.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub user: User,
    pub token: String,
}

pub struct IdentityService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    hasher: Arc<dyn PasswordHashing>,
    clock: Arc<dyn Clock>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    // Expiry is checked against `clock`, not the system time.
    validation: Validation,
    session_ttl: Duration,
    // Verified against when the username is unknown, so a miss costs as much
    // as a wrong password.
    dummy_hash: String,
}

impl IdentityService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        hasher: Arc<dyn PasswordHashing>,
        clock: Arc<dyn Clock>,
        secret_key: &str,
        session_ttl: Duration,
    ) -> Result<Self, BlogError> {
        let dummy_hash = hasher.hash(&Uuid::new_v4().to_string())?;
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        Ok(Self {
            users,
            sessions,
            hasher,
            clock,
            encoding_key: EncodingKey::from_secret(secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret_key.as_bytes()),
            validation,
            session_ttl,
            dummy_hash,
        })
    }

    /// Checks credentials and registers a new session for the user. Sessions
    /// past their lifetime are swept on the way.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Session, BlogError> {
        let user = match self.users.find_user_by_username(username).await? {
            Some(user) if self.hasher.verify(password, &user.password_hash) => user,
            Some(_) => {
                debug!("password mismatch for existing account");
                return Err(BlogError::AuthenticationFailed);
            }
            None => {
                let _ = self.hasher.verify(password, &self.dummy_hash);
                debug!("login attempt for unknown account");
                return Err(BlogError::AuthenticationFailed);
            }
        };

        let now = self.clock.now();
        let purged = self.sessions.delete_sessions_before(now - self.session_ttl).await?;
        if purged > 0 {
            debug!("purged {} expired sessions", purged);
        }

        let session_id = Uuid::new_v4();
        self.sessions.insert_session(session_id, user.id, now).await?;

        let claims = SessionClaims {
            sub: user.id,
            sid: session_id,
            iat: now.timestamp().max(0) as usize,
            exp: (now + self.session_ttl).timestamp().max(0) as usize,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| BlogError::Internal(format!("failed to sign session: {}", e)))?;

        info!("user {} logged in", user.id);
        Ok(Session { id: session_id, user, token })
    }

    /// Resolves a session token to its user. Bad signatures, expired tokens
    /// and revoked sessions all come back as `None`.
    pub async fn current_user(&self, token: &str) -> Result<Option<Session>, BlogError> {
        let claims = match decode::<SessionClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                debug!("rejecting session token: {}", e);
                return Ok(None);
            }
        };

        let now = self.clock.now();
        if claims.exp as i64 <= now.timestamp() {
            debug!("session {} token expired", claims.sid);
            return Ok(None);
        }

        match self.sessions.find_session(claims.sid).await? {
            Some(record) if record.user_id == claims.sub && record.created_at + self.session_ttl > now => {}
            _ => return Ok(None),
        }

        let user = self.users.find_user_by_id(claims.sub).await?;
        Ok(user.map(|user| Session {
            id: claims.sid,
            user,
            token: token.to_string(),
        }))
    }

    pub async fn end_session(&self, session_id: Uuid) -> Result<(), BlogError> {
        self.sessions.delete_session(session_id).await?;
        debug!("session {} ended", session_id);
        Ok(())
    }

    /// Seeds an account if the username is free. Returns whether one was made.
    pub async fn ensure_account(&self, username: &str, password: &str) -> Result<bool, BlogError> {
        if self.users.find_user_by_username(username).await?.is_some() {
            return Ok(false);
        }
        let password_hash = self.hasher.hash(password)?;
        self.users
            .insert_user(NewUser {
                username: username.to_string(),
                password_hash,
            })
            .await?;
        info!("created default account `{}`", username);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    use crate::repositories::MemoryStore;
    use crate::services::clock::SystemClock;
    use crate::services::password::Argon2Hashing;

    async fn service(store: Arc<MemoryStore>) -> IdentityService {
        let svc = IdentityService::new(
            store.clone(),
            store,
            Arc::new(Argon2Hashing::default()),
            Arc::new(SystemClock),
            "test-secret",
            Duration::hours(1),
        )
        .unwrap();
        svc.ensure_account("admin", "admin").await.unwrap();
        svc
    }

    #[tokio::test]
    async fn valid_credentials_bind_session_to_user() {
        let svc = service(Arc::new(MemoryStore::new())).await;
        let session = svc.authenticate("admin", "admin").await.unwrap();

        let current = svc.current_user(&session.token).await.unwrap().unwrap();
        assert_eq!(current.user.username, "admin");
        assert_eq!(current.id, session.id);
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_password_fail_alike() {
        let svc = service(Arc::new(MemoryStore::new())).await;

        let wrong_password = svc.authenticate("admin", "nope").await.unwrap_err();
        let unknown_user = svc.authenticate("ghost", "admin").await.unwrap_err();

        assert!(matches!(wrong_password, BlogError::AuthenticationFailed));
        assert!(matches!(unknown_user, BlogError::AuthenticationFailed));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn ended_session_no_longer_resolves() {
        let svc = service(Arc::new(MemoryStore::new())).await;
        let session = svc.authenticate("admin", "admin").await.unwrap();

        svc.end_session(session.id).await.unwrap();
        assert!(svc.current_user(&session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn token_signed_with_other_key_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone()).await;
        let other = IdentityService::new(
            store.clone(),
            store,
            Arc::new(Argon2Hashing::default()),
            Arc::new(SystemClock),
            "another-secret",
            Duration::hours(1),
        )
        .unwrap();

        let session = other.authenticate("admin", "admin").await.unwrap();
        assert!(svc.current_user(&session.token).await.unwrap().is_none());
        assert!(svc.current_user("garbage").await.unwrap().is_none());
    }

    /// Stays put until moved forward.
    struct ManualClock(std::sync::Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn advance(&self, by: Duration) {
            *self.0.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    #[tokio::test]
    async fn expired_session_is_rejected_and_swept_on_next_login() {
        let store = Arc::new(MemoryStore::new());
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let clock = Arc::new(ManualClock(std::sync::Mutex::new(start)));
        let svc = IdentityService::new(
            store.clone(),
            store.clone(),
            Arc::new(Argon2Hashing::default()),
            clock.clone(),
            "test-secret",
            Duration::hours(1),
        )
        .unwrap();
        svc.ensure_account("admin", "admin").await.unwrap();

        let old = svc.authenticate("admin", "admin").await.unwrap();
        clock.advance(Duration::minutes(59));
        assert!(svc.current_user(&old.token).await.unwrap().is_some());

        clock.advance(Duration::minutes(2));
        assert!(svc.current_user(&old.token).await.unwrap().is_none());
        assert!(store.find_session(old.id).await.unwrap().is_some());

        let fresh = svc.authenticate("admin", "admin").await.unwrap();
        assert!(store.find_session(old.id).await.unwrap().is_none());
        assert!(svc.current_user(&fresh.token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn ensure_account_is_idempotent() {
        let svc = service(Arc::new(MemoryStore::new())).await;
        assert!(!svc.ensure_account("admin", "other").await.unwrap());
        assert!(svc.authenticate("admin", "admin").await.is_ok());
    }
}
