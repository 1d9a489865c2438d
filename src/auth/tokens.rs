//! Bearer token lifecycle: issue, validate, revoke and the periodic sweep.
//!
//! A token is a signed JWT *and* a row in `auth_tokens`. The signature keeps
//! forged tokens away from the database; the row makes logout effective.
//! Every check that depends on time takes `now` explicitly.

use std::{sync::Arc, time::Duration as StdDuration};

use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        jwt::JwtKeys,
        repo_types::{AuthTokenRecord, Role},
    },
    db::Store,
    error::{AppError, AppResult, AuthFailure},
};

/// Public identity resolved from a valid token. Never carries the hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn Store>,
    keys: JwtKeys,
}

impl TokenService {
    pub fn new(store: Arc<dyn Store>, keys: JwtKeys) -> Self {
        Self { store, keys }
    }

    pub async fn issue(&self, user_id: Uuid) -> AppResult<IssuedToken> {
        self.issue_at(user_id, OffsetDateTime::now_utc()).await
    }

    pub async fn issue_at(&self, user_id: Uuid, now: OffsetDateTime) -> AppResult<IssuedToken> {
        let (token, expires_at) = self.keys.sign(user_id, now)?;
        self.store
            .insert_token(AuthTokenRecord {
                token: token.clone(),
                user_id,
                expires_at,
                created_at: now,
            })
            .await?;
        Ok(IssuedToken { token, expires_at })
    }

    pub async fn validate(&self, token: &str) -> AppResult<AuthUser> {
        self.validate_at(token, OffsetDateTime::now_utc()).await
    }

    pub async fn validate_at(&self, token: &str, now: OffsetDateTime) -> AppResult<AuthUser> {
        let claims = self.keys.verify(token).map_err(|e| {
            warn!(error = %e, "token rejected: bad signature or shape");
            AppError::Unauthenticated(AuthFailure::InvalidToken)
        })?;

        if claims.exp <= now.unix_timestamp() {
            warn!(user_id = %claims.sub, "token rejected: expired");
            return Err(AppError::Unauthenticated(AuthFailure::TokenExpired));
        }

        let Some(record) = self.store.find_token(token).await? else {
            warn!(user_id = %claims.sub, "token rejected: revoked or unknown");
            return Err(AppError::Unauthenticated(AuthFailure::InvalidToken));
        };
        if record.expires_at <= now {
            warn!(user_id = %record.user_id, "token rejected: record expired");
            return Err(AppError::Unauthenticated(AuthFailure::TokenExpired));
        }

        let Some(user) = self.store.find_user_by_id(record.user_id).await? else {
            warn!(user_id = %record.user_id, "token rejected: user not found");
            return Err(AppError::Unauthenticated(AuthFailure::UserNotFound));
        };

        Ok(AuthUser {
            id: user.id,
            email: user.email,
            name: user.name,
            phone: user.phone,
            role: user.role,
        })
    }

    /// Deletes the token record. Unknown tokens are not an error.
    pub async fn revoke(&self, token: &str) -> AppResult<()> {
        let removed = self.store.delete_token(token).await?;
        debug!(removed, "token revoked");
        Ok(())
    }

    pub async fn sweep(&self, now: OffsetDateTime) -> AppResult<u64> {
        self.store.delete_expired_tokens(now).await
    }
}

/// Spawns the expired-token sweep. Failures are logged and the loop keeps going.
pub fn spawn_token_sweep(tokens: TokenService, every: StdDuration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // first tick fires immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match tokens.sweep(OffsetDateTime::now_utc()).await {
                Ok(0) => debug!("token sweep: nothing expired"),
                Ok(n) => info!(removed = n, "token sweep removed expired tokens"),
                Err(e) => warn!(error = %e, "token sweep failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{
            repo::{TokenRepo, UserRepo},
            repo_types::NewUser,
        },
        config::AppConfig,
        memory::MemoryStore,
    };
    use time::Duration;

    async fn setup() -> (Arc<MemoryStore>, TokenService, Uuid) {
        let store = Arc::new(MemoryStore::default());
        let keys = JwtKeys::from_config(&AppConfig::for_tests().jwt);
        let tokens = TokenService::new(store.clone(), keys);
        let user = store
            .insert_user(NewUser {
                email: "ada@example.com".into(),
                password_hash: "$argon2id$fake".into(),
                name: "Ada".into(),
                phone: Some("555-0100".into()),
                role: Role::Technician,
            })
            .await
            .unwrap();
        (store, tokens, user.id)
    }

    #[tokio::test]
    async fn issued_token_resolves_to_public_profile() {
        let (_store, tokens, user_id) = setup().await;
        let issued = tokens.issue(user_id).await.unwrap();
        let user = tokens.validate(&issued.token).await.unwrap();
        assert_eq!(user.id, user_id);
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.phone.as_deref(), Some("555-0100"));
        assert_eq!(user.role, Role::Technician);
    }

    #[tokio::test]
    async fn seven_day_boundary() {
        let (_store, tokens, user_id) = setup().await;
        let t = OffsetDateTime::now_utc();
        let issued = tokens.issue_at(user_id, t).await.unwrap();
        assert_eq!(issued.expires_at, t + Duration::days(7));

        assert!(tokens
            .validate_at(&issued.token, t + Duration::days(6))
            .await
            .is_ok());
        let err = tokens
            .validate_at(&issued.token, t + Duration::days(8))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Unauthenticated(AuthFailure::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn revoked_token_is_rejected_and_revoke_is_idempotent() {
        let (_store, tokens, user_id) = setup().await;
        let issued = tokens.issue(user_id).await.unwrap();
        tokens.revoke(&issued.token).await.unwrap();
        tokens.revoke(&issued.token).await.unwrap();
        tokens.revoke("never-issued").await.unwrap();

        let err = tokens.validate(&issued.token).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Unauthenticated(AuthFailure::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn revoking_one_device_keeps_the_others() {
        let (_store, tokens, user_id) = setup().await;
        let phone = tokens.issue(user_id).await.unwrap();
        let tablet = tokens.issue(user_id).await.unwrap();
        tokens.revoke(&phone.token).await.unwrap();
        assert!(tokens.validate(&tablet.token).await.is_ok());
    }

    #[tokio::test]
    async fn malformed_token_is_invalid() {
        let (_store, tokens, _) = setup().await;
        let err = tokens.validate("garbage").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Unauthenticated(AuthFailure::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn token_of_deleted_user_reports_user_not_found() {
        let (store, tokens, user_id) = setup().await;
        let issued = tokens.issue(user_id).await.unwrap();
        store.remove_user_only(user_id);
        let err = tokens.validate(&issued.token).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Unauthenticated(AuthFailure::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_tokens() {
        let (store, tokens, user_id) = setup().await;
        let now = OffsetDateTime::now_utc();
        let old = tokens.issue_at(user_id, now - Duration::days(10)).await.unwrap();
        let fresh = tokens.issue_at(user_id, now).await.unwrap();

        let removed = tokens.sweep(now).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.find_token(&old.token).await.unwrap().is_none());
        assert!(store.find_token(&fresh.token).await.unwrap().is_some());
    }
}
