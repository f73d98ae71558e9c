//! Login session
//!
//! The access token and the cached user profile are kept in the
//! key-value store under `@token` and `@user`. A session is an
//! authenticated [`ApiClient`] plus the profile, if one was fetched.
//!
//! Tokens are never refreshed. The JWT payload is read (not verified)
//! only to show who is logged in and when the token expires.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::User;
use crate::storage::{KeyValueStore, StorageError};

/// Key of the stored access token
pub const TOKEN_KEY: &str = "@token";

/// Key of the cached user profile
pub const USER_KEY: &str = "@user";

/// Errors from session operations
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("session store unavailable")]
    Storage(#[from] StorageError),

    #[error("not logged in (run `eduverse login`)")]
    NotLoggedIn,
}

/// An authenticated client and the profile it belongs to
#[derive(Debug, Clone)]
pub struct Session {
    client: ApiClient,
    user: Option<User>,
}

impl Session {
    /// Log in, persist the token, and cache the profile
    ///
    /// A failure to fetch the profile does not fail the login.
    pub async fn login<S: KeyValueStore + ?Sized>(
        api: &ApiClient,
        store: &S,
        username: &str,
        password: &str,
    ) -> Result<Self, SessionError> {
        let token = api.without_token().login(username, password).await?;
        store.set(TOKEN_KEY, &token.access_token).await?;
        info!("Logged in as {}", username);

        let client = api.with_token(token.access_token);
        let user = match client.me().await {
            Ok(user) => {
                store_user(store, &user).await?;
                Some(user)
            }
            Err(e) => {
                warn!("Logged in but could not fetch profile: {}", e);
                None
            }
        };

        Ok(Self { client, user })
    }

    /// Rebuild a session from the stored token, if there is one
    pub async fn restore<S: KeyValueStore + ?Sized>(
        api: &ApiClient,
        store: &S,
    ) -> Result<Option<Self>, SessionError> {
        let Some(token) = store.get(TOKEN_KEY).await? else {
            debug!("No stored token");
            return Ok(None);
        };

        let user = match store.get(USER_KEY).await? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!("Ignoring unreadable cached profile: {}", e);
                    None
                }
            },
            None => None,
        };

        Ok(Some(Self {
            client: api.with_token(token),
            user,
        }))
    }

    /// Like [`Session::restore`], but a missing token is an error
    pub async fn require<S: KeyValueStore + ?Sized>(
        api: &ApiClient,
        store: &S,
    ) -> Result<Self, SessionError> {
        Self::restore(api, store)
            .await?
            .ok_or(SessionError::NotLoggedIn)
    }

    /// Forget the stored token and profile
    pub async fn logout<S: KeyValueStore + ?Sized>(store: &S) -> Result<(), StorageError> {
        store.remove(TOKEN_KEY).await?;
        store.remove(USER_KEY).await?;
        info!("Logged out");
        Ok(())
    }

    /// Fetch the profile again and update the cache
    pub async fn refresh_profile<S: KeyValueStore + ?Sized>(
        &mut self,
        store: &S,
    ) -> Result<&User, SessionError> {
        let user = self.client.me().await?;
        store_user(store, &user).await?;
        Ok(&*self.user.insert(user))
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Take the authenticated client
    pub fn into_client(self) -> ApiClient {
        self.client
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Claims of the session token, when it is a readable JWT
    pub fn claims(&self) -> Option<TokenClaims> {
        self.client.token().and_then(TokenClaims::decode)
    }
}

async fn store_user<S: KeyValueStore + ?Sized>(store: &S, user: &User) -> Result<(), StorageError> {
    let json = serde_json::to_string(user).map_err(|source| StorageError::Encode {
        key: USER_KEY.to_string(),
        source,
    })?;
    store.set(USER_KEY, &json).await
}

/// Unverified JWT claims
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject, the username
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiry as Unix seconds
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// Read the payload segment of a JWT; `None` if it is not one
    pub fn decode(token: &str) -> Option<Self> {
        let mut segments = token.split('.');
        let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
        if segments.next().is_some() {
            return None;
        }

        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| exp <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ClientConfig;
    use crate::storage::MemoryStore;

    fn jwt(payload: &str) -> String {
        format!(
            "{}.{}.signature",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    fn api() -> ApiClient {
        ApiClient::new(ClientConfig::new("http://localhost:8000/api/v1")).unwrap()
    }

    #[test]
    fn test_decode_claims() {
        let claims = TokenClaims::decode(&jwt(r#"{"sub":"ayse","exp":1700000000}"#)).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("ayse"));
        assert_eq!(claims.expires_at().unwrap().timestamp(), 1_700_000_000);
        assert!(claims.is_expired());
    }

    #[test]
    fn test_not_expired_before_exp() {
        let claims = TokenClaims {
            sub: None,
            exp: Some(2_000_000_000),
        };
        let now = DateTime::from_timestamp(1_999_999_999, 0).unwrap();
        assert!(!claims.is_expired_at(now));
    }

    #[test]
    fn test_opaque_token_has_no_claims() {
        assert!(TokenClaims::decode("opaque-token").is_none());
        assert!(TokenClaims::decode("a.!!!.c").is_none());
        assert!(TokenClaims::decode("a.b.c.d").is_none());
    }

    #[tokio::test]
    async fn test_restore_without_token() {
        let store = MemoryStore::new();
        assert!(Session::restore(&api(), &store).await.unwrap().is_none());
        assert!(matches!(
            Session::require(&api(), &store).await,
            Err(SessionError::NotLoggedIn)
        ));
    }

    #[tokio::test]
    async fn test_restore_uses_stored_token_and_profile() {
        let store = MemoryStore::new();
        store.set(TOKEN_KEY, "stored-token").await.unwrap();
        store
            .set(
                USER_KEY,
                r#"{"id":1,"email":"a@b.c","username":"ayse","is_active":true}"#,
            )
            .await
            .unwrap();

        let session = Session::restore(&api(), &store).await.unwrap().unwrap();
        assert_eq!(session.client().token(), Some("stored-token"));
        assert_eq!(session.user().map(|u| u.username.as_str()), Some("ayse"));
    }

    #[tokio::test]
    async fn test_restore_ignores_corrupt_profile() {
        let store = MemoryStore::new();
        store.set(TOKEN_KEY, "t").await.unwrap();
        store.set(USER_KEY, "not json").await.unwrap();

        let session = Session::restore(&api(), &store).await.unwrap().unwrap();
        assert!(session.user().is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_both_keys() {
        let store = MemoryStore::new();
        store.set(TOKEN_KEY, "t").await.unwrap();
        store.set(USER_KEY, "{}").await.unwrap();

        Session::logout(&store).await.unwrap();
        Session::logout(&store).await.unwrap();
        assert!(store.is_empty());
    }
}
