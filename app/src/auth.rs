//! Auth collaborator seam.
//!
//! Sign-up, sign-in and sign-out belong to the external auth provider. This
//! service only resolves the bearer token of a request into an [`Identity`]
//! so that every operation receives the acting user's id explicitly.
//!
//! # Usage
//!
//! ```rust,ignore
//! async fn my_events(user: SessionUser, State(state): State<AppState>) -> WebResult<...> {
//!     state.services.queries.fetch_user_events(user.identity.user_id).await?
//! }
//! ```

use crate::server::state::AppState;
use crate::types::UserId;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use rsvp_web::{AppError, BearerToken};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Session claims the provider vouches for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    /// Provider user id, also the `profiles` key
    pub user_id: UserId,
    /// Email on the account, if shared
    pub email: Option<String>,
    /// `user_metadata.name`
    pub name: Option<String>,
    /// `user_metadata.avatar_url`
    pub avatar_url: Option<String>,
}

/// Token rejection reasons.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Malformed token or bad signature.
    #[error("Invalid session token")]
    InvalidToken,

    /// `exp` is in the past.
    #[error("Session expired, please sign in again")]
    Expired,

    /// `sub` is not a user id.
    #[error("Session subject is not a valid user id")]
    InvalidSubject,
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        Self::unauthorized(err.to_string())
    }
}

/// Resolves bearer tokens into identities.
pub trait Authenticator: Send + Sync {
    /// Verify `token` and return the identity it carries.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] when the token cannot be trusted.
    fn authenticate(&self, token: &str) -> Result<Identity, AuthError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UserMetadata {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: u64,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

/// HS256 verification of the provider's access tokens.
pub struct JwtAuthenticator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    /// Verify with the shared `secret`; `aud` is only checked when
    /// `audience` is set.
    #[must_use]
    pub fn new(secret: &str, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        match audience {
            Some(aud) => {
                validation.set_audience(&[aud]);
                validation.set_required_spec_claims(&["exp", "aud"]);
            },
            None => validation.validate_aud = false,
        }

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

impl Authenticator for JwtAuthenticator {
    fn authenticate(&self, token: &str) -> Result<Identity, AuthError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken,
            }
        })?;

        let claims = data.claims;
        let user_id = Uuid::parse_str(&claims.sub)
            .map(UserId::from_uuid)
            .map_err(|_| AuthError::InvalidSubject)?;

        Ok(Identity {
            user_id,
            email: claims.email,
            name: claims.user_metadata.name,
            avatar_url: claims.user_metadata.avatar_url,
        })
    }
}

/// Authenticated caller.
///
/// Use this as a handler parameter to require authentication.
#[derive(Debug, Clone)]
pub struct SessionUser {
    /// Resolved identity
    pub identity: Identity,
}

impl SessionUser {
    /// Acting user's id.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.identity.user_id
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let identity = state.authenticator.authenticate(&token)?;
        Ok(Self { identity })
    }
}

/// Sign a token the way the provider does, for router tests.
#[cfg(test)]
pub(crate) fn sign_token(secret: &str, user_id: UserId, name: Option<&str>, exp: u64) -> String {
    sign_token_for(secret, user_id, name, exp, None)
}

/// [`sign_token`] with an `aud` claim.
#[cfg(test)]
pub(crate) fn sign_token_for(
    secret: &str,
    user_id: UserId,
    name: Option<&str>,
    exp: u64,
    audience: Option<&str>,
) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};

    let mut claims = serde_json::json!({
        "sub": user_id.to_string(),
        "exp": exp,
        "email": "alice@example.com",
        "user_metadata": { "name": name },
    });
    if let Some(aud) = audience {
        claims["aud"] = serde_json::Value::from(aud);
    }
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap_or_default()
}

/// An `exp` one hour from now.
#[cfg(test)]
pub(crate) fn valid_exp() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp() + 3600).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "super-secret-jwt-token-with-at-least-32-characters";

    #[test]
    fn valid_token_resolves_identity() {
        let user_id = UserId::new();
        let token = sign_token(SECRET, user_id, Some("Alice"), valid_exp());

        let identity = JwtAuthenticator::new(SECRET, None).authenticate(&token);

        assert_eq!(
            identity,
            Ok(Identity {
                user_id,
                email: Some("alice@example.com".to_string()),
                name: Some("Alice".to_string()),
                avatar_url: None,
            })
        );
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign_token("another-secret", UserId::new(), None, valid_exp());

        let result = JwtAuthenticator::new(SECRET, None).authenticate(&token);

        assert_eq!(result, Err(AuthError::InvalidToken));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = sign_token(SECRET, UserId::new(), None, 1_000_000);

        let result = JwtAuthenticator::new(SECRET, None).authenticate(&token);

        assert_eq!(result, Err(AuthError::Expired));
    }

    #[test]
    fn audience_is_required_when_configured() {
        let token = sign_token(SECRET, UserId::new(), None, valid_exp());

        let result = JwtAuthenticator::new(SECRET, Some("authenticated")).authenticate(&token);

        assert_eq!(result, Err(AuthError::InvalidToken));
    }

    #[test]
    fn foreign_audience_is_rejected() {
        let token = sign_token_for(SECRET, UserId::new(), None, valid_exp(), Some("anon"));

        let result = JwtAuthenticator::new(SECRET, Some("authenticated")).authenticate(&token);

        assert_eq!(result, Err(AuthError::InvalidToken));
    }

    #[test]
    fn matching_audience_is_accepted() {
        let user_id = UserId::new();
        let token = sign_token_for(SECRET, user_id, None, valid_exp(), Some("authenticated"));

        let identity = JwtAuthenticator::new(SECRET, Some("authenticated"))
            .authenticate(&token)
            .map(|identity| identity.user_id);

        assert_eq!(identity, Ok(user_id));
    }

    #[test]
    fn audience_is_ignored_when_not_configured() {
        let token = sign_token_for(SECRET, UserId::new(), None, valid_exp(), Some("anon"));

        assert!(JwtAuthenticator::new(SECRET, None).authenticate(&token).is_ok());
    }

    #[test]
    fn garbage_is_rejected() {
        let result = JwtAuthenticator::new(SECRET, None).authenticate("not-a-jwt");
        assert_eq!(result, Err(AuthError::InvalidToken));
    }

    #[test]
    fn auth_errors_map_to_unauthorized() {
        let app: AppError = AuthError::Expired.into();
        assert_eq!(app.status(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
