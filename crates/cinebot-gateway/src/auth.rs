// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller identification for the gateway.
//!
//! Callers present `Authorization: Bearer <JWT>`, an HS256 token whose
//! claims carry the signed-in user. A request without the header is
//! anonymous; a header that does not verify is rejected with 401. When no
//! secret is configured every request is anonymous.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use cinebot_core::{CinebotError, Identity};

use crate::error::ApiError;

/// Authentication configuration for the gateway.
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 secret. If `None`, nobody can sign in.
    pub jwt_secret: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// The user object embedded in a token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimedUser {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user: ClaimedUser,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// Who is calling. Inserted as a request extension by [`identify`].
#[derive(Debug, Clone, Default)]
pub struct Caller(pub Option<Identity>);

impl Caller {
    /// The signed-in user, or `Unauthorized`.
    pub fn require(&self) -> Result<&Identity, CinebotError> {
        self.0.as_ref().ok_or(CinebotError::Unauthorized)
    }
}

/// Sign a token for `user`, valid for `ttl`.
pub fn issue_token(secret: &str, user: &Identity, ttl: Duration) -> Result<String, CinebotError> {
    let claims = Claims {
        user: ClaimedUser {
            id: user.user_id,
            name: user.name.clone(),
            email: user.email.clone(),
        },
        exp: (Utc::now() + ttl).timestamp(),
    };
    jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| CinebotError::Internal(format!("failed to sign token: {e}")))
}

/// Verify `token` and return the identity it carries.
pub fn verify_token(secret: &str, token: &str) -> Result<Identity, CinebotError> {
    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "bearer token rejected");
        CinebotError::Unauthorized
    })?;
    let user = data.claims.user;
    Ok(Identity {
        user_id: user.id,
        name: user.name,
        email: user.email,
    })
}

/// Middleware that resolves the caller and stores it as a [`Caller`]
/// extension. Only an invalid token fails the request.
pub async fn identify(State(auth): State<AuthConfig>, mut request: Request, next: Next) -> Response {
    let header = request
        .headers()
        .get("authorization")
        .map(|v| v.to_str().unwrap_or_default().to_string());

    let caller = match (header, auth.jwt_secret.as_deref()) {
        (None, _) | (Some(_), None) => Caller(None),
        (Some(value), Some(secret)) => {
            let verified = value
                .strip_prefix("Bearer ")
                .ok_or(CinebotError::Unauthorized)
                .and_then(|token| verify_token(secret, token.trim()));
            match verified {
                Ok(identity) => Caller(Some(identity)),
                Err(e) => return ApiError::from(e).into_response(),
            }
        }
    };

    request.extensions_mut().insert(caller);
    next.run(request).await
}
