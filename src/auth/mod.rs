//! Admin gate.
//!
//! Identities come from a presented token: either the configured service key
//! (compared in constant time) or a row of the `sessions` table. Missing
//! identities and missing admin claims are redirects, never error envelopes.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use subtle::ConstantTimeEq;

use crate::db::{fetch_typed, DataStore, Query, Table};
use crate::models::Session;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Where requests without an identity are sent.
pub const LOGIN_PATH: &str = "/login";

/// Where signed-in users without the admin claim are sent.
pub const HOME_PATH: &str = "/";

/// User id reported for requests authenticated by the service key.
pub const SERVICE_USER_ID: &str = "service";

/// The signed-in user, attached to admin requests as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub claims_admin: bool,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Identity behind the request headers, if any.
    async fn current_user(&self, headers: &HeaderMap) -> Option<Identity>;
}

/// Service-key and session-table authentication.
pub struct SessionAuth {
    store: Arc<dyn DataStore>,
    service_key: Option<String>,
}

impl SessionAuth {
    pub fn new(store: Arc<dyn DataStore>, service_key: Option<String>) -> Self {
        Self { store, service_key }
    }
}

#[async_trait]
impl AuthProvider for SessionAuth {
    async fn current_user(&self, headers: &HeaderMap) -> Option<Identity> {
        let token = presented_token(headers)?;

        if let Some(key) = &self.service_key {
            if constant_time_compare(&token, key) {
                return Some(Identity {
                    user_id: SERVICE_USER_ID.to_string(),
                    claims_admin: true,
                });
            }
        }

        let sessions: Vec<Session> = match fetch_typed(
            self.store.as_ref(),
            Table::Sessions,
            &Query::new().eq("token", token.as_str()),
        )
        .await
        {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::warn!("Session lookup failed: {}", e);
                return None;
            }
        };

        let now = Utc::now();
        sessions
            .into_iter()
            .find(|session| session.token == token && !session.is_expired(now))
            .map(|session| Identity {
                user_id: session.user_id,
                claims_admin: session.claims_admin,
            })
    }
}

/// Token from `x-api-key`, falling back to `Authorization: Bearer`.
fn presented_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        })
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Gate admin routes: no identity goes to the login page, a non-admin goes
/// home, and an admin passes through with its [`Identity`] attached.
pub async fn require_admin(
    State(auth): State<Arc<dyn AuthProvider>>,
    mut request: Request,
    next: Next,
) -> Response {
    match auth.current_user(request.headers()).await {
        None => {
            tracing::debug!("No identity for {}, redirecting", request.uri().path());
            Redirect::to(LOGIN_PATH).into_response()
        }
        Some(identity) if !identity.claims_admin => {
            tracing::info!("User {} is not an admin, redirecting", identity.user_id);
            Redirect::to(HOME_PATH).into_response()
        }
        Some(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
    }
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
