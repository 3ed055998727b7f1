// crates/adapt/src/http/auth.rs

//! Tower middleware resolving the calling [`Actor`] from HTTP Basic
//! credentials. Requests without credentials proceed anonymously; bad
//! credentials are rejected before routing.

use crate::core::RestError;

use axum::{
    body::Body,
    http::{header, HeaderMap, Request},
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose, Engine};
use domain::security::password::verify_password;
use domain::security::{Actor, Principal};
use domain::setting::UserSettings;
use futures::future::BoxFuture;
use http::StatusCode;
use std::{
    collections::HashMap,
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::{debug, warn, Instrument};
use uuid::Uuid;

/// Per-request correlation id, shared with the REST request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

// ─────────────────────────────────────────────────────────────────────────────
// AuthLayer
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AuthLayer {
    users: Arc<HashMap<String, UserSettings>>,
}

impl AuthLayer {
    #[tracing::instrument(skip_all)]
    pub fn new(users: Vec<UserSettings>) -> Self {
        Self {
            users: Arc::new(users.into_iter().map(|u| (u.login.clone(), u)).collect()),
        }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            users: self.users.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AuthMiddleware
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    users: Arc<HashMap<String, UserSettings>>,
}

impl<S> Service<Request<Body>> for AuthMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        // The clone may not be ready; keep the one that was polled.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let users = self.users.clone();

        let id = Uuid::new_v4();
        let span = tracing::info_span!(
            "request",
            %id,
            method = %req.method(),
            path = %req.uri().path(),
        );

        Box::pin(
            async move {
                let actor = match credentials(req.headers()) {
                    None => Actor::Anonymous,
                    Some(Err(e)) => return Ok(e.into_response()),
                    Some(Ok((login, password))) => {
                        match authenticate(&users, &login, password).await {
                            Ok(actor) => actor,
                            Err(e) => return Ok(e.into_response()),
                        }
                    }
                };
                debug!(%actor, "authenticated");
                req.extensions_mut().insert(actor);
                req.extensions_mut().insert(RequestId(id));
                inner.call(req).await
            }
            .instrument(span),
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// `(login, password)` from a Basic `Authorization` header, if one is sent.
fn credentials(headers: &HeaderMap) -> Option<Result<(String, String), RestError>> {
    let value = headers.get(header::AUTHORIZATION)?;
    let encoded = value.to_str().ok().and_then(|v| v.strip_prefix("Basic "))?;

    let malformed = || {
        RestError::new(
            "rest_malformed_authorization",
            "Malformed Basic authorization header.",
            StatusCode::BAD_REQUEST,
        )
    };
    let decoded = general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()
        .and_then(|b| String::from_utf8(b).ok());
    Some(
        decoded
            .as_deref()
            .and_then(|s| s.split_once(':'))
            .map(|(login, pw)| (login.to_string(), pw.to_string()))
            .ok_or_else(malformed),
    )
}

async fn authenticate(
    users: &HashMap<String, UserSettings>,
    login: &str,
    password: String,
) -> Result<Actor, RestError> {
    let user = users.get(login).ok_or_else(|| {
        RestError::new(
            "invalid_username",
            "Unknown username. Check again or try your email address.",
            StatusCode::UNAUTHORIZED,
        )
    })?;

    let hash = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| e.to_string())
        .and_then(|r| r.map_err(|e| e.to_string()));

    match verified {
        Ok(true) => Ok(Actor::User(Principal {
            id: user.id,
            login: user.login.clone(),
            role: user.role,
        })),
        Ok(false) => Err(RestError::new(
            "incorrect_password",
            "The provided password is an invalid password.",
            StatusCode::UNAUTHORIZED,
        )),
        Err(e) => {
            warn!(login, error = %e, "password verification failed");
            Err(RestError::new(
                "rest_authentication_error",
                "Could not verify credentials.",
                StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}
