// crates/adapt/src/http/app.rs

use super::auth::{AuthLayer, RequestId};
use crate::core::{parse_query, Params, RestError, RestRequest, RestResponse};
use crate::rest::RestServer;

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{header, HeaderValue, Request},
    response::{IntoResponse, Response},
    Router,
};
use domain::security::Actor;
use domain::setting::UserSettings;
use http::StatusCode;
use serde_json::Value as Json;
use std::sync::Arc;

/// Largest request body accepted.
const MAX_BODY: usize = 2 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub server: Arc<RestServer>,
    /// `/{api_prefix}`
    pub prefix: String,
}

#[tracing::instrument(skip_all)]
pub fn build_app(server: RestServer, users: Vec<UserSettings>, api_prefix: &str) -> Router {
    let state = AppState {
        server: Arc::new(server),
        prefix: format!("/{}", api_prefix.trim_matches('/')),
    };

    Router::new()
        .fallback(rest_entrypoint)
        .with_state(state)
        .layer(AuthLayer::new(users))
}

#[tracing::instrument(skip_all, fields(path = %req.uri().path()))]
async fn rest_entrypoint(State(app): State<AppState>, req: Request<Body>) -> Response {
    match into_rest_request(&app, req).await {
        Ok(rest) => app.server.dispatch(rest).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Translate an HTTP request into a [`RestRequest`] routed below the API
/// prefix.
async fn into_rest_request(app: &AppState, req: Request<Body>) -> Result<RestRequest, RestError> {
    let (parts, body) = req.into_parts();
    let route = parts
        .uri
        .path()
        .strip_prefix(app.prefix.as_str())
        .filter(|r| r.is_empty() || r.starts_with('/'))
        .ok_or_else(|| {
            RestError::not_found(
                "rest_no_route",
                "No route was found matching the URL and request method.",
            )
        })?;

    let mut rest = RestRequest::new(parts.method.clone(), route);
    if let Some(RequestId(id)) = parts.extensions.get::<RequestId>() {
        rest.request_id = *id;
    }
    rest.actor = parts
        .extensions
        .get::<Actor>()
        .cloned()
        .unwrap_or(Actor::Anonymous);
    rest.query = parts.uri.query().map(parse_query).unwrap_or_default();

    let bytes = to_bytes(body, MAX_BODY).await.map_err(|e| {
        RestError::new(
            "rest_body_too_large",
            e.to_string(),
            StatusCode::PAYLOAD_TOO_LARGE,
        )
    })?;
    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    rest.body = parse_body(content_type, &bytes)?;
    rest.headers = parts.headers;
    Ok(rest)
}

/// JSON objects and urlencoded forms become body parameters.
fn parse_body(content_type: &str, bytes: &[u8]) -> Result<Params, RestError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Params::new());
    }
    if content_type.starts_with("application/x-www-form-urlencoded") {
        let raw = std::str::from_utf8(bytes)
            .map_err(|_| RestError::bad_request("rest_invalid_form", "Invalid form body."))?;
        return Ok(parse_query(raw));
    }
    let invalid = || RestError::bad_request("rest_invalid_json", "Invalid JSON body passed.");
    match serde_json::from_slice::<Json>(bytes) {
        Ok(Json::Object(obj)) => Ok(obj.into_iter().collect()),
        _ => Err(invalid()),
    }
}

impl IntoResponse for RestResponse {
    fn into_response(self) -> Response {
        let mut resp = (self.status, axum::Json(self.body)).into_response();
        for (name, value) in self.headers.iter() {
            resp.headers_mut().append(name, value.clone());
        }
        resp
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let mut resp = (self.to_status(), axum::Json(self.to_json())).into_response();
        if self.status == StatusCode::UNAUTHORIZED {
            resp.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"api\""),
            );
        }
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_bodies_must_be_objects() {
        let params = parse_body("application/json", br#"{"title": "x", "sticky": true}"#).unwrap();
        assert_eq!(params["title"], json!("x"));
        assert_eq!(params["sticky"], json!(true));

        let err = parse_body("application/json", b"[1, 2]").unwrap_err();
        assert_eq!((err.code.as_str(), err.status), ("rest_invalid_json", StatusCode::BAD_REQUEST));
        let err = parse_body("", b"{nope").unwrap_err();
        assert_eq!(err.code, "rest_invalid_json");
    }

    #[test]
    fn form_bodies_and_blank_bodies() {
        let params = parse_body(
            "application/x-www-form-urlencoded; charset=UTF-8",
            b"title=Hi+there&tags[]=1&tags[]=2",
        )
        .unwrap();
        assert_eq!(params["title"], json!("Hi there"));
        assert_eq!(params["tags"], json!(["1", "2"]));

        assert!(parse_body("application/json", b"  \n").unwrap().is_empty());
    }

    #[test]
    fn unauthorized_errors_challenge() {
        let resp = RestError::new("rest_forbidden", "no", StatusCode::UNAUTHORIZED).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[test]
    fn response_headers_survive() {
        let mut rest = RestResponse::ok(json!([]));
        rest.set_header("X-Total", "0").unwrap();
        rest.link_header("next", "https://example.org/api/wp/v2/posts?page=2", &[]).unwrap();
        let resp = rest.into_response();
        assert_eq!(resp.headers()["x-total"], "0");
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
        assert!(resp.headers().contains_key(header::LINK));
    }
}
