// crates/adapt/src/core/error.rs

use domain::security::Actor;
use http::StatusCode;
use serde_json::{json, Map, Value as Json};
use serve::StoreError;
use thiserror::Error;

/// Error value returned by every REST operation.
///
/// `code` is the stable identifier clients match on; `message` is for
/// humans. Extra members of `data` travel next to `status`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{code}: {message}")]
pub struct RestError {
    pub code: String,
    pub message: String,
    pub status: StatusCode,
    pub data: Map<String, Json>,
}

impl RestError {
    pub fn new(code: impl Into<String>, message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            status,
            data: Map::new(),
        }
    }

    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, message, StatusCode::BAD_REQUEST)
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, message, StatusCode::NOT_FOUND)
    }

    /// 401 when nobody is logged in, 403 otherwise.
    pub fn authorization(
        actor: &Actor,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(code, message, authorization_status(actor))
    }

    pub fn with_data(mut self, key: &str, value: Json) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }

    /// `{code, message, data: {status, ...}}`
    pub fn to_json(&self) -> Json {
        let mut data = self.data.clone();
        data.insert("status".into(), json!(self.status.as_u16()));
        json!({
            "code": self.code,
            "message": self.message,
            "data": Json::Object(data),
        })
    }

    pub fn to_status(&self) -> StatusCode {
        self.status
    }
}

pub fn authorization_status(actor: &Actor) -> StatusCode {
    if actor.is_authenticated() {
        StatusCode::FORBIDDEN
    } else {
        StatusCode::UNAUTHORIZED
    }
}

impl From<StoreError> for RestError {
    fn from(e: StoreError) -> Self {
        let status = match e {
            StoreError::Insert | StoreError::Update => StatusCode::INTERNAL_SERVER_ERROR,
            _ => e.to_status(),
        };
        RestError::new(e.code(), e.to_string(), status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::security::{Principal, Role};

    #[test]
    fn envelope_shape() {
        let e = RestError::bad_request("rest_invalid_param", "Invalid parameter(s): page")
            .with_data("params", json!({"page": "page must be at least 1"}));
        assert_eq!(
            e.to_json(),
            json!({
                "code": "rest_invalid_param",
                "message": "Invalid parameter(s): page",
                "data": { "status": 400, "params": {"page": "page must be at least 1"} }
            })
        );
    }

    #[test]
    fn authorization_depends_on_login_state() {
        let anon = RestError::authorization(&Actor::Anonymous, "rest_forbidden", "no");
        assert_eq!(anon.status, StatusCode::UNAUTHORIZED);

        let user = Actor::User(Principal {
            id: 1,
            login: "a".into(),
            role: Role::Subscriber,
        });
        let user_err = RestError::authorization(&user, "rest_forbidden", "no");
        assert_eq!(user_err.status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn store_faults_map_to_500_and_validation_to_400() {
        let e: RestError = StoreError::Insert.into();
        assert_eq!((e.code.as_str(), e.status), ("db_insert_error", StatusCode::INTERNAL_SERVER_ERROR));

        let e: RestError = StoreError::EmptyContent.into();
        assert_eq!((e.code.as_str(), e.status), ("empty_content", StatusCode::BAD_REQUEST));

        let e: RestError = StoreError::InvalidFeaturedMedia.into();
        assert_eq!(e.status, StatusCode::BAD_REQUEST);
    }
}
