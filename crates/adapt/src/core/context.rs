// crates/adapt/src/core/context.rs

use super::error::RestError;
use crate::rest::args::{parse_bool, parse_id_list, parse_string_list};
use domain::security::Actor;
use http::{header::HeaderName, HeaderMap, HeaderValue, Method, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Parameter bag keyed by public parameter name.
pub type Params = BTreeMap<String, Json>;

/// Decode a urlencoded string. Repeated names and `name[]` collect into
/// arrays; every scalar stays a string until validation coerces it.
pub fn parse_query(raw: &str) -> Params {
    let mut out = Params::new();
    for (k, v) in form_urlencoded::parse(raw.as_bytes()) {
        let (name, list) = match k.strip_suffix("[]") {
            Some(n) => (n.to_string(), true),
            None => (k.into_owned(), false),
        };
        let v = Json::String(v.into_owned());
        match out.get_mut(&name) {
            Some(Json::Array(a)) => a.push(v),
            Some(prev) => {
                let first = prev.take();
                *prev = Json::Array(vec![first, v]);
            }
            None => {
                out.insert(name, if list { Json::Array(vec![v]) } else { v });
            }
        }
    }
    out
}

/// Encode parameters for a URL, arrays as `name[]=...`.
pub fn build_query(params: &Params) -> String {
    let mut ser = form_urlencoded::Serializer::new(String::new());
    for (k, v) in params {
        match v {
            Json::Array(items) => {
                for i in items {
                    ser.append_pair(&format!("{k}[]"), &scalar(i));
                }
            }
            other => {
                ser.append_pair(k, &scalar(other));
            }
        }
    }
    ser.finish()
}

fn scalar(v: &Json) -> String {
    match v {
        Json::String(s) => s.clone(),
        Json::Null => String::new(),
        other => other.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Serde helpers for foreign types (HeaderMap, StatusCode)
// ─────────────────────────────────────────────────────────────────────────────

mod serde_headermap {
    use http::{HeaderMap, HeaderValue};
    use serde::{Serialize, Serializer};
    use std::collections::BTreeMap;

    /// Repeated headers are joined with `, `.
    pub fn serialize<S>(map: &HeaderMap<HeaderValue>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut tmp = BTreeMap::<String, String>::new();

        for (name, value) in map.iter() {
            if let Ok(v) = value.to_str() {
                tmp.entry(name.as_str().to_string())
                    .and_modify(|acc| {
                        acc.push_str(", ");
                        acc.push_str(v);
                    })
                    .or_insert_with(|| v.to_string());
            }
        }

        tmp.serialize(serializer)
    }
}

mod serde_status {
    use http::StatusCode;
    use serde::Serializer;

    pub fn serialize<S>(code: &StatusCode, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u16(code.as_u16())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Context
// ─────────────────────────────────────────────────────────────────────────────

/// Visibility tier of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Context {
    #[default]
    View,
    Edit,
    Embed,
}

impl Context {
    pub const ALL: [Context; 3] = [Context::View, Context::Edit, Context::Embed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Context::View => "view",
            Context::Edit => "edit",
            Context::Embed => "embed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "view" => Some(Context::View),
            "edit" => Some(Context::Edit),
            "embed" => Some(Context::Embed),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RestRequest
// ─────────────────────────────────────────────────────────────────────────────

/// A request as seen by a resource controller.
///
/// Parameters come from four sources; lookups consult them in the order
/// url, body, query, defaults.
#[derive(Debug, Clone)]
pub struct RestRequest {
    pub request_id: Uuid,
    pub method: Method,
    /// Path below the API prefix, e.g. `/wp/v2/posts/4`.
    pub route: String,
    pub headers: HeaderMap,
    pub query: Params,
    pub body: Params,
    pub url: Params,
    pub defaults: Params,
    pub actor: Actor,
}

impl RestRequest {
    pub fn new(method: Method, route: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            method,
            route: route.into(),
            headers: HeaderMap::new(),
            query: Params::new(),
            body: Params::new(),
            url: Params::new(),
            defaults: Params::new(),
            actor: Actor::Anonymous,
        }
    }

    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actor = actor;
        self
    }

    pub fn with_query(mut self, name: &str, value: impl Into<Json>) -> Self {
        self.query.insert(name.to_string(), value.into());
        self
    }

    pub fn with_body(mut self, name: &str, value: impl Into<Json>) -> Self {
        self.body.insert(name.to_string(), value.into());
        self
    }

    pub fn with_url(mut self, name: &str, value: impl Into<Json>) -> Self {
        self.url.insert(name.to_string(), value.into());
        self
    }

    fn sources(&self) -> [&Params; 3] {
        [&self.url, &self.body, &self.query]
    }

    /// Value supplied by the client or registered as a default.
    pub fn param(&self, name: &str) -> Option<&Json> {
        self.sources()
            .into_iter()
            .find_map(|p| p.get(name))
            .or_else(|| self.defaults.get(name))
    }

    /// Whether the client supplied `name` (defaults do not count).
    pub fn has_param(&self, name: &str) -> bool {
        self.sources().into_iter().any(|p| p.contains_key(name))
    }

    /// Overwrite a parameter where it was found; unsupplied names become
    /// defaults.
    pub fn set_param(&mut self, name: &str, value: Json) {
        for src in [&mut self.url, &mut self.body, &mut self.query] {
            if let Some(slot) = src.get_mut(name) {
                *slot = value;
                return;
            }
        }
        self.defaults.insert(name.to_string(), value);
    }

    /// Names of every supplied or defaulted parameter.
    pub fn param_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .sources()
            .into_iter()
            .chain(std::iter::once(&self.defaults))
            .flat_map(|p| p.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.param(name).and_then(Json::as_str)
    }

    pub fn param_i64(&self, name: &str) -> Option<i64> {
        match self.param(name)? {
            Json::Number(n) => n.as_i64(),
            Json::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn param_u64(&self, name: &str) -> Option<u64> {
        self.param_i64(name).and_then(|n| u64::try_from(n).ok())
    }

    pub fn param_bool(&self, name: &str) -> Option<bool> {
        self.param(name).and_then(|v| parse_bool(v).ok())
    }

    pub fn param_ids(&self, name: &str) -> Vec<u64> {
        self.param(name)
            .and_then(|v| parse_id_list(v).ok())
            .unwrap_or_default()
    }

    pub fn param_strings(&self, name: &str) -> Vec<String> {
        self.param(name)
            .and_then(|v| parse_string_list(v).ok())
            .unwrap_or_default()
    }

    /// Requested context; `view` when absent or unknown.
    pub fn context(&self) -> Context {
        self.param_str("context")
            .and_then(Context::parse)
            .unwrap_or_default()
    }

    /// The same request with its context forced.
    pub fn in_context(&self, ctx: Context) -> Self {
        let mut req = self.clone();
        req.set_param("context", Json::String(ctx.as_str().to_string()));
        req
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Links
// ─────────────────────────────────────────────────────────────────────────────

/// One hypermedia pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkTarget {
    pub href: String,
    pub embeddable: bool,
    pub attrs: Map<String, Json>,
}

impl LinkTarget {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            embeddable: false,
            attrs: Map::new(),
        }
    }

    pub fn embeddable(mut self) -> Self {
        self.embeddable = true;
        self
    }

    pub fn attr(mut self, key: &str, value: impl Into<Json>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    pub fn to_json(&self) -> Json {
        let mut obj = Map::new();
        obj.insert("href".into(), Json::String(self.href.clone()));
        if self.embeddable {
            obj.insert("embeddable".into(), Json::Bool(true));
        }
        for (k, v) in &self.attrs {
            obj.insert(k.clone(), v.clone());
        }
        Json::Object(obj)
    }
}

/// Link relations keyed by relation name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkSet(BTreeMap<String, Vec<LinkTarget>>);

impl LinkSet {
    pub fn add(&mut self, rel: &str, target: LinkTarget) {
        self.0.entry(rel.to_string()).or_default().push(target);
    }

    pub fn get(&self, rel: &str) -> &[LinkTarget] {
        self.0.get(rel).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<LinkTarget>)> {
        self.0.iter()
    }

    pub fn to_json(&self) -> Json {
        Json::Object(
            self.0
                .iter()
                .map(|(rel, targets)| {
                    (
                        rel.clone(),
                        Json::Array(targets.iter().map(LinkTarget::to_json).collect()),
                    )
                })
                .collect(),
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RestResponse
// ─────────────────────────────────────────────────────────────────────────────

/// Typed response produced by controllers. Serialises to the envelope form
/// `{status, headers, body}`.
#[derive(Debug, Clone, Serialize)]
pub struct RestResponse {
    #[serde(with = "serde_status")]
    pub status: StatusCode,

    #[serde(with = "serde_headermap")]
    pub headers: HeaderMap,

    pub body: Json,

    /// Relations folded into the body as `_links` by the server.
    #[serde(skip)]
    pub links: LinkSet,
}

impl RestResponse {
    pub fn new(status: StatusCode, body: Json) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
            links: LinkSet::default(),
        }
    }

    pub fn ok(body: Json) -> Self {
        Self::new(StatusCode::OK, body)
    }

    pub fn from_error(err: &RestError) -> Self {
        Self::new(err.status, err.to_json())
    }

    fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), RestError> {
        let header_name: HeaderName = name
            .parse()
            .map_err(|_| invalid_header(name))?;
        let hv: HeaderValue = value.parse().map_err(|_| invalid_header(value))?;
        Ok((header_name, hv))
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), RestError> {
        let (name, value) = Self::header_pair(name, value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn append_header(&mut self, name: &str, value: &str) -> Result<(), RestError> {
        let (name, value) = Self::header_pair(name, value)?;
        self.headers.append(name, value);
        Ok(())
    }

    /// Append an RFC 8288 `Link` header.
    pub fn link_header(&mut self, rel: &str, href: &str, attrs: &[(&str, &str)]) -> Result<(), RestError> {
        let mut value = format!("<{href}>; rel=\"{rel}\"");
        for (k, v) in attrs {
            value.push_str(&format!("; {k}=\"{v}\""));
        }
        self.append_header("link", &value)
    }

    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Body with the link relations folded in as `_links`. Non-object
    /// bodies are returned unchanged.
    pub fn linked_body(mut self) -> Json {
        self.fold_links();
        self.body
    }

    /// Move the link relations into the body in place.
    pub fn fold_links(&mut self) {
        let links = std::mem::take(&mut self.links);
        if let Json::Object(obj) = &mut self.body {
            if !links.is_empty() {
                obj.insert("_links".into(), links.to_json());
            }
        }
    }

    /// Wrap into a 200 response whose body carries status and headers.
    pub fn into_envelope(self) -> Result<Self, RestError> {
        let body = serde_json::to_value(&self)
            .map_err(|e| RestError::new("rest_envelope", e.to_string(), StatusCode::INTERNAL_SERVER_ERROR))?;
        Ok(Self::ok(body))
    }
}

fn invalid_header(what: &str) -> RestError {
    RestError::new(
        "rest_invalid_header",
        format!("Invalid header: {what}"),
        StatusCode::INTERNAL_SERVER_ERROR,
    )
}
