// crates/adapt/src/rest/server.rs

//! Routes REST requests to resource controllers and post-processes their
//! responses: link folding, `_embed` and `_envelope`.

use super::args::{validate, ArgSpec};
use super::controller::ResourceController;
use crate::core::{parse_query, Context, RestError, RestRequest, RestResponse};
use domain::setting::SiteSettings;
use http::{Method, StatusCode};
use serde_json::{json, Map, Value as Json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

const COLLECTION_METHODS: &[&str] = &["GET", "POST"];
const ITEM_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE"];

enum Route<'a> {
    Index,
    Collection(&'a ResourceController),
    Item(&'a ResourceController, u64),
}

/// One namespace worth of controllers keyed by collection base.
pub struct RestServer {
    namespace: String,
    /// `{site}/{prefix}`; embeddable links under it are resolved internally.
    rest_root: String,
    controllers: BTreeMap<String, Arc<ResourceController>>,
}

impl RestServer {
    pub fn new(site: &SiteSettings) -> Self {
        Self {
            namespace: site.namespace.trim_matches('/').to_string(),
            rest_root: site.rest_root(),
            controllers: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, controller: ResourceController) -> &mut Self {
        debug!(base = controller.rest_base(), kind = %controller.ty().name, "controller registered");
        self.controllers
            .insert(controller.rest_base().to_string(), Arc::new(controller));
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn rest_bases(&self) -> impl Iterator<Item = &str> {
        self.controllers.keys().map(String::as_str)
    }

    /// Serve one request. Errors are rendered into the response.
    #[tracing::instrument(skip_all, fields(method = %req.method, route = %req.route, id = %req.request_id))]
    pub fn dispatch(&self, req: RestRequest) -> RestResponse {
        let envelope = req.query.contains_key("_envelope");
        let embed = req.query.contains_key("_embed");

        let mut resp = self.handle(req.clone());
        if resp.status.is_server_error() {
            warn!(status = %resp.status, body = %resp.body, "request failed");
        }

        resp.fold_links();
        if embed {
            self.embed_into(&mut resp.body, &req);
        }

        if envelope {
            return resp.into_envelope().unwrap_or_else(|e| RestResponse::from_error(&e));
        }
        resp
    }

    /// Route and run without any post-processing.
    fn handle(&self, mut req: RestRequest) -> RestResponse {
        let result = match self.route(&req.route) {
            Some(route) => self.run(route, &mut req),
            None => Err(no_route()),
        };
        result.unwrap_or_else(|e| RestResponse::from_error(&e))
    }

    fn route(&self, path: &str) -> Option<Route<'_>> {
        let rest = path
            .trim_end_matches('/')
            .strip_prefix('/')?
            .strip_prefix(self.namespace.as_str())?;
        if rest.is_empty() {
            return Some(Route::Index);
        }
        let mut parts = rest.strip_prefix('/')?.split('/');
        let ctl = self.controllers.get(parts.next()?)?;
        match (parts.next(), parts.next()) {
            (None, _) => Some(Route::Collection(ctl)),
            (Some(id), None) => id.parse().ok().map(|id| Route::Item(ctl, id)),
            _ => None,
        }
    }

    fn run(&self, route: Route<'_>, req: &mut RestRequest) -> Result<RestResponse, RestError> {
        let method = req.method.clone();
        match route {
            Route::Index if method == Method::GET => Ok(RestResponse::ok(self.index())),
            Route::Index => Err(no_route()),
            Route::Collection(ctl) => match method {
                Method::GET => {
                    validate(ctl.collection_args(), req)?;
                    ctl.list(req)
                }
                Method::POST => {
                    validate(ctl.write_args(), req)?;
                    ctl.create(req)
                }
                Method::OPTIONS => options(self.collection_route(ctl), ctl, COLLECTION_METHODS),
                _ => Err(no_route()),
            },
            Route::Item(ctl, id) => {
                req.url.insert("id".into(), json!(id));
                match method {
                    Method::GET => {
                        validate(ctl.read_args(), req)?;
                        ctl.get(req)
                    }
                    Method::POST | Method::PUT | Method::PATCH => {
                        validate(ctl.write_args(), req)?;
                        ctl.update(req)
                    }
                    Method::DELETE => {
                        validate(ctl.delete_args(), req)?;
                        ctl.delete(req)
                    }
                    Method::OPTIONS => options(self.item_route(ctl), ctl, ITEM_METHODS),
                    _ => Err(no_route()),
                }
            }
        }
    }

    fn collection_route(&self, ctl: &ResourceController) -> Json {
        json!({
            "namespace": self.namespace,
            "methods": COLLECTION_METHODS,
            "endpoints": [
                endpoint(&["GET"], ctl.collection_args()),
                endpoint(&["POST"], ctl.write_args()),
            ],
        })
    }

    fn item_route(&self, ctl: &ResourceController) -> Json {
        let id = ArgSpec::new("id", super::args::ArgKind::Integer)
            .describe("Unique identifier for the item.");
        let with_id = |args: &[ArgSpec]| {
            let mut all = vec![id.clone()];
            all.extend(args.iter().cloned());
            all
        };
        json!({
            "namespace": self.namespace,
            "methods": ITEM_METHODS,
            "endpoints": [
                endpoint(&["GET"], &with_id(ctl.read_args())),
                endpoint(&["POST", "PUT", "PATCH"], &with_id(ctl.write_args())),
                endpoint(&["DELETE"], &with_id(ctl.delete_args())),
            ],
        })
    }

    /// Namespace description listing every route.
    fn index(&self) -> Json {
        let mut routes = Map::new();
        for (base, ctl) in &self.controllers {
            routes.insert(format!("/{}/{base}", self.namespace), self.collection_route(ctl));
            routes.insert(
                format!("/{}/{base}/(?P<id>[\\d]+)", self.namespace),
                self.item_route(ctl),
            );
        }
        json!({
            "namespace": self.namespace,
            "routes": routes,
            "_links": {"up": [{"href": format!("{}/", self.rest_root)}]},
        })
    }

    /// Resolve embeddable relations of `body` (or of each row of a list)
    /// one level deep.
    fn embed_into(&self, body: &mut Json, parent: &RestRequest) {
        match body {
            Json::Array(rows) => {
                for row in rows {
                    self.embed_into(row, parent);
                }
            }
            Json::Object(obj) => {
                let Some(Json::Object(links)) = obj.get("_links") else {
                    return;
                };
                let mut embedded = Map::new();
                for (rel, targets) in links {
                    let Some(targets) = targets.as_array() else {
                        continue;
                    };
                    let found: Vec<Json> = targets
                        .iter()
                        .filter(|t| t["embeddable"] == json!(true))
                        .filter_map(|t| t["href"].as_str())
                        .filter_map(|href| self.fetch_embedded(href, parent))
                        .collect();
                    if !found.is_empty() {
                        embedded.insert(rel.clone(), Json::Array(found));
                    }
                }
                if !embedded.is_empty() {
                    obj.insert("_embedded".into(), Json::Object(embedded));
                }
            }
            _ => {}
        }
    }

    fn fetch_embedded(&self, href: &str, parent: &RestRequest) -> Option<Json> {
        let local = href.strip_prefix(&self.rest_root)?;
        let (path, query) = local.split_once('?').unwrap_or((local, ""));
        self.route(path)?;

        let mut req = RestRequest::new(Method::GET, path).with_actor(parent.actor.clone());
        req.query = parse_query(query);
        req.headers = parent.headers.clone();
        let req = req.in_context(Context::Embed);
        let resp = self.handle(req);
        if resp.body.get("code") == Some(&json!("rest_no_route")) {
            return None;
        }
        Some(resp.linked_body())
    }
}

fn endpoint(methods: &[&str], args: &[ArgSpec]) -> Json {
    let args: Map<String, Json> = args.iter().map(|a| (a.name.clone(), a.to_json())).collect();
    json!({"methods": methods, "args": args})
}

fn options(route: Json, ctl: &ResourceController, methods: &[&str]) -> Result<RestResponse, RestError> {
    let mut body = route;
    if let Json::Object(obj) = &mut body {
        obj.insert("schema".into(), ctl.schema_json());
    }
    let mut resp = RestResponse::ok(body);
    resp.set_header("Allow", &methods.join(", "))?;
    Ok(resp)
}

fn no_route() -> RestError {
    RestError::new(
        "rest_no_route",
        "No route was found matching the URL and request method.",
        StatusCode::NOT_FOUND,
    )
}
