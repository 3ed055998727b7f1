// crates/adapt/src/rest/codec.rs

//! Request body to column writes, stored item to response body.

use super::args::parse_bool;
use super::controller::ResourceController;
use super::dates::{date_with_gmt, format_datetime, local_to_gmt};
use super::hooks::RenderScope;
use crate::core::{RestError, RestRequest, RestResponse};
use domain::item::{Item, ItemChanges, Toggle};
use domain::resource::{MetaType, ResourceType};
use http::StatusCode;
use serde_json::{json, Map, Value as Json};
use serve::render::{render_content, render_excerpt, render_guid, render_title, sanitize_html, TitleStyle};

/// HTML permalink of an item, in query-string form.
pub fn permalink(site_url: &str, ty: &ResourceType, item: &Item) -> String {
    let base = site_url.trim_end_matches('/');
    let id = item.id;
    if ty.attachment_like {
        format!("{base}/?attachment_id={id}")
    } else if ty.name == "post" {
        format!("{base}/?p={id}")
    } else if ty.name == "page" {
        format!("{base}/?page_id={id}")
    } else {
        format!("{base}/?post_type={}&p={id}", ty.name)
    }
}

fn meta_default(kind: MetaType) -> Json {
    match kind {
        MetaType::String => json!(""),
        MetaType::Integer => json!(0),
        MetaType::Number => json!(0.0),
        MetaType::Boolean => json!(false),
    }
}

fn coerce_meta(kind: MetaType, value: &Json) -> Option<Json> {
    match (kind, value) {
        (MetaType::String, Json::String(_)) => Some(value.clone()),
        (MetaType::Integer, Json::Number(n)) => n.as_i64().map(Json::from),
        (MetaType::Integer, Json::String(s)) => s.trim().parse::<i64>().ok().map(Json::from),
        (MetaType::Number, Json::Number(n)) => n.as_f64().map(Json::from),
        (MetaType::Number, Json::String(s)) => s.trim().parse::<f64>().ok().map(Json::from),
        (MetaType::Boolean, v) => parse_bool(v).ok().map(Json::Bool),
        _ => None,
    }
}

fn invalid_field(message: &str) -> RestError {
    RestError::bad_request("rest_invalid_field", message)
}

/// Sanitized text from either `"..."` or `{"raw": "..."}`.
fn text_input(req: &RestRequest, name: &str) -> Result<Option<String>, RestError> {
    let raw = match req.param(name) {
        Some(Json::String(s)) => s.as_str(),
        Some(Json::Object(o)) => match o.get("raw").and_then(Json::as_str) {
            Some(raw) => raw,
            None => return Ok(None),
        },
        _ => return Ok(None),
    };
    sanitize_html(raw)
        .map(Some)
        .map_err(|e| RestError::new("rest_invalid_markup", e.to_string(), StatusCode::INTERNAL_SERVER_ERROR))
}

/// Encoder/decoder bound to one controller invocation.
pub struct ItemCodec<'a> {
    pub ctl: &'a ResourceController,
    pub scope: &'a RenderScope,
}

impl<'a> ItemCodec<'a> {
    pub fn new(ctl: &'a ResourceController, scope: &'a RenderScope) -> Self {
        Self { ctl, scope }
    }

    /// Translate a validated create/update request into column writes.
    /// `existing` is `None` on create.
    pub fn decode(&self, req: &RestRequest, existing: Option<&Item>) -> Result<ItemChanges, RestError> {
        let ctl = self.ctl;
        let schema = &ctl.schema;
        let store = ctl.env.store.as_ref();
        let given = |name: &str| schema.has(name) && req.has_param(name);
        let mut c = ItemChanges::default();

        match existing {
            Some(item) => c.id = Some(item.id),
            None => c.kind = Some(ctl.ty.name.clone()),
        }

        if given("title") {
            c.title = text_input(req, "title")?;
        }
        if given("content") {
            c.content = text_input(req, "content")?;
        }
        if given("excerpt") {
            c.excerpt = text_input(req, "excerpt")?;
        }

        if given("status") {
            if let Some(raw) = req.param_str("status") {
                if existing.map(|i| i.status.as_str()) != Some(raw) {
                    c.status = Some(ctl.permissions().handle_status(req, raw)?);
                }
            }
        }

        let offset = ctl.env.site.gmt_offset_minutes;
        let date_in = |name: &str, is_gmt: bool| {
            given(name)
                .then(|| req.param_str(name))
                .flatten()
                .and_then(|raw| date_with_gmt(raw, is_gmt, offset))
        };
        if let Some((local, gmt)) = date_in("date", false).or_else(|| date_in("date_gmt", true)) {
            c.date = Some(local);
            c.date_gmt = Some(gmt);
        }

        if given("slug") {
            c.slug = req.param_str("slug").map(String::from);
        }

        if let Some(author) = req.param_u64("author").filter(|a| *a > 0 && schema.has("author")) {
            if author != req.actor.id() && !store.user_exists(author) {
                return Err(RestError::bad_request("rest_invalid_author", "Invalid author ID."));
            }
            c.author = Some(author);
        } else if existing.is_none() {
            c.author = Some(req.actor.id());
        }

        let sticky_on = schema.has("sticky") && req.param_bool("sticky") == Some(true);
        let sticky_off = req.has_param("sticky") && req.param_bool("sticky") == Some(false);
        if given("password") {
            let password = req.param_str("password").unwrap_or_default().to_string();
            if !password.is_empty() {
                if sticky_on {
                    return Err(invalid_field("A post can not be sticky and have a password."));
                }
                if existing.is_some_and(|i| store.is_sticky(i.id)) && !sticky_off {
                    return Err(invalid_field("A sticky post can not be password protected."));
                }
            }
            c.password = Some(password);
        }
        if sticky_on {
            let password = c
                .password
                .as_deref()
                .or(existing.map(|i| i.password.as_str()))
                .unwrap_or_default();
            if !password.is_empty() {
                return Err(invalid_field("A password protected post can not be set to sticky."));
            }
        }

        if given("parent") {
            let parent = req.param_u64("parent").unwrap_or(0);
            if parent != 0 {
                let valid = store
                    .get(parent)
                    .is_some_and(|p| ctl.ty.attachment_like || p.kind == ctl.ty.name);
                if !valid {
                    return Err(RestError::bad_request("rest_post_invalid_id", "Invalid post parent ID."));
                }
            }
            c.parent = Some(parent);
        }

        if given("menu_order") {
            c.menu_order = req.param_i64("menu_order");
        }
        if given("comment_status") {
            c.comment_status = req.param_str("comment_status").and_then(Toggle::parse);
        }
        if given("ping_status") {
            c.ping_status = req.param_str("ping_status").and_then(Toggle::parse);
        }

        Ok(ctl.hooks.apply_pre_insert(c, req))
    }

    fn meta_values(&self, item: &Item) -> Json {
        Json::Object(
            self.ctl
                .ty
                .meta
                .iter()
                .map(|m| {
                    let v = item.meta.get(&m.key).cloned().unwrap_or_else(|| meta_default(m.kind));
                    (m.key.clone(), v)
                })
                .collect(),
        )
    }

    /// Response body for `item`, without links, filtered to the request's
    /// context. Every property the schema declares is emitted.
    pub fn encode(&self, item: &Item, req: &RestRequest) -> Json {
        let ctl = self.ctl;
        let schema = &ctl.schema;
        let site = &ctl.env.site;
        let has = |name: &str| schema.has(name);
        let mut data = Map::new();
        let mut put = |name: &str, value: Json| {
            data.insert(name.to_string(), value);
        };

        if has("date") {
            put("date", json!(format_datetime(&item.date)));
        }
        if has("date_gmt") {
            let gmt = item
                .date_gmt
                .unwrap_or_else(|| local_to_gmt(item.date, site.gmt_offset_minutes));
            put("date_gmt", json!(format_datetime(&gmt)));
        }
        if has("guid") {
            put("guid", json!({"rendered": render_guid(&item.guid), "raw": item.guid}));
        }
        if has("id") {
            put("id", json!(item.id));
        }
        if has("link") {
            put("link", json!(permalink(&site.url, &ctl.ty, item)));
        }
        if has("modified") {
            put("modified", json!(format_datetime(&item.modified)));
        }
        if has("modified_gmt") {
            put("modified_gmt", json!(format_datetime(&item.modified_gmt)));
        }
        if has("password") {
            put("password", json!(item.password));
        }
        if has("slug") {
            put("slug", json!(item.slug));
        }
        if has("status") {
            put("status", json!(item.status.as_str()));
        }
        if has("type") {
            put("type", json!(item.kind));
        }
        if has("parent") {
            put("parent", json!(item.parent));
        }
        if has("menu_order") {
            put("menu_order", json!(item.menu_order));
        }
        if has("comment_status") {
            put("comment_status", json!(item.comment_status.as_str()));
        }
        if has("ping_status") {
            put("ping_status", json!(item.ping_status.as_str()));
        }

        let protected = item.has_password();
        let hidden = protected
            && !self.scope.password_bypassed()
            && !ctl.permissions().can_access_password_content(item, req);

        if has("title") {
            let rendered = {
                let _plain = self.scope.plain_protected_title();
                let style = if self.scope.protected_title_plain() {
                    TitleStyle::PlainProtected
                } else {
                    TitleStyle::Decorated
                };
                render_title(&item.title, &item.status, protected, style)
            };
            put("title", json!({"raw": item.title, "rendered": rendered}));
        }
        if has("content") {
            let rendered = if hidden { String::new() } else { render_content(&item.content) };
            put(
                "content",
                json!({"raw": item.content, "rendered": rendered, "protected": protected}),
            );
        }
        if has("excerpt") {
            let rendered = if hidden {
                String::new()
            } else {
                render_excerpt(&item.excerpt, &item.content)
            };
            put(
                "excerpt",
                json!({"raw": item.excerpt, "rendered": rendered, "protected": protected}),
            );
        }
        if has("author") {
            put("author", json!(item.author));
        }
        if has("featured_media") {
            put("featured_media", json!(item.featured_media));
        }
        if has("format") {
            let format = if item.format.is_empty() { "standard" } else { item.format.as_str() };
            put("format", json!(format));
        }
        if has("template") {
            put("template", json!(item.template));
        }
        if has("sticky") {
            put("sticky", json!(ctl.env.store.is_sticky(item.id)));
        }
        if has("meta") {
            put("meta", self.meta_values(item));
        }
        for tax in &ctl.taxonomies {
            if has(&tax.rest_base) {
                put(&tax.rest_base, json!(item.terms_in(&tax.name)));
            }
        }
        for field in &ctl.fields {
            if let Some(v) = field.get(item, req) {
                put(&field.name, v);
            }
        }

        schema.filter(Json::Object(data), req.context())
    }

    /// Encoded body plus link relations, passed through the response filters.
    pub fn prepare_response(&self, item: &Item, req: &RestRequest) -> RestResponse {
        let mut resp = RestResponse::ok(self.encode(item, req));
        resp.links = self.ctl.links().item_links(item);
        self.ctl.hooks.apply_response(resp, item, req)
    }

    /// Write the registered keys of a `meta` object. `null` deletes a key;
    /// unregistered keys are ignored.
    pub fn update_meta(&self, item: &Item, req: &RestRequest) -> Result<(), RestError> {
        let Some(Json::Object(meta)) = req.param("meta") else {
            return Ok(());
        };
        let mut writes = Vec::new();
        let mut invalid = Map::new();
        for (key, value) in meta {
            let Some(field) = self.ctl.ty.meta.iter().find(|m| &m.key == key) else {
                continue;
            };
            if value.is_null() {
                writes.push((key, None));
                continue;
            }
            match coerce_meta(field.kind, value) {
                Some(v) => writes.push((key, Some(v))),
                None => {
                    let name = format!("meta.{key}");
                    let msg = format!("{name} is not of type {}.", field.kind.as_str());
                    invalid.insert(name, Json::String(msg));
                }
            }
        }
        if !invalid.is_empty() {
            return Err(RestError::bad_request("rest_invalid_param", "Invalid parameter(s): meta")
                .with_data("params", Json::Object(invalid)));
        }
        for (key, value) in writes {
            self.ctl.env.store.set_meta(item.id, key, value)?;
        }
        Ok(())
    }
}
