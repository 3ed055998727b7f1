// crates/adapt/src/rest/controller.rs

//! One generic controller per resource type. Feature-specific behavior is
//! selected by the type descriptor, never by specialization.

use super::args::ArgSpec;
use super::codec::{permalink, ItemCodec};
use super::fields::AdditionalField;
use super::hooks::{Hooks, RenderScope};
use super::links::LinkBuilder;
use super::params::{collection_params, delete_args, read_args};
use super::permission::Permissions;
use super::schema::{item_schema, ItemSchema, SchemaSource};
use super::translate::{check_relevance, Translator};
use crate::core::{Context, RestError, RestRequest, RestResponse};
use domain::item::{Item, ItemId};
use domain::resource::{ResourceRegistry, ResourceType, Taxonomy};
use domain::security::CapabilityCheck;
use domain::setting::SiteSettings;
use domain::status::{Status, StatusRegistry};
use http::StatusCode;
use serde_json::{json, Value as Json};
use serve::ItemStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Collaborators shared by every controller of a site.
#[derive(Clone)]
pub struct RestEnv {
    pub registry: Arc<ResourceRegistry>,
    pub statuses: Arc<StatusRegistry>,
    pub site: Arc<SiteSettings>,
    pub store: Arc<dyn ItemStore>,
    pub caps: Arc<dyn CapabilityCheck>,
}

pub struct ControllerBuilder {
    env: RestEnv,
    kind: String,
    hooks: Hooks,
    fields: Vec<AdditionalField>,
}

impl ControllerBuilder {
    pub fn new(env: RestEnv, kind: &str) -> Self {
        Self {
            env,
            kind: kind.to_string(),
            hooks: Hooks::default(),
            fields: Vec::new(),
        }
    }

    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn field(mut self, field: AdditionalField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn build(self) -> Result<ResourceController, RestError> {
        let env = self.env;
        let ty = env.registry.get_type(&self.kind).cloned().ok_or_else(|| {
            RestError::new(
                "rest_type_invalid",
                format!("Unknown resource type: {}", self.kind),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        })?;
        let taxonomies = env.registry.rest_taxonomies_for(&ty);
        let schema = item_schema(&SchemaSource {
            ty: &ty,
            taxonomies: &taxonomies,
            statuses: &env.statuses,
            site: &env.site,
            fields: &self.fields,
        });
        let media_base = env
            .registry
            .rest_types()
            .find(|t| t.attachment_like)
            .map(|t| t.rest_base.clone());
        let api_root = format!(
            "{}/{}",
            env.site.rest_root(),
            env.site.namespace.trim_matches('/')
        );

        Ok(ResourceController {
            collection_args: collection_params(&ty, &taxonomies, &env.statuses),
            write_args: schema.write_args(),
            read_args: read_args(&ty),
            delete_args: delete_args(),
            env,
            ty,
            taxonomies,
            hooks: self.hooks,
            fields: self.fields,
            schema,
            api_root,
            media_base,
        })
    }
}

/// CRUD surface for one resource type.
pub struct ResourceController {
    pub(crate) env: RestEnv,
    pub(crate) ty: ResourceType,
    pub(crate) taxonomies: Vec<Taxonomy>,
    pub(crate) hooks: Hooks,
    pub(crate) fields: Vec<AdditionalField>,
    pub(crate) schema: ItemSchema,
    api_root: String,
    media_base: Option<String>,
    collection_args: Vec<ArgSpec>,
    write_args: Vec<ArgSpec>,
    read_args: Vec<ArgSpec>,
    delete_args: Vec<ArgSpec>,
}

impl ResourceController {
    pub fn ty(&self) -> &ResourceType {
        &self.ty
    }

    pub fn rest_base(&self) -> &str {
        &self.ty.rest_base
    }

    pub fn schema(&self) -> &ItemSchema {
        &self.schema
    }

    pub fn collection_args(&self) -> &[ArgSpec] {
        &self.collection_args
    }

    pub fn write_args(&self) -> &[ArgSpec] {
        &self.write_args
    }

    pub fn read_args(&self) -> &[ArgSpec] {
        &self.read_args
    }

    pub fn delete_args(&self) -> &[ArgSpec] {
        &self.delete_args
    }

    pub fn permissions(&self) -> Permissions<'_> {
        Permissions {
            ty: &self.ty,
            registry: &self.env.registry,
            taxonomies: &self.taxonomies,
            statuses: &self.env.statuses,
            caps: self.env.caps.as_ref(),
            store: self.env.store.as_ref(),
        }
    }

    pub fn links(&self) -> LinkBuilder<'_> {
        LinkBuilder {
            api_root: &self.api_root,
            ty: &self.ty,
            taxonomies: &self.taxonomies,
            media_base: self.media_base.as_deref(),
        }
    }

    fn translator(&self) -> Translator<'_> {
        Translator {
            ty: &self.ty,
            args: &self.collection_args,
            taxonomies: &self.taxonomies,
            store: self.env.store.as_ref(),
            gmt_offset_minutes: self.env.site.gmt_offset_minutes,
        }
    }

    /// The item named by the `id` url parameter, if it is of this type.
    fn fetch(&self, req: &RestRequest) -> Result<Item, RestError> {
        req.param_u64("id")
            .filter(|id| *id > 0)
            .and_then(|id| self.env.store.get(id))
            .filter(|item| item.kind == self.ty.name)
            .ok_or_else(|| RestError::not_found("rest_post_invalid_id", "Invalid post ID."))
    }

    fn refetch(&self, id: ItemId) -> Result<Item, RestError> {
        self.env.store.get(id).ok_or_else(|| {
            RestError::new(
                "rest_post_invalid_id",
                "The item vanished after it was written.",
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Collection
    // ─────────────────────────────────────────────────────────────────────

    #[tracing::instrument(skip_all, fields(kind = %self.ty.name))]
    pub fn list(&self, req: &RestRequest) -> Result<RestResponse, RestError> {
        let perms = self.permissions();
        perms.can_list(req)?;
        check_relevance(req)?;

        let query = self.hooks.apply_query(self.translator().translate(req), req);
        let page = self.env.store.query(&query)?;

        let scope = RenderScope::default();
        let codec = ItemCodec::new(self, &scope);
        let rows: Vec<Json> = {
            let _bypass = (req.context() == Context::Edit).then(|| scope.bypass_password());
            page.items
                .iter()
                .filter(|item| perms.check_read_permission(&req.actor, item))
                .map(|item| codec.prepare_response(item, req).linked_body())
                .collect()
        };

        let page_no = req.param_u64("page").unwrap_or(1).max(1);
        let mut total = page.found;
        if total < 1 && page_no > 1 {
            let mut recount = query.clone();
            recount.paged = None;
            total = self.env.store.query(&recount)?.found;
            debug!(page_no, total, "recounted beyond the last page");
        }
        let per_page = query.per_page.unwrap_or(10).max(1) as u64;
        let max_pages = total.div_ceil(per_page);

        let mut resp = RestResponse::ok(Json::Array(rows));
        resp.set_header("X-Total", &total.to_string())?;
        resp.set_header("X-TotalPages", &max_pages.to_string())?;

        let links = self.links();
        if page_no > 1 {
            let prev = (page_no - 1).min(max_pages.max(1));
            resp.link_header("prev", &links.page_url(&req.query, prev), &[])?;
        }
        if max_pages > page_no {
            resp.link_header("next", &links.page_url(&req.query, page_no + 1), &[])?;
        }
        Ok(resp)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Single item
    // ─────────────────────────────────────────────────────────────────────

    #[tracing::instrument(skip_all, fields(kind = %self.ty.name))]
    pub fn get(&self, req: &RestRequest) -> Result<RestResponse, RestError> {
        let item = self.fetch(req)?;
        self.permissions().can_read(req, &item)?;

        let scope = RenderScope::default();
        let codec = ItemCodec::new(self, &scope);
        let unlocked = req.context() == Context::Edit
            || req.param_str("password").is_some_and(|p| !p.is_empty());
        let mut resp = {
            let _bypass = unlocked.then(|| scope.bypass_password());
            codec.prepare_response(&item, req)
        };

        if self.ty.viewable {
            let href = permalink(&self.env.site.url, &self.ty, &item);
            resp.link_header("alternate", &href, &[("type", "text/html")])?;
        }
        Ok(resp)
    }

    #[tracing::instrument(skip_all, fields(kind = %self.ty.name))]
    pub fn create(&self, req: &RestRequest) -> Result<RestResponse, RestError> {
        self.permissions().can_create(req)?;

        let scope = RenderScope::default();
        let codec = ItemCodec::new(self, &scope);
        let changes = codec.decode(req, None)?;
        let id = self.env.store.insert(changes).map_err(|e| {
            if e.is_fault() {
                warn!(error = %e, "insert failed");
            }
            RestError::from(e)
        })?;
        let item = self.refetch(id)?;
        self.hooks.fire_inserted(&item, req, true);

        self.apply_post_write(&codec, &item, req)?;

        let item = self.refetch(id)?;
        let req = req.in_context(Context::Edit);
        let mut resp = codec.prepare_response(&item, &req);
        resp.status = StatusCode::CREATED;
        resp.set_header("Location", &self.links().item_url(id))?;
        debug!(id, status = %item.status, "created");
        Ok(resp)
    }

    #[tracing::instrument(skip_all, fields(kind = %self.ty.name))]
    pub fn update(&self, req: &RestRequest) -> Result<RestResponse, RestError> {
        let existing = self.fetch(req)?;
        self.permissions().can_update(req, &existing)?;

        let scope = RenderScope::default();
        let codec = ItemCodec::new(self, &scope);
        let changes = codec.decode(req, Some(&existing))?;
        if existing.status == Status::Trash && changes.status.is_some() {
            let restored = self.env.store.untrash(existing.id)?;
            debug!(id = restored.id, status = %restored.status, "restored from trash");
        }
        let id = self.env.store.update(changes).map_err(|e| {
            if e.is_fault() {
                warn!(error = %e, "update failed");
            }
            RestError::from(e)
        })?;
        let item = self.refetch(id)?;
        self.hooks.fire_inserted(&item, req, false);

        self.apply_post_write(&codec, &item, req)?;

        let item = self.refetch(id)?;
        let req = req.in_context(Context::Edit);
        debug!(id, status = %item.status, "updated");
        Ok(codec.prepare_response(&item, &req))
    }

    /// Writes that need the item's id. The primary write stays committed
    /// when one of these fails.
    fn apply_post_write(&self, codec: &ItemCodec<'_>, item: &Item, req: &RestRequest) -> Result<(), RestError> {
        let store = self.env.store.as_ref();
        let has = |name: &str| self.schema.has(name) && req.has_param(name);
        let id = item.id;

        if has("sticky") {
            store.set_sticky(id, req.param_bool("sticky").unwrap_or(false))?;
        }
        if has("featured_media") {
            store.set_featured_media(id, req.param_u64("featured_media").unwrap_or(0))?;
        }
        if has("format") {
            if let Some(format) = req.param_str("format").filter(|f| !f.is_empty()) {
                store.set_format(id, format)?;
            }
        }
        if has("template") {
            store.set_template(id, req.param_str("template").unwrap_or_default())?;
        }
        for tax in &self.taxonomies {
            if req.has_param(&tax.rest_base) {
                store.set_terms(id, &tax.name, &req.param_ids(&tax.rest_base))?;
            }
        }
        if has("meta") {
            codec.update_meta(item, req)?;
        }
        for field in &self.fields {
            field.update(item, req)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(kind = %self.ty.name))]
    pub fn delete(&self, req: &RestRequest) -> Result<RestResponse, RestError> {
        let item = self.fetch(req)?;
        let force = req.param_bool("force").unwrap_or(false);

        let site = &self.env.site;
        let mut supports_trash = site.trash_days > 0;
        if self.ty.attachment_like {
            supports_trash = supports_trash && site.media_trash;
        }
        let supports_trash = self.hooks.apply_trashable(supports_trash, &item);

        self.permissions().can_delete(req, &item)?;

        let req = req.in_context(Context::Edit);
        let scope = RenderScope::default();
        let codec = ItemCodec::new(self, &scope);
        let cannot_delete = || {
            RestError::new(
                "rest_cannot_delete",
                "The post cannot be deleted.",
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        };

        let resp = if force {
            let previous = codec.prepare_response(&item, &req);
            self.env.store.delete(item.id).map_err(|e| {
                warn!(id = item.id, error = %e, "delete failed");
                cannot_delete()
            })?;
            RestResponse::ok(json!({"deleted": true, "previous": previous.body}))
        } else {
            if !supports_trash {
                return Err(RestError::new(
                    "rest_trash_not_supported",
                    "The post does not support trashing. Set 'force=true' to delete.",
                    StatusCode::NOT_IMPLEMENTED,
                ));
            }
            if item.status == Status::Trash {
                return Err(RestError::new(
                    "rest_already_trashed",
                    "The post has already been deleted.",
                    StatusCode::GONE,
                ));
            }
            let trashed = self.env.store.trash(item.id).map_err(|e| {
                warn!(id = item.id, error = %e, "trash failed");
                cannot_delete()
            })?;
            codec.prepare_response(&trashed, &req)
        };

        self.hooks.fire_deleted(&item, &resp, &req);
        debug!(id = item.id, force, "deleted");
        Ok(resp)
    }

    /// Public schema of the item representation.
    pub fn schema_json(&self) -> Json {
        self.schema.to_json()
    }
}
