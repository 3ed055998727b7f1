// crates/serve/src/store/mem.rs

use super::{ItemStore, Seed, StoreError};
use crate::query::{self, ItemQuery, QueryPage};
use chrono::{Duration, NaiveDateTime, Utc};
use domain::item::{Item, ItemChanges, ItemId, TermId, Toggle, UserId};
use domain::resource::Term;
use domain::status::Status;
use parking_lot::RwLock;
use regex::Regex;
use serde_json::Value as Json;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;
use tracing::{debug, warn};

static RE_SLUG_INVALID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9_-]+").unwrap());
static RE_DASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").unwrap());

/// Site-level defaults the store applies on insert.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub site_url: String,
    pub gmt_offset_minutes: i32,
    pub default_comment_status: Toggle,
    pub default_ping_status: Toggle,
    /// Kinds that behave like media (default status `inherit`).
    pub attachment_kinds: Vec<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            site_url: "http://localhost".into(),
            gmt_offset_minutes: 0,
            default_comment_status: Toggle::Open,
            default_ping_status: Toggle::Open,
            attachment_kinds: vec!["attachment".into()],
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tables
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Tables {
    items: BTreeMap<ItemId, Item>,
    next_id: ItemId,
    sticky: Vec<ItemId>,
    terms: BTreeMap<TermId, Term>,
    taxonomies: BTreeSet<String>,
    users: BTreeSet<UserId>,
}

impl Tables {
    fn item_mut(&mut self, id: ItemId) -> Result<&mut Item, StoreError> {
        self.items.get_mut(&id).ok_or(StoreError::InvalidItem(id))
    }

    fn slug_taken(&self, kind: &str, id: ItemId, slug: &str) -> bool {
        self.items
            .values()
            .any(|i| i.id != id && i.kind == kind && i.slug == slug)
    }

    fn unique_slug(&self, kind: &str, id: ItemId, base: &str) -> String {
        if base.is_empty() || !self.slug_taken(kind, id, base) {
            return base.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}-{n}");
            if !self.slug_taken(kind, id, &candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Thread-safe in-memory storage engine.
#[derive(Debug)]
pub struct InMemoryStore {
    cfg: StoreConfig,
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new(cfg: StoreConfig) -> Self {
        Self {
            cfg,
            tables: RwLock::new(Tables {
                next_id: 1,
                ..Default::default()
            }),
        }
    }

    pub fn register_taxonomy(&self, name: &str) {
        self.tables.write().taxonomies.insert(name.to_string());
    }

    pub fn add_user(&self, id: UserId) {
        self.tables.write().users.insert(id);
    }

    /// Register a term. Terms of unregistered taxonomies are rejected.
    pub fn add_term(&self, term: Term) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        if !t.taxonomies.contains(&term.taxonomy) {
            return Err(StoreError::InvalidTaxonomy(term.taxonomy));
        }
        t.terms.insert(term.id, term);
        Ok(())
    }

    /// Load seed content verbatim. Ids are kept; the id counter moves past
    /// the highest one.
    pub fn load(&self, seed: Seed) -> Result<(), StoreError> {
        for term in seed.terms {
            if let Err(e) = self.add_term(term) {
                warn!("skipping seed term: {e}");
            }
        }
        let mut t = self.tables.write();
        for item in seed.items {
            if item.id == query::IMPOSSIBLE_ID {
                return Err(StoreError::Seed("item id 0 is reserved".into()));
            }
            let next = item
                .id
                .checked_add(1)
                .ok_or_else(|| StoreError::Seed(format!("item id {} is out of range", item.id)))?;
            t.next_id = t.next_id.max(next);
            t.items.insert(item.id, item);
        }
        for id in seed.sticky {
            if t.items.contains_key(&id) && !t.sticky.contains(&id) {
                t.sticky.push(id);
            }
        }
        debug!("seeded {} items, {} terms", t.items.len(), t.terms.len());
        Ok(())
    }

    fn offset(&self) -> Duration {
        Duration::minutes(self.cfg.gmt_offset_minutes as i64)
    }

    /// (local, gmt) wall clock.
    fn now(&self) -> (NaiveDateTime, NaiveDateTime) {
        let gmt = Utc::now().naive_utc();
        (gmt + self.offset(), gmt)
    }

    fn is_attachment(&self, kind: &str) -> bool {
        self.cfg.attachment_kinds.iter().any(|k| k == kind)
    }

    /// Expand whichever of local/GMT was supplied into the stored pair.
    /// Floating statuses keep no GMT date unless one was given.
    fn resolve_dates(
        &self,
        date: Option<NaiveDateTime>,
        date_gmt: Option<NaiveDateTime>,
        status: &Status,
        now_local: NaiveDateTime,
    ) -> (NaiveDateTime, Option<NaiveDateTime>) {
        let floating = is_floating(status);
        match (date, date_gmt) {
            (Some(d), Some(g)) => (d, Some(g)),
            (Some(d), None) => (d, (!floating).then(|| d - self.offset())),
            (None, Some(g)) => (g + self.offset(), Some(g)),
            (None, None) => (now_local, (!floating).then(|| now_local - self.offset())),
        }
    }

    fn guid_for(&self, kind: &str, id: ItemId) -> String {
        let base = self.cfg.site_url.trim_end_matches('/');
        if self.is_attachment(kind) {
            format!("{base}/?attachment_id={id}")
        } else if kind == "post" {
            format!("{base}/?p={id}")
        } else {
            format!("{base}/?post_type={kind}&p={id}")
        }
    }

    fn default_comment_status(&self, kind: &str) -> Toggle {
        if kind == "page" {
            Toggle::Closed
        } else {
            self.cfg.default_comment_status
        }
    }
}

fn is_floating(status: &Status) -> bool {
    matches!(status, Status::Draft | Status::Pending | Status::AutoDraft)
}

/// Publishing into the future schedules; scheduling into the past publishes.
fn schedule(status: Status, date_gmt: Option<NaiveDateTime>, now_gmt: NaiveDateTime) -> Status {
    match (status, date_gmt) {
        (Status::Publish, Some(g)) if g > now_gmt => Status::Future,
        (Status::Future, Some(g)) if g <= now_gmt => Status::Publish,
        (s, _) => s,
    }
}

/// Lower-case, dash-separated, ASCII only.
pub fn sanitize_slug(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let dashed = RE_SLUG_INVALID.replace_all(&lower, "-");
    RE_DASHES
        .replace_all(&dashed, "-")
        .trim_matches('-')
        .to_string()
}

fn is_empty_body(title: &str, content: &str, excerpt: &str) -> bool {
    title.trim().is_empty() && content.trim().is_empty() && excerpt.trim().is_empty()
}

// ─────────────────────────────────────────────────────────────────────────────
// ItemStore
// ─────────────────────────────────────────────────────────────────────────────

impl ItemStore for InMemoryStore {
    fn query(&self, q: &ItemQuery) -> Result<QueryPage, StoreError> {
        let t = self.tables.read();
        Ok(query::execute(q, t.items.values()))
    }

    fn get(&self, id: ItemId) -> Option<Item> {
        self.tables.read().items.get(&id).cloned()
    }

    fn insert(&self, c: ItemChanges) -> Result<ItemId, StoreError> {
        let kind = c.kind.clone().ok_or(StoreError::Insert)?;
        let attachment = self.is_attachment(&kind);
        let title = c.title.clone().unwrap_or_default();
        let content = c.content.clone().unwrap_or_default();
        let excerpt = c.excerpt.clone().unwrap_or_default();
        if !attachment && is_empty_body(&title, &content, &excerpt) {
            return Err(StoreError::EmptyContent);
        }

        let (now_local, now_gmt) = self.now();
        let status = c.status.clone().unwrap_or(if attachment {
            Status::Inherit
        } else {
            Status::Draft
        });
        let (date, date_gmt) = self.resolve_dates(c.date, c.date_gmt, &status, now_local);
        let status = schedule(status, date_gmt, now_gmt);

        let mut t = self.tables.write();
        let id = t.next_id;
        t.next_id = id.checked_add(1).ok_or(StoreError::Insert)?;

        let base = match &c.slug {
            Some(s) => sanitize_slug(s),
            None if !is_floating(&status) => sanitize_slug(&title),
            None => String::new(),
        };
        let slug = t.unique_slug(&kind, id, &base);

        let item = Item {
            id,
            guid: self.guid_for(&kind, id),
            comment_status: c
                .comment_status
                .unwrap_or_else(|| self.default_comment_status(&kind)),
            ping_status: c.ping_status.unwrap_or(self.cfg.default_ping_status),
            kind,
            status,
            date,
            date_gmt,
            modified: now_local,
            modified_gmt: now_gmt,
            slug,
            parent: c.parent.unwrap_or(0),
            author: c.author.unwrap_or(0),
            title,
            content,
            excerpt,
            password: c.password.unwrap_or_default(),
            menu_order: c.menu_order.unwrap_or(0),
            featured_media: 0,
            template: String::new(),
            format: String::new(),
            meta: BTreeMap::new(),
            terms: BTreeMap::new(),
            trashed_from: None,
        };
        debug!(id, kind = %item.kind, status = %item.status, "inserted item");
        t.items.insert(id, item);
        Ok(id)
    }

    fn update(&self, c: ItemChanges) -> Result<ItemId, StoreError> {
        let id = c.id.ok_or(StoreError::Update)?;
        let (now_local, now_gmt) = self.now();
        let mut t = self.tables.write();
        let mut item = t.items.get(&id).cloned().ok_or(StoreError::InvalidItem(id))?;
        let attachment = self.is_attachment(&item.kind);

        if let Some(v) = c.title {
            item.title = v;
        }
        if let Some(v) = c.content {
            item.content = v;
        }
        if let Some(v) = c.excerpt {
            item.excerpt = v;
        }
        if !attachment && is_empty_body(&item.title, &item.content, &item.excerpt) {
            return Err(StoreError::EmptyContent);
        }

        let status = c.status.unwrap_or_else(|| item.status.clone());
        if c.date.is_some() || c.date_gmt.is_some() {
            let (d, g) = self.resolve_dates(c.date, c.date_gmt, &status, now_local);
            item.date = d;
            item.date_gmt = g;
        } else if item.date_gmt.is_none() && !is_floating(&status) {
            // an undated draft takes the moment it leaves the floating states
            item.date = now_local;
            item.date_gmt = Some(now_gmt);
        }
        item.status = schedule(status, item.date_gmt, now_gmt);
        if item.status != Status::Trash {
            item.trashed_from = None;
        }

        if let Some(v) = c.parent {
            item.parent = v;
        }
        if let Some(v) = c.author {
            item.author = v;
        }
        if let Some(v) = c.password {
            item.password = v;
        }
        if let Some(v) = c.menu_order {
            item.menu_order = v;
        }
        if let Some(v) = c.comment_status {
            item.comment_status = v;
        }
        if let Some(v) = c.ping_status {
            item.ping_status = v;
        }

        let base = match &c.slug {
            Some(s) => sanitize_slug(s),
            None if item.slug.is_empty() && !is_floating(&item.status) => {
                sanitize_slug(&item.title)
            }
            None => item.slug.clone(),
        };
        item.slug = t.unique_slug(&item.kind, id, &base);
        item.modified = now_local;
        item.modified_gmt = now_gmt;

        debug!(id, status = %item.status, "updated item");
        t.items.insert(id, item);
        Ok(id)
    }

    fn trash(&self, id: ItemId) -> Result<Item, StoreError> {
        let mut t = self.tables.write();
        let item = t.item_mut(id)?;
        if item.status == Status::Trash {
            return Err(StoreError::Delete);
        }
        item.trashed_from = Some(std::mem::replace(&mut item.status, Status::Trash));
        Ok(item.clone())
    }

    fn untrash(&self, id: ItemId) -> Result<Item, StoreError> {
        let mut t = self.tables.write();
        let item = t.item_mut(id)?;
        if item.status != Status::Trash {
            return Err(StoreError::Update);
        }
        item.status = item.trashed_from.take().unwrap_or(Status::Draft);
        Ok(item.clone())
    }

    fn delete(&self, id: ItemId) -> Result<Item, StoreError> {
        let mut t = self.tables.write();
        let removed = t.items.remove(&id).ok_or(StoreError::Delete)?;
        t.sticky.retain(|s| *s != id);

        for other in t.items.values_mut() {
            if other.parent == id {
                // same-kind children move up a level, anything else is orphaned
                other.parent = if other.kind == removed.kind {
                    removed.parent
                } else {
                    0
                };
            }
            if other.featured_media == id {
                other.featured_media = 0;
            }
        }
        debug!(id, "deleted item");
        Ok(removed)
    }

    fn set_terms(&self, id: ItemId, taxonomy: &str, terms: &[TermId]) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        if !t.taxonomies.contains(taxonomy) {
            return Err(StoreError::InvalidTaxonomy(taxonomy.to_string()));
        }
        let mut keep: Vec<TermId> = Vec::with_capacity(terms.len());
        for term in terms {
            let known = t
                .terms
                .get(term)
                .map(|x| x.taxonomy == taxonomy)
                .unwrap_or(false);
            if known && !keep.contains(term) {
                keep.push(*term);
            }
        }
        let item = t.item_mut(id)?;
        if keep.is_empty() {
            item.terms.remove(taxonomy);
        } else {
            item.terms.insert(taxonomy.to_string(), keep);
        }
        Ok(())
    }

    fn sticky_ids(&self) -> Vec<ItemId> {
        self.tables.read().sticky.clone()
    }

    fn set_sticky(&self, id: ItemId, sticky: bool) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        if !t.items.contains_key(&id) {
            return Err(StoreError::InvalidItem(id));
        }
        let present = t.sticky.contains(&id);
        if sticky && !present {
            t.sticky.push(id);
        } else if !sticky && present {
            t.sticky.retain(|s| *s != id);
        }
        Ok(())
    }

    fn user_exists(&self, id: UserId) -> bool {
        self.tables.read().users.contains(&id)
    }

    fn set_featured_media(&self, id: ItemId, media: ItemId) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        if media != 0 {
            let valid = t
                .items
                .get(&media)
                .map(|m| self.is_attachment(&m.kind))
                .unwrap_or(false);
            if !valid {
                return Err(StoreError::InvalidFeaturedMedia);
            }
        }
        t.item_mut(id)?.featured_media = media;
        Ok(())
    }

    fn set_format(&self, id: ItemId, format: &str) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        let item = t.item_mut(id)?;
        item.format = if format == "standard" {
            String::new()
        } else {
            format.to_string()
        };
        Ok(())
    }

    fn set_template(&self, id: ItemId, template: &str) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        t.item_mut(id)?.template = template.to_string();
        Ok(())
    }

    fn set_meta(&self, id: ItemId, key: &str, value: Option<Json>) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        let item = t.item_mut(id)?;
        match value {
            Some(v) => {
                item.meta.insert(key.to_string(), v);
            }
            None => {
                item.meta.remove(key);
            }
        }
        Ok(())
    }
}
