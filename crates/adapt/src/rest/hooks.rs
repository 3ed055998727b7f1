// crates/adapt/src/rest/hooks.rs

//! Extension points of a resource controller.
//!
//! Listeners and filters run synchronously in registration order. A
//! controller's hook set is fixed once the controller is built.

use crate::core::{RestRequest, RestResponse};
use domain::item::{Item, ItemChanges};
use serve::ItemQuery;
use std::cell::Cell;
use std::sync::Arc;

pub type InsertedListener = Arc<dyn Fn(&Item, &RestRequest, bool) + Send + Sync>;
pub type DeletedListener = Arc<dyn Fn(&Item, &RestResponse, &RestRequest) + Send + Sync>;
pub type QueryFilter = Arc<dyn Fn(ItemQuery, &RestRequest) -> ItemQuery + Send + Sync>;
pub type TrashableFilter = Arc<dyn Fn(bool, &Item) -> bool + Send + Sync>;
pub type PreInsertFilter = Arc<dyn Fn(ItemChanges, &RestRequest) -> ItemChanges + Send + Sync>;
pub type ResponseFilter = Arc<dyn Fn(RestResponse, &Item, &RestRequest) -> RestResponse + Send + Sync>;

#[derive(Clone, Default)]
pub struct Hooks {
    inserted: Vec<InsertedListener>,
    deleted: Vec<DeletedListener>,
    query: Vec<QueryFilter>,
    trashable: Vec<TrashableFilter>,
    pre_insert: Vec<PreInsertFilter>,
    response: Vec<ResponseFilter>,
}

impl Hooks {
    /// Fired after an item is created or updated; `creating` tells which.
    pub fn on_inserted<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&Item, &RestRequest, bool) + Send + Sync + 'static,
    {
        self.inserted.push(Arc::new(f));
        self
    }

    /// Fired after an item is trashed or deleted.
    pub fn on_deleted<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&Item, &RestResponse, &RestRequest) + Send + Sync + 'static,
    {
        self.deleted.push(Arc::new(f));
        self
    }

    pub fn filter_query<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(ItemQuery, &RestRequest) -> ItemQuery + Send + Sync + 'static,
    {
        self.query.push(Arc::new(f));
        self
    }

    pub fn filter_trashable<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(bool, &Item) -> bool + Send + Sync + 'static,
    {
        self.trashable.push(Arc::new(f));
        self
    }

    pub fn filter_pre_insert<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(ItemChanges, &RestRequest) -> ItemChanges + Send + Sync + 'static,
    {
        self.pre_insert.push(Arc::new(f));
        self
    }

    pub fn filter_response<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(RestResponse, &Item, &RestRequest) -> RestResponse + Send + Sync + 'static,
    {
        self.response.push(Arc::new(f));
        self
    }

    pub fn fire_inserted(&self, item: &Item, req: &RestRequest, creating: bool) {
        for l in &self.inserted {
            l(item, req, creating);
        }
    }

    pub fn fire_deleted(&self, item: &Item, resp: &RestResponse, req: &RestRequest) {
        for l in &self.deleted {
            l(item, resp, req);
        }
    }

    pub fn apply_query(&self, q: ItemQuery, req: &RestRequest) -> ItemQuery {
        self.query.iter().fold(q, |q, f| f(q, req))
    }

    pub fn apply_trashable(&self, supports: bool, item: &Item) -> bool {
        self.trashable.iter().fold(supports, |s, f| f(s, item))
    }

    pub fn apply_pre_insert(&self, changes: ItemChanges, req: &RestRequest) -> ItemChanges {
        self.pre_insert.iter().fold(changes, |c, f| f(c, req))
    }

    pub fn apply_response(&self, resp: RestResponse, item: &Item, req: &RestRequest) -> RestResponse {
        self.response.iter().fold(resp, |r, f| f(r, item, req))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Render overrides
// ─────────────────────────────────────────────────────────────────────────────

/// Temporary rendering overrides for one controller invocation.
///
/// Each override is switched on through a guard and restored to its previous
/// value when the guard drops, including on early returns.
#[derive(Debug, Default)]
pub struct RenderScope {
    bypass_password: Cell<bool>,
    plain_protected_title: Cell<bool>,
}

pub struct ScopeGuard<'a> {
    flag: &'a Cell<bool>,
    previous: bool,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}

impl RenderScope {
    fn raise(flag: &Cell<bool>) -> ScopeGuard<'_> {
        let previous = flag.replace(true);
        ScopeGuard { flag, previous }
    }

    /// Protected bodies render as if no password were set.
    pub fn bypass_password(&self) -> ScopeGuard<'_> {
        Self::raise(&self.bypass_password)
    }

    /// Protected titles render without the `Protected: ` prefix.
    pub fn plain_protected_title(&self) -> ScopeGuard<'_> {
        Self::raise(&self.plain_protected_title)
    }

    pub fn password_bypassed(&self) -> bool {
        self.bypass_password.get()
    }

    pub fn protected_title_plain(&self) -> bool {
        self.plain_protected_title.get()
    }
}
