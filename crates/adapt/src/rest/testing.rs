// crates/adapt/src/rest/testing.rs

//! Shared fixtures for the REST layer's unit tests.

use super::controller::{ControllerBuilder, ResourceController, RestEnv};
use super::permission::Permissions;
use chrono::NaiveDate;
use domain::item::{Item, ItemId};
use domain::resource::{ResourceRegistry, Taxonomy, Term};
use domain::security::{Actor, Principal, Role, RoleCapabilities};
use domain::setting::SiteSettings;
use domain::status::{Status, StatusRegistry};
use serve::{InMemoryStore, ItemStore, Seed, StoreConfig};
use std::collections::BTreeMap;
use std::sync::Arc;

pub(crate) const SITE: &str = "https://example.org";

pub(crate) fn site() -> SiteSettings {
    toml::from_str(&format!("url = \"{SITE}\"")).unwrap()
}

pub(crate) fn user(id: u64, role: Role) -> Actor {
    Actor::User(Principal {
        id,
        login: format!("user{id}"),
        role,
    })
}

pub(crate) fn item(id: ItemId, kind: &str, status: Status) -> Item {
    let at = NaiveDate::from_ymd_opt(2024, 5, 1)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap();
    Item {
        id,
        kind: kind.into(),
        status,
        date: at,
        date_gmt: Some(at),
        modified: at,
        modified_gmt: at,
        slug: format!("item-{id}"),
        parent: 0,
        author: 1,
        guid: format!("{SITE}/?p={id}"),
        title: format!("Item {id}"),
        content: String::new(),
        excerpt: String::new(),
        password: String::new(),
        menu_order: 0,
        comment_status: Default::default(),
        ping_status: Default::default(),
        featured_media: 0,
        template: String::new(),
        format: String::new(),
        meta: Default::default(),
        terms: Default::default(),
        trashed_from: None,
    }
}

/// Default registry, an in-memory store with users 1..=9, categories 1 and
/// 2 and tag 3.
pub(crate) struct Fixture {
    pub registry: ResourceRegistry,
    pub statuses: StatusRegistry,
    pub caps: RoleCapabilities,
    pub store: Arc<InMemoryStore>,
    pub site: SiteSettings,
    taxonomies: BTreeMap<String, Vec<Taxonomy>>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_site(site())
    }

    pub fn with_site(site: SiteSettings) -> Self {
        let registry = ResourceRegistry::with_defaults();
        let statuses = StatusRegistry::default();
        let store = Arc::new(InMemoryStore::new(StoreConfig {
            site_url: site.url.clone(),
            gmt_offset_minutes: site.gmt_offset_minutes,
            ..Default::default()
        }));
        store.register_taxonomy("category");
        store.register_taxonomy("post_tag");
        for id in 1..=9 {
            store.add_user(id);
        }
        for (id, taxonomy) in [(1, "category"), (2, "category"), (3, "post_tag")] {
            store
                .add_term(Term {
                    id,
                    taxonomy: taxonomy.into(),
                    name: format!("Term {id}"),
                    slug: format!("term-{id}"),
                    parent: 0,
                })
                .unwrap();
        }
        let taxonomies = registry
            .types()
            .map(|ty| (ty.name.clone(), registry.rest_taxonomies_for(ty)))
            .collect();
        Self {
            registry,
            caps: RoleCapabilities::new(statuses.clone()),
            statuses,
            store,
            site,
            taxonomies,
        }
    }

    pub fn permissions(&self, kind: &str) -> Permissions<'_> {
        Permissions {
            ty: self.registry.get_type(kind).unwrap(),
            registry: &self.registry,
            taxonomies: &self.taxonomies[kind],
            statuses: &self.statuses,
            caps: &self.caps,
            store: self.store.as_ref(),
        }
    }

    pub fn put(&self, item: Item) {
        self.store
            .load(Seed {
                items: vec![item],
                ..Default::default()
            })
            .unwrap();
    }

    pub fn env(&self) -> RestEnv {
        let store: Arc<dyn ItemStore> = self.store.clone();
        RestEnv {
            registry: Arc::new(self.registry.clone()),
            statuses: Arc::new(self.statuses.clone()),
            site: Arc::new(self.site.clone()),
            store,
            caps: Arc::new(self.caps.clone()),
        }
    }

    pub fn controller(&self, kind: &str) -> ResourceController {
        ControllerBuilder::new(self.env(), kind).build().unwrap()
    }
}
