// crates/domain/src/resource.rs

use crate::item::TermId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Optional capabilities a resource type may support. Each one gates a
/// group of schema properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Feature {
    Title,
    Editor,
    Author,
    Excerpt,
    Thumbnail,
    Comments,
    Trackbacks,
    Revisions,
    PageAttributes,
    PostFormats,
    CustomFields,
}

/// Scalar type of a registered meta key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetaType {
    String,
    Integer,
    Number,
    Boolean,
}

impl MetaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetaType::String => "string",
            MetaType::Integer => "integer",
            MetaType::Number => "number",
            MetaType::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaField {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: MetaType,
    #[serde(default)]
    pub description: String,
}

/// Descriptor for one kind of item served by a controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceType {
    pub name: String,
    pub rest_base: String,
    #[serde(default)]
    pub hierarchical: bool,
    /// Publicly viewable on the site (has an HTML permalink).
    #[serde(default)]
    pub viewable: bool,
    #[serde(default = "yes")]
    pub show_in_rest: bool,
    /// Singular capability stem, e.g. `post` yields `edit_posts`.
    pub capability_type: String,
    #[serde(default)]
    pub supports: BTreeSet<Feature>,
    #[serde(default)]
    pub taxonomies: Vec<String>,
    /// Items can be pinned to the sticky set.
    #[serde(default)]
    pub sticky: bool,
    /// Items can be password protected.
    #[serde(default)]
    pub password: bool,
    /// Items carry a template slug.
    #[serde(default)]
    pub templates: bool,
    /// Media-like: default status `inherit`, any parent type, media trash gate.
    #[serde(default)]
    pub attachment_like: bool,
    #[serde(default)]
    pub meta: Vec<MetaField>,
}

fn yes() -> bool {
    true
}

impl ResourceType {
    pub fn supports(&self, feature: Feature) -> bool {
        self.supports.contains(&feature)
    }

    pub fn post() -> Self {
        use Feature::*;
        Self {
            name: "post".into(),
            rest_base: "posts".into(),
            hierarchical: false,
            viewable: true,
            show_in_rest: true,
            capability_type: "post".into(),
            supports: [
                Title,
                Editor,
                Author,
                Excerpt,
                Thumbnail,
                Comments,
                Trackbacks,
                Revisions,
                PostFormats,
                CustomFields,
            ]
            .into_iter()
            .collect(),
            taxonomies: vec!["category".into(), "post_tag".into()],
            sticky: true,
            password: true,
            templates: false,
            attachment_like: false,
            meta: Vec::new(),
        }
    }

    pub fn page() -> Self {
        use Feature::*;
        Self {
            name: "page".into(),
            rest_base: "pages".into(),
            hierarchical: true,
            viewable: true,
            show_in_rest: true,
            capability_type: "page".into(),
            supports: [
                Title,
                Editor,
                Author,
                Excerpt,
                Thumbnail,
                Comments,
                Revisions,
                PageAttributes,
                CustomFields,
            ]
            .into_iter()
            .collect(),
            taxonomies: Vec::new(),
            sticky: false,
            password: true,
            templates: true,
            attachment_like: false,
            meta: Vec::new(),
        }
    }

    pub fn attachment() -> Self {
        use Feature::*;
        Self {
            name: "attachment".into(),
            rest_base: "media".into(),
            hierarchical: false,
            viewable: true,
            show_in_rest: true,
            capability_type: "post".into(),
            supports: [Title, Author, Comments, CustomFields].into_iter().collect(),
            taxonomies: Vec::new(),
            sticky: false,
            password: false,
            templates: false,
            attachment_like: true,
            meta: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub name: String,
    pub rest_base: String,
    #[serde(default = "yes")]
    pub show_in_rest: bool,
    #[serde(default)]
    pub hierarchical: bool,
}

impl Taxonomy {
    pub fn category() -> Self {
        Self {
            name: "category".into(),
            rest_base: "categories".into(),
            show_in_rest: true,
            hierarchical: true,
        }
    }

    pub fn post_tag() -> Self {
        Self {
            name: "post_tag".into(),
            rest_base: "tags".into(),
            show_in_rest: true,
            hierarchical: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: TermId,
    pub taxonomy: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub parent: TermId,
}

/// Partial override of a type or taxonomy read from settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RestOverride {
    pub name: String,
    #[serde(default)]
    pub show_in_rest: Option<bool>,
    #[serde(default)]
    pub rest_base: Option<String>,
    #[serde(default)]
    pub meta: Vec<MetaField>,
}

/// All resource types and taxonomies known to the site.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    types: BTreeMap<String, ResourceType>,
    taxonomies: BTreeMap<String, Taxonomy>,
}

impl ResourceRegistry {
    /// Registry holding `post`, `page`, `attachment`, `category` and `post_tag`.
    pub fn with_defaults() -> Self {
        let mut reg = Self::default();
        reg.register_type(ResourceType::post());
        reg.register_type(ResourceType::page());
        reg.register_type(ResourceType::attachment());
        reg.register_taxonomy(Taxonomy::category());
        reg.register_taxonomy(Taxonomy::post_tag());
        reg
    }

    pub fn register_type(&mut self, ty: ResourceType) {
        self.types.insert(ty.name.clone(), ty);
    }

    pub fn register_taxonomy(&mut self, tax: Taxonomy) {
        self.taxonomies.insert(tax.name.clone(), tax);
    }

    pub fn get_type(&self, name: &str) -> Option<&ResourceType> {
        self.types.get(name)
    }

    pub fn get_taxonomy(&self, name: &str) -> Option<&Taxonomy> {
        self.taxonomies.get(name)
    }

    pub fn types(&self) -> impl Iterator<Item = &ResourceType> {
        self.types.values()
    }

    /// Types exposed over REST.
    pub fn rest_types(&self) -> impl Iterator<Item = &ResourceType> {
        self.types.values().filter(|t| t.show_in_rest)
    }

    /// Taxonomies attached to `ty` that are exposed over REST, in the order
    /// the type lists them.
    pub fn rest_taxonomies_for(&self, ty: &ResourceType) -> Vec<Taxonomy> {
        ty.taxonomies
            .iter()
            .filter_map(|n| self.taxonomies.get(n))
            .filter(|t| t.show_in_rest)
            .cloned()
            .collect()
    }

    /// Apply a settings override to a type. Unknown names are ignored.
    pub fn override_type(&mut self, o: &RestOverride) {
        if let Some(ty) = self.types.get_mut(&o.name) {
            if let Some(show) = o.show_in_rest {
                ty.show_in_rest = show;
            }
            if let Some(base) = &o.rest_base {
                ty.rest_base = base.clone();
            }
            ty.meta.extend(o.meta.iter().cloned());
        }
    }

    /// Apply a settings override to a taxonomy. Unknown names are ignored.
    pub fn override_taxonomy(&mut self, o: &RestOverride) {
        if let Some(tax) = self.taxonomies.get_mut(&o.name) {
            if let Some(show) = o.show_in_rest {
                tax.show_in_rest = show;
            }
            if let Some(base) = &o.rest_base {
                tax.rest_base = base.clone();
            }
        }
    }
}
