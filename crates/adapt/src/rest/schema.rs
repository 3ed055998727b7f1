// crates/adapt/src/rest/schema.rs

//! Item schema: which properties a resource type exposes, in which
//! contexts, and which of them clients may write.

use super::args::{ArgKind, ArgSpec};
use super::fields::AdditionalField;
use crate::core::Context;
use domain::resource::{Feature, ResourceType, Taxonomy};
use domain::setting::SiteSettings;
use domain::status::StatusRegistry;
use serde_json::{json, Map, Value as Json};
use std::collections::BTreeMap;

const ALL: &[Context] = &Context::ALL;
const VIEW_EDIT: &[Context] = &[Context::View, Context::Edit];
const EDIT: &[Context] = &[Context::Edit];

pub const POST_FORMATS: [&str; 10] = [
    "standard", "aside", "chat", "gallery", "link", "image", "quote", "status", "video", "audio",
];

#[derive(Debug, Clone, PartialEq)]
pub struct PropertySchema {
    pub types: Vec<String>,
    pub description: String,
    pub format: Option<String>,
    pub context: Vec<Context>,
    pub readonly: bool,
    pub enum_values: Option<Vec<Json>>,
    pub properties: BTreeMap<String, PropertySchema>,
    pub items: Option<Box<PropertySchema>>,
}

impl PropertySchema {
    pub fn of(types: &[&str]) -> Self {
        Self {
            types: types.iter().map(|t| t.to_string()).collect(),
            description: String::new(),
            format: None,
            context: ALL.to_vec(),
            readonly: false,
            enum_values: None,
            properties: BTreeMap::new(),
            items: None,
        }
    }

    pub fn describe(mut self, text: &str) -> Self {
        self.description = text.to_string();
        self
    }

    pub fn format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    pub fn contexts(mut self, ctx: &[Context]) -> Self {
        self.context = ctx.to_vec();
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn enumerate<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Json>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn property(mut self, name: &str, schema: PropertySchema) -> Self {
        self.properties.insert(name.to_string(), schema);
        self
    }

    pub fn items(mut self, schema: PropertySchema) -> Self {
        self.items = Some(Box::new(schema));
        self
    }

    pub fn in_context(&self, ctx: Context) -> bool {
        self.context.contains(&ctx)
    }

    fn is(&self, ty: &str) -> bool {
        self.types.iter().any(|t| t == ty)
    }

    pub fn to_json(&self) -> Json {
        let mut obj = Map::new();
        obj.insert(
            "type".into(),
            match self.types.as_slice() {
                [one] => json!(one),
                many => json!(many),
            },
        );
        if !self.description.is_empty() {
            obj.insert("description".into(), json!(self.description));
        }
        if let Some(f) = &self.format {
            obj.insert("format".into(), json!(f));
        }
        obj.insert(
            "context".into(),
            json!(self.context.iter().map(Context::as_str).collect::<Vec<_>>()),
        );
        if self.readonly {
            obj.insert("readonly".into(), json!(true));
        }
        if let Some(values) = &self.enum_values {
            obj.insert("enum".into(), Json::Array(values.clone()));
        }
        if !self.properties.is_empty() {
            obj.insert("properties".into(), props_json(&self.properties));
        }
        if let Some(items) = &self.items {
            obj.insert("items".into(), items.to_json());
        }
        Json::Object(obj)
    }

    /// Endpoint argument accepting writes to this property.
    pub fn to_arg(&self, name: &str) -> ArgSpec {
        let kind = if self.format.as_deref() == Some("date-time") {
            ArgKind::DateTime
        } else if self.is("object") && self.properties.contains_key("raw") {
            ArgKind::Text
        } else if self.is("object") {
            ArgKind::Object
        } else if self.is("array") {
            match self.items.as_deref() {
                Some(i) if i.is("integer") => ArgKind::IdList,
                _ => ArgKind::StringList,
            }
        } else if self.is("integer") {
            ArgKind::Integer
        } else if self.is("number") {
            ArgKind::Number
        } else if self.is("boolean") {
            ArgKind::Boolean
        } else if self.is("string") {
            ArgKind::String
        } else {
            ArgKind::Any
        };
        let mut arg = ArgSpec::new(name, kind).describe(&self.description);
        if self.is("null") {
            arg = arg.nullable();
        }
        if let Some(values) = &self.enum_values {
            arg = arg.choices(values.iter().filter_map(|v| v.as_str().map(String::from)));
        }
        arg
    }
}

fn props_json(props: &BTreeMap<String, PropertySchema>) -> Json {
    Json::Object(
        props
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

/// Schema of one resource type's item representation.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSchema {
    pub title: String,
    pub properties: BTreeMap<String, PropertySchema>,
}

impl ItemSchema {
    pub fn has(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn property(&self, name: &str) -> Option<&PropertySchema> {
        self.properties.get(name)
    }

    pub fn to_json(&self) -> Json {
        json!({
            "$schema": "http://json-schema.org/draft-04/schema#",
            "title": self.title,
            "type": "object",
            "properties": props_json(&self.properties),
        })
    }

    /// Arguments for create/update: every writable property, without
    /// defaults. `status` is left unrestricted so unknown values can fall
    /// back to `draft` during decoding.
    pub fn write_args(&self) -> Vec<ArgSpec> {
        self.properties
            .iter()
            .filter(|(_, p)| !p.readonly)
            .map(|(name, p)| {
                let mut arg = p.to_arg(name);
                if name == "status" {
                    arg.choices.clear();
                }
                arg
            })
            .collect()
    }

    /// Drop every property (recursively) not visible in `ctx`. Members the
    /// schema does not describe are kept.
    pub fn filter(&self, value: Json, ctx: Context) -> Json {
        filter_props(&self.properties, value, ctx)
    }
}

fn filter_props(props: &BTreeMap<String, PropertySchema>, value: Json, ctx: Context) -> Json {
    let Json::Object(obj) = value else {
        return value;
    };
    let mut out = Map::new();
    for (key, v) in obj {
        match props.get(&key) {
            Some(p) if !p.in_context(ctx) => {}
            Some(p) if !p.properties.is_empty() => {
                out.insert(key, filter_props(&p.properties, v, ctx));
            }
            _ => {
                out.insert(key, v);
            }
        }
    }
    Json::Object(out)
}

/// Everything the item schema depends on.
pub struct SchemaSource<'a> {
    pub ty: &'a ResourceType,
    pub taxonomies: &'a [Taxonomy],
    pub statuses: &'a StatusRegistry,
    pub site: &'a SiteSettings,
    pub fields: &'a [AdditionalField],
}

fn text_object(what: &str, ctx: &[Context], protected: bool) -> PropertySchema {
    let mut p = PropertySchema::of(&["object"])
        .describe(&format!("The {what} for the item."))
        .contexts(ctx)
        .property(
            "raw",
            PropertySchema::of(&["string"])
                .describe(&format!("{what}, as it exists in the database."))
                .contexts(EDIT),
        )
        .property(
            "rendered",
            PropertySchema::of(&["string"])
                .describe(&format!("HTML {what}, transformed for display."))
                .contexts(ctx)
                .readonly(),
        );
    if protected {
        p = p.property(
            "protected",
            PropertySchema::of(&["boolean"])
                .describe(&format!("Whether the {what} is protected with a password."))
                .contexts(ctx)
                .readonly(),
        );
    }
    p
}

pub fn item_schema(src: &SchemaSource<'_>) -> ItemSchema {
    let ty = src.ty;
    let mut props = BTreeMap::new();
    let date = |text: &str, ctx: &[Context]| {
        PropertySchema::of(&["string", "null"])
            .format("date-time")
            .describe(text)
            .contexts(ctx)
    };

    props.insert(
        "date".into(),
        date("The date the item was published, in the site's timezone.", ALL),
    );
    props.insert(
        "date_gmt".into(),
        date("The date the item was published, as GMT.", VIEW_EDIT),
    );
    props.insert(
        "guid".into(),
        PropertySchema::of(&["object"])
            .describe("The globally unique identifier for the item.")
            .contexts(VIEW_EDIT)
            .readonly()
            .property(
                "raw",
                PropertySchema::of(&["string"])
                    .describe("GUID for the item, as it exists in the database.")
                    .contexts(EDIT)
                    .readonly(),
            )
            .property(
                "rendered",
                PropertySchema::of(&["string"])
                    .describe("GUID for the item, transformed for display.")
                    .contexts(VIEW_EDIT)
                    .readonly(),
            ),
    );
    props.insert(
        "id".into(),
        PropertySchema::of(&["integer"])
            .describe("Unique identifier for the item.")
            .readonly(),
    );
    props.insert(
        "link".into(),
        PropertySchema::of(&["string"])
            .format("uri")
            .describe("URL to the item.")
            .readonly(),
    );
    props.insert(
        "modified".into(),
        PropertySchema::of(&["string"])
            .format("date-time")
            .describe("The date the item was last modified, in the site's timezone.")
            .contexts(VIEW_EDIT)
            .readonly(),
    );
    props.insert(
        "modified_gmt".into(),
        PropertySchema::of(&["string"])
            .format("date-time")
            .describe("The date the item was last modified, as GMT.")
            .contexts(VIEW_EDIT)
            .readonly(),
    );
    props.insert(
        "slug".into(),
        PropertySchema::of(&["string"]).describe("An alphanumeric identifier for the item unique to its type."),
    );
    props.insert(
        "status".into(),
        PropertySchema::of(&["string"])
            .describe("A named status for the item.")
            .contexts(VIEW_EDIT)
            .enumerate(src.statuses.writable_names()),
    );
    props.insert(
        "type".into(),
        PropertySchema::of(&["string"])
            .describe("Type of item.")
            .readonly(),
    );

    if ty.password {
        props.insert(
            "password".into(),
            PropertySchema::of(&["string"])
                .describe("A password to protect access to the content and excerpt.")
                .contexts(EDIT),
        );
    }
    if ty.hierarchical || ty.attachment_like {
        props.insert(
            "parent".into(),
            PropertySchema::of(&["integer"])
                .describe("The ID for the parent of the item.")
                .contexts(VIEW_EDIT),
        );
    }
    if ty.supports(Feature::Title) {
        props.insert("title".into(), text_object("title", ALL, false));
    }
    if ty.supports(Feature::Editor) {
        props.insert("content".into(), text_object("content", VIEW_EDIT, true));
    }
    if ty.supports(Feature::Author) {
        props.insert(
            "author".into(),
            PropertySchema::of(&["integer"]).describe("The ID for the author of the item."),
        );
    }
    if ty.supports(Feature::Excerpt) {
        props.insert("excerpt".into(), text_object("excerpt", ALL, true));
    }
    if ty.supports(Feature::Thumbnail) {
        props.insert(
            "featured_media".into(),
            PropertySchema::of(&["integer"]).describe("The ID of the featured media for the item."),
        );
    }
    if ty.supports(Feature::Comments) {
        props.insert(
            "comment_status".into(),
            PropertySchema::of(&["string"])
                .describe("Whether or not comments are open on the item.")
                .contexts(VIEW_EDIT)
                .enumerate(["open", "closed"]),
        );
    }
    if ty.supports(Feature::Trackbacks) {
        props.insert(
            "ping_status".into(),
            PropertySchema::of(&["string"])
                .describe("Whether or not the item can be pinged.")
                .contexts(VIEW_EDIT)
                .enumerate(["open", "closed"]),
        );
    }
    if ty.supports(Feature::PageAttributes) {
        props.insert(
            "menu_order".into(),
            PropertySchema::of(&["integer"])
                .describe("The order of the item in relation to other items.")
                .contexts(VIEW_EDIT),
        );
    }
    if ty.supports(Feature::PostFormats) {
        props.insert(
            "format".into(),
            PropertySchema::of(&["string"])
                .describe("The format for the item.")
                .contexts(VIEW_EDIT)
                .enumerate(POST_FORMATS),
        );
    }
    if ty.supports(Feature::CustomFields) {
        let mut meta = PropertySchema::of(&["object"])
            .describe("Meta fields.")
            .contexts(VIEW_EDIT);
        for m in &ty.meta {
            meta = meta.property(
                &m.key,
                PropertySchema::of(&[m.kind.as_str()])
                    .describe(&m.description)
                    .contexts(VIEW_EDIT),
            );
        }
        props.insert("meta".into(), meta);
    }
    if ty.sticky {
        props.insert(
            "sticky".into(),
            PropertySchema::of(&["boolean"])
                .describe("Whether or not the item should be treated as sticky.")
                .contexts(VIEW_EDIT),
        );
    }
    if ty.templates {
        let slugs = std::iter::once(String::new()).chain(src.site.page_templates.keys().cloned());
        props.insert(
            "template".into(),
            PropertySchema::of(&["string"])
                .describe("The theme file to use to display the item.")
                .contexts(VIEW_EDIT)
                .enumerate(slugs),
        );
    }
    for tax in src.taxonomies {
        props.insert(
            tax.rest_base.clone(),
            PropertySchema::of(&["array"])
                .describe(&format!("The terms assigned to the item in the {} taxonomy.", tax.name))
                .contexts(VIEW_EDIT)
                .items(PropertySchema::of(&["integer"])),
        );
    }
    for field in src.fields {
        props.insert(field.name.clone(), field.schema.clone());
    }

    ItemSchema {
        title: ty.name.clone(),
        properties: props,
    }
}
