// crates/adapt/src/rest/fields.rs

use super::schema::PropertySchema;
use crate::core::{RestError, RestRequest};
use domain::item::Item;
use serde_json::Value as Json;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

pub type FieldGetter = Arc<dyn Fn(&Item, &RestRequest) -> Json + Send + Sync>;
pub type FieldUpdater = Arc<dyn Fn(&Json, &Item, &RestRequest) -> Result<(), RestError> + Send + Sync>;

/// Extra property registered on a resource type from outside the
/// controller. It appears in the schema, is emitted on encode when it has a
/// getter and is applied after metadata when it has an updater.
#[derive(Clone)]
pub struct AdditionalField {
    pub name: String,
    pub schema: PropertySchema,
    getter: Option<FieldGetter>,
    updater: Option<FieldUpdater>,
}

impl AdditionalField {
    pub fn new(name: &str, schema: PropertySchema) -> Self {
        Self {
            name: name.to_string(),
            schema,
            getter: None,
            updater: None,
        }
    }

    pub fn with_getter<F>(mut self, f: F) -> Self
    where
        F: Fn(&Item, &RestRequest) -> Json + Send + Sync + 'static,
    {
        self.getter = Some(Arc::new(f));
        self
    }

    pub fn with_updater<F>(mut self, f: F) -> Self
    where
        F: Fn(&Json, &Item, &RestRequest) -> Result<(), RestError> + Send + Sync + 'static,
    {
        self.updater = Some(Arc::new(f));
        self
    }

    pub fn get(&self, item: &Item, req: &RestRequest) -> Option<Json> {
        self.getter.as_ref().map(|g| g(item, req))
    }

    /// No-op when the field has no updater or the request does not carry it.
    pub fn update(&self, item: &Item, req: &RestRequest) -> Result<(), RestError> {
        match (&self.updater, req.param(&self.name)) {
            (Some(u), Some(value)) if req.has_param(&self.name) => u(value, item, req),
            _ => Ok(()),
        }
    }
}

impl Debug for AdditionalField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdditionalField")
            .field("name", &self.name)
            .field("getter", &self.getter.is_some())
            .field("updater", &self.updater.is_some())
            .finish()
    }
}
