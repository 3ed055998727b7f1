// crates/domain/src/status.rs

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Lifecycle state of an item.
///
/// The built-in states are modeled explicitly; anything registered at
/// runtime through the [`StatusRegistry`] travels as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Status {
    Publish,
    Future,
    Draft,
    Pending,
    Private,
    Trash,
    AutoDraft,
    Inherit,
    Custom(String),
}

impl Status {
    pub fn as_str(&self) -> &str {
        match self {
            Status::Publish => "publish",
            Status::Future => "future",
            Status::Draft => "draft",
            Status::Pending => "pending",
            Status::Private => "private",
            Status::Trash => "trash",
            Status::AutoDraft => "auto-draft",
            Status::Inherit => "inherit",
            Status::Custom(name) => name.as_str(),
        }
    }

    /// Parse a status name. Never fails: unknown names become `Custom` and
    /// are judged against the registry by the caller.
    pub fn parse(name: &str) -> Self {
        match name {
            "publish" => Status::Publish,
            "future" => Status::Future,
            "draft" => Status::Draft,
            "pending" => Status::Pending,
            "private" => Status::Private,
            "trash" => Status::Trash,
            "auto-draft" => Status::AutoDraft,
            "inherit" => Status::Inherit,
            other => Status::Custom(other.to_string()),
        }
    }

    /// Entering this state requires the publish capability.
    pub fn requires_publish_cap(&self) -> bool {
        matches!(self, Status::Publish | Status::Future | Status::Private)
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Status::parse(&s))
    }
}

/// Registration record for a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusObject {
    pub name: String,
    #[serde(default)]
    pub label: String,
    /// Items in a public status are readable by everyone.
    #[serde(default)]
    pub public: bool,
    /// Internal statuses are not offered as writable values.
    #[serde(default)]
    pub internal: bool,
}

impl StatusObject {
    fn builtin(name: &str, label: &str, public: bool, internal: bool) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            public,
            internal,
        }
    }
}

/// Known statuses, built-in plus whatever the site registers.
#[derive(Debug, Clone)]
pub struct StatusRegistry {
    statuses: BTreeMap<String, StatusObject>,
    order: Vec<String>,
}

impl Default for StatusRegistry {
    fn default() -> Self {
        let mut reg = Self {
            statuses: BTreeMap::new(),
            order: Vec::new(),
        };
        for obj in [
            StatusObject::builtin("publish", "Published", true, false),
            StatusObject::builtin("future", "Scheduled", false, false),
            StatusObject::builtin("draft", "Draft", false, false),
            StatusObject::builtin("pending", "Pending", false, false),
            StatusObject::builtin("private", "Private", false, false),
            StatusObject::builtin("trash", "Trash", false, true),
            StatusObject::builtin("auto-draft", "Auto Draft", false, true),
            StatusObject::builtin("inherit", "Inherit", false, true),
        ] {
            reg.register(obj);
        }
        reg
    }
}

impl StatusRegistry {
    /// Register (or replace) a status object.
    pub fn register(&mut self, obj: StatusObject) {
        if !self.statuses.contains_key(&obj.name) {
            self.order.push(obj.name.clone());
        }
        self.statuses.insert(obj.name.clone(), obj);
    }

    pub fn get(&self, status: &Status) -> Option<&StatusObject> {
        self.statuses.get(status.as_str())
    }

    pub fn is_registered(&self, status: &Status) -> bool {
        self.get(status).is_some()
    }

    pub fn is_public(&self, status: &Status) -> bool {
        self.get(status).map(|o| o.public).unwrap_or(false)
    }

    /// Status names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    /// Names of statuses a client may write.
    pub fn writable_names(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|n| self.statuses.get(*n).map(|o| !o.internal).unwrap_or(false))
            .cloned()
            .collect()
    }
}
