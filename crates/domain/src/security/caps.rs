// crates/domain/src/security/caps.rs

use super::actor::{Actor, Role};
use crate::item::Item;
use crate::resource::ResourceType;
use crate::status::{Status, StatusRegistry};

/// Type-level capabilities. The concrete capability name is derived from the
/// resource type's capability stem (`edit_posts`, `edit_others_pages`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Edit,
    EditOthers,
    EditPublished,
    EditPrivate,
    Publish,
    ReadPrivate,
    Delete,
    DeleteOthers,
    DeletePublished,
    DeletePrivate,
    Create,
}

impl Primitive {
    pub fn name(&self, capability_type: &str) -> String {
        let verb = match self {
            Primitive::Edit => "edit",
            Primitive::EditOthers => "edit_others",
            Primitive::EditPublished => "edit_published",
            Primitive::EditPrivate => "edit_private",
            Primitive::Publish => "publish",
            Primitive::ReadPrivate => "read_private",
            Primitive::Delete => "delete",
            Primitive::DeleteOthers => "delete_others",
            Primitive::DeletePublished => "delete_published",
            Primitive::DeletePrivate => "delete_private",
            Primitive::Create => "create",
        };
        format!("{verb}_{capability_type}s")
    }
}

/// A capability question: either a type-level primitive or a per-item meta
/// capability that is resolved against the item's author and status.
#[derive(Debug, Clone, Copy)]
pub enum Capability<'a> {
    Type(Primitive),
    EditItem(&'a Item),
    DeleteItem(&'a Item),
    ReadItem(&'a Item),
}

/// Answers `has-capability(principal, capability, target?)`.
pub trait CapabilityCheck: Send + Sync {
    fn user_can(&self, actor: &Actor, ty: &ResourceType, cap: Capability<'_>) -> bool;
}

/// Role-based capability provider with the conventional role sets.
#[derive(Debug, Clone, Default)]
pub struct RoleCapabilities {
    statuses: StatusRegistry,
}

impl RoleCapabilities {
    pub fn new(statuses: StatusRegistry) -> Self {
        Self { statuses }
    }

    /// Whether `role` holds `p` for the given capability stem.
    pub fn role_has(role: Role, capability_type: &str, p: Primitive) -> bool {
        use Primitive::*;
        match role {
            Role::Administrator | Role::Editor => true,
            Role::Author => {
                capability_type == "post"
                    && matches!(p, Edit | EditPublished | Publish | Delete | DeletePublished | Create)
            }
            Role::Contributor => capability_type == "post" && matches!(p, Edit | Delete | Create),
            Role::Subscriber => false,
        }
    }

    /// Primitives required for a per-item capability. An empty list means
    /// the capability is granted to any authenticated user.
    pub fn map_meta(&self, user_id: u64, cap: Capability<'_>) -> Vec<Primitive> {
        match cap {
            Capability::Type(p) => vec![p],
            Capability::EditItem(item) => self.map_write(user_id, item, false),
            Capability::DeleteItem(item) => self.map_write(user_id, item, true),
            // non-public items are readable exactly by those who may edit them
            Capability::ReadItem(item) => {
                if self.statuses.is_public(&item.status) {
                    Vec::new()
                } else {
                    self.map_write(user_id, item, false)
                }
            }
        }
    }

    fn map_write(&self, user_id: u64, item: &Item, delete: bool) -> Vec<Primitive> {
        let (base, others, published, private) = if delete {
            (
                Primitive::Delete,
                Primitive::DeleteOthers,
                Primitive::DeletePublished,
                Primitive::DeletePrivate,
            )
        } else {
            (
                Primitive::Edit,
                Primitive::EditOthers,
                Primitive::EditPublished,
                Primitive::EditPrivate,
            )
        };

        // trashed items are judged by the status they had before
        let status = match (&item.status, &item.trashed_from) {
            (Status::Trash, Some(prior)) => prior,
            (s, _) => s,
        };
        let live = matches!(status, Status::Publish | Status::Future);

        if item.author == user_id {
            if live {
                vec![published]
            } else if *status == Status::Private {
                vec![private]
            } else {
                vec![base]
            }
        } else {
            let mut caps = vec![others];
            if live {
                caps.push(published);
            } else if *status == Status::Private {
                caps.push(private);
            }
            caps
        }
    }
}

impl CapabilityCheck for RoleCapabilities {
    fn user_can(&self, actor: &Actor, ty: &ResourceType, cap: Capability<'_>) -> bool {
        let Some(principal) = actor.principal() else {
            return false;
        };
        self.map_meta(principal.id, cap)
            .into_iter()
            .all(|p| Self::role_has(principal.role, &ty.capability_type, p))
    }
}
