// crates/adapt/src/rest/permission.rs

use crate::core::{Context, RestError, RestRequest};
use domain::item::Item;
use domain::resource::{ResourceRegistry, ResourceType, Taxonomy};
use domain::security::password::item_password_matches;
use domain::security::{Actor, Capability, CapabilityCheck, Primitive};
use domain::status::{Status, StatusRegistry};
use http::StatusCode;
use serve::ItemStore;
use std::collections::BTreeSet;

/// Capability gates for one resource type. Every check answers with
/// `Ok(())` or the error to surface; denials are 401 for anonymous callers
/// and 403 otherwise.
pub struct Permissions<'a> {
    pub ty: &'a ResourceType,
    pub registry: &'a ResourceRegistry,
    pub taxonomies: &'a [Taxonomy],
    pub statuses: &'a StatusRegistry,
    pub caps: &'a dyn CapabilityCheck,
    pub store: &'a dyn ItemStore,
}

impl Permissions<'_> {
    fn can(&self, actor: &Actor, cap: Capability<'_>) -> bool {
        self.caps.user_can(actor, self.ty, cap)
    }

    fn can_type(&self, actor: &Actor, p: Primitive) -> bool {
        self.can(actor, Capability::Type(p))
    }

    pub fn can_list(&self, req: &RestRequest) -> Result<(), RestError> {
        let actor = &req.actor;
        if req.context() == Context::Edit && !self.can_type(actor, Primitive::Edit) {
            return Err(RestError::authorization(
                actor,
                "rest_forbidden_context",
                "Sorry, you are not allowed to edit items of this type.",
            ));
        }
        for status in req.param_strings("status") {
            let open = status == "publish" || (self.ty.attachment_like && status == "inherit");
            if !open && !self.can_type(actor, Primitive::Edit) {
                return Err(RestError::authorization(actor, "rest_forbidden_status", "Status is forbidden."));
            }
        }
        Ok(())
    }

    /// Single-item read gate.
    pub fn can_read(&self, req: &RestRequest, item: &Item) -> Result<(), RestError> {
        let actor = &req.actor;
        if req.context() == Context::Edit && !self.can(actor, Capability::EditItem(item)) {
            return Err(RestError::authorization(
                actor,
                "rest_forbidden_context",
                "Sorry, you are not allowed to edit this item.",
            ));
        }
        if let Some(supplied) = req.param_str("password").filter(|p| !p.is_empty()) {
            if !item_password_matches(&item.password, supplied) {
                return Err(RestError::new(
                    "rest_post_incorrect_password",
                    "Incorrect item password.",
                    StatusCode::FORBIDDEN,
                ));
            }
        }
        if self.check_read_permission(actor, item) {
            Ok(())
        } else {
            Err(RestError::authorization(
                actor,
                "rest_forbidden",
                "Sorry, you are not allowed to do that.",
            ))
        }
    }

    /// Whether `actor` may see `item` at all.
    ///
    /// Published and public-status items are readable by anyone. `inherit`
    /// follows the parent chain and is readable when the chain ends without
    /// a parent.
    pub fn check_read_permission(&self, actor: &Actor, item: &Item) -> bool {
        let mut visited = BTreeSet::new();
        let mut current = item.clone();
        loop {
            let ty = self.registry.get_type(&current.kind).unwrap_or(self.ty);
            if !ty.show_in_rest {
                return false;
            }
            if current.status == Status::Publish
                || self.caps.user_can(actor, ty, Capability::ReadItem(&current))
                || self.statuses.is_public(&current.status)
            {
                return true;
            }
            if current.status != Status::Inherit {
                return false;
            }
            if current.parent == 0 || !visited.insert(current.id) {
                return true;
            }
            match self.store.get(current.parent) {
                Some(parent) => current = parent,
                None => return true,
            }
        }
    }

    /// True when `item` has a password and this request may see the
    /// protected body anyway.
    pub fn can_access_password_content(&self, item: &Item, req: &RestRequest) -> bool {
        if !item.has_password() {
            return false;
        }
        if req.context() == Context::Edit && self.can(&req.actor, Capability::EditItem(item)) {
            return true;
        }
        match req.param_str("password") {
            Some(supplied) if !supplied.is_empty() => item_password_matches(&item.password, supplied),
            _ => false,
        }
    }

    pub fn can_create(&self, req: &RestRequest) -> Result<(), RestError> {
        let actor = &req.actor;
        if req.param_u64("id").is_some_and(|id| id > 0) {
            return Err(RestError::bad_request("rest_post_exists", "Cannot create existing item."));
        }
        self.check_reassignment(req, "Sorry, you are not allowed to create items as this user.")?;
        if !self.can_type(actor, Primitive::Create) {
            return Err(RestError::authorization(
                actor,
                "rest_cannot_create",
                "Sorry, you are not allowed to create items as this user.",
            ));
        }
        self.check_assign_terms(req)
    }

    pub fn can_update(&self, req: &RestRequest, item: &Item) -> Result<(), RestError> {
        let actor = &req.actor;
        if !self.can(actor, Capability::EditItem(item)) {
            return Err(RestError::authorization(
                actor,
                "rest_cannot_edit",
                "Sorry, you are not allowed to edit this item.",
            ));
        }
        self.check_reassignment(req, "Sorry, you are not allowed to update items as this user.")?;
        self.check_assign_terms(req)
    }

    pub fn can_delete(&self, req: &RestRequest, item: &Item) -> Result<(), RestError> {
        if self.can(&req.actor, Capability::DeleteItem(item)) {
            Ok(())
        } else {
            Err(RestError::authorization(
                &req.actor,
                "rest_cannot_delete",
                "Sorry, you are not allowed to delete this item.",
            ))
        }
    }

    /// Status a write may set. Publish-class statuses need the publish
    /// capability; unknown and internal names degrade to `draft`.
    pub fn handle_status(&self, req: &RestRequest, requested: &str) -> Result<Status, RestError> {
        let status = Status::parse(requested);
        let actor = &req.actor;
        match status {
            Status::Draft | Status::Pending => Ok(status),
            Status::Private if !self.can_type(actor, Primitive::Publish) => Err(RestError::authorization(
                actor,
                "rest_cannot_publish",
                "Sorry, you are not allowed to create private items of this type.",
            )),
            Status::Publish | Status::Future if !self.can_type(actor, Primitive::Publish) => {
                Err(RestError::authorization(
                    actor,
                    "rest_cannot_publish",
                    "Sorry, you are not allowed to publish items of this type.",
                ))
            }
            Status::Inherit if self.ty.attachment_like => Ok(status),
            _ => {
                let usable = self
                    .statuses
                    .get(&status)
                    .map(|o| !o.internal)
                    .unwrap_or(false);
                Ok(if usable { status } else { Status::Draft })
            }
        }
    }

    /// Author reassignment and sticky promotion.
    fn check_reassignment(&self, req: &RestRequest, others_message: &str) -> Result<(), RestError> {
        let actor = &req.actor;
        let others = self.can_type(actor, Primitive::EditOthers);
        if let Some(author) = req.param_u64("author").filter(|a| *a > 0) {
            if author != actor.id() && !others {
                return Err(RestError::authorization(actor, "rest_cannot_edit_others", others_message));
            }
        }
        if self.ty.sticky
            && req.param_bool("sticky") == Some(true)
            && !others
            && !self.can_type(actor, Primitive::Publish)
        {
            return Err(RestError::authorization(
                actor,
                "rest_cannot_assign_sticky",
                "Sorry, you are not allowed to make items sticky.",
            ));
        }
        Ok(())
    }

    fn check_assign_terms(&self, req: &RestRequest) -> Result<(), RestError> {
        let assigns = self
            .taxonomies
            .iter()
            .any(|t| req.has_param(&t.rest_base) && !req.param_ids(&t.rest_base).is_empty());
        if assigns && !self.can_type(&req.actor, Primitive::Edit) {
            return Err(RestError::authorization(
                &req.actor,
                "rest_cannot_assign_term",
                "Sorry, you are not allowed to assign the provided terms.",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::testing::{item, user, Fixture};
    use domain::security::Role;
    use http::Method;

    fn get(actor: Actor) -> RestRequest {
        RestRequest::new(Method::GET, "/wp/v2/posts/1").with_actor(actor)
    }

    #[test]
    fn published_items_are_readable_by_anyone() {
        let fx = Fixture::new();
        let p = fx.permissions("post");
        let it = item(1, "post", Status::Publish);
        assert!(p.check_read_permission(&Actor::Anonymous, &it));
        assert!(p.can_read(&get(Actor::Anonymous), &it).is_ok());
    }

    #[test]
    fn drafts_need_item_edit_rights() {
        let fx = Fixture::new();
        let p = fx.permissions("post");
        let mut draft = item(1, "post", Status::Draft);
        draft.author = 7;

        assert!(!p.check_read_permission(&Actor::Anonymous, &draft));
        assert!(p.check_read_permission(&user(7, Role::Contributor), &draft));
        assert!(!p.check_read_permission(&user(8, Role::Contributor), &draft));
        assert!(p.check_read_permission(&user(9, Role::Editor), &draft));

        let err = p.can_read(&get(Actor::Anonymous), &draft).unwrap_err();
        assert_eq!((err.code.as_str(), err.status), ("rest_forbidden", StatusCode::UNAUTHORIZED));
        let err = p.can_read(&get(user(8, Role::Contributor)), &draft).unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn inherit_follows_the_parent() {
        let fx = Fixture::new();
        fx.put(item(10, "post", Status::Private));
        fx.put(item(11, "post", Status::Publish));
        let p = fx.permissions("attachment");

        let mut media = item(20, "attachment", Status::Inherit);
        media.parent = 10;
        assert!(!p.check_read_permission(&Actor::Anonymous, &media));
        assert!(p.check_read_permission(&user(3, Role::Editor), &media));

        media.parent = 11;
        assert!(p.check_read_permission(&Actor::Anonymous, &media));

        media.parent = 0;
        assert!(p.check_read_permission(&Actor::Anonymous, &media));

        media.parent = 404;
        assert!(p.check_read_permission(&Actor::Anonymous, &media));
    }

    #[test]
    fn edit_context_requires_item_edit() {
        let fx = Fixture::new();
        let p = fx.permissions("post");
        let it = item(1, "post", Status::Publish);
        let req = get(user(5, Role::Subscriber)).with_query("context", "edit");
        let err = p.can_read(&req, &it).unwrap_err();
        assert_eq!((err.code.as_str(), err.status), ("rest_forbidden_context", StatusCode::FORBIDDEN));
    }

    #[test]
    fn wrong_password_is_rejected_regardless_of_capability() {
        let fx = Fixture::new();
        let p = fx.permissions("post");
        let mut it = item(1, "post", Status::Publish);
        it.password = "s3cret".into();

        let err = p
            .can_read(&get(user(1, Role::Administrator)).with_query("password", "nope"), &it)
            .unwrap_err();
        assert_eq!((err.code.as_str(), err.status), ("rest_post_incorrect_password", StatusCode::FORBIDDEN));

        let ok = get(Actor::Anonymous).with_query("password", "s3cret");
        assert!(p.can_read(&ok, &it).is_ok());
        assert!(p.can_access_password_content(&it, &ok));
        assert!(!p.can_access_password_content(&it, &get(Actor::Anonymous)));

        let editor_edit = get(user(2, Role::Editor)).with_query("context", "edit");
        assert!(p.can_access_password_content(&it, &editor_edit));
    }

    #[test]
    fn listing_other_statuses_needs_edit() {
        let fx = Fixture::new();
        let p = fx.permissions("post");
        let list = |actor: Actor, status: &str| {
            RestRequest::new(Method::GET, "/wp/v2/posts")
                .with_actor(actor)
                .with_query("status", serde_json::json!([status]))
        };
        assert!(p.can_list(&list(Actor::Anonymous, "publish")).is_ok());
        let err = p.can_list(&list(Actor::Anonymous, "draft")).unwrap_err();
        assert_eq!((err.code.as_str(), err.status), ("rest_forbidden_status", StatusCode::UNAUTHORIZED));
        assert!(p.can_list(&list(user(4, Role::Contributor), "any")).is_ok());

        let edit = RestRequest::new(Method::GET, "/").with_query("context", "edit");
        assert_eq!(p.can_list(&edit).unwrap_err().code, "rest_forbidden_context");
    }

    #[test]
    fn create_rules() {
        let fx = Fixture::new();
        let p = fx.permissions("post");
        let post = |actor: Actor| RestRequest::new(Method::POST, "/wp/v2/posts").with_actor(actor);

        assert_eq!(
            p.can_create(&post(user(1, Role::Editor)).with_body("id", 5)).unwrap_err().code,
            "rest_post_exists"
        );
        assert_eq!(
            p.can_create(&post(user(4, Role::Author)).with_body("author", 9)).unwrap_err().code,
            "rest_cannot_edit_others"
        );
        assert!(p.can_create(&post(user(4, Role::Author)).with_body("author", 4)).is_ok());
        assert_eq!(
            p.can_create(&post(user(4, Role::Contributor)).with_body("sticky", true)).unwrap_err().code,
            "rest_cannot_assign_sticky"
        );
        assert!(p.can_create(&post(user(4, Role::Author)).with_body("sticky", true)).is_ok());

        let err = p.can_create(&post(user(4, Role::Subscriber))).unwrap_err();
        assert_eq!((err.code.as_str(), err.status), ("rest_cannot_create", StatusCode::FORBIDDEN));
        assert_eq!(p.can_create(&post(Actor::Anonymous)).unwrap_err().status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn update_and_delete_rules() {
        let fx = Fixture::new();
        let p = fx.permissions("post");
        let mut it = item(1, "post", Status::Publish);
        it.author = 4;
        let req = |actor: Actor| RestRequest::new(Method::PUT, "/wp/v2/posts/1").with_actor(actor);

        assert!(p.can_update(&req(user(4, Role::Author)), &it).is_ok());
        assert_eq!(p.can_update(&req(user(4, Role::Contributor)), &it).unwrap_err().code, "rest_cannot_edit");
        assert_eq!(p.can_delete(&req(user(5, Role::Author)), &it).unwrap_err().code, "rest_cannot_delete");
        assert!(p.can_delete(&req(user(5, Role::Editor)), &it).is_ok());
    }

    #[test]
    fn status_transitions() {
        let fx = Fixture::new();
        let p = fx.permissions("post");
        let contributor = RestRequest::new(Method::POST, "/").with_actor(user(4, Role::Contributor));
        let author = RestRequest::new(Method::POST, "/").with_actor(user(4, Role::Author));

        assert_eq!(p.handle_status(&contributor, "pending"), Ok(Status::Pending));
        assert_eq!(p.handle_status(&contributor, "publish").unwrap_err().code, "rest_cannot_publish");
        assert_eq!(p.handle_status(&contributor, "private").unwrap_err().code, "rest_cannot_publish");
        assert_eq!(p.handle_status(&author, "future"), Ok(Status::Future));
        assert_eq!(p.handle_status(&author, "bogus"), Ok(Status::Draft));
        assert_eq!(p.handle_status(&author, "trash"), Ok(Status::Draft));
    }

    #[test]
    fn assigning_terms_needs_edit() {
        let fx = Fixture::new();
        let p = fx.permissions("post");
        let req = RestRequest::new(Method::POST, "/")
            .with_actor(user(4, Role::Subscriber))
            .with_body("categories", serde_json::json!([1]));
        assert!(p.check_assign_terms(&req).is_err());
    }
}
