// crates/adapt/src/rest/params.rs

use super::args::{ArgKind, ArgSpec};
use domain::resource::{Feature, ResourceType, Taxonomy};
use domain::status::StatusRegistry;
use serde_json::json;

pub fn context_arg() -> ArgSpec {
    ArgSpec::new("context", ArgKind::String)
        .describe("Scope under which the request is made; determines fields present in response.")
        .choices(["view", "embed", "edit"])
        .default_value("view")
}

/// Query parameters accepted by the collection endpoint.
pub fn collection_params(ty: &ResourceType, taxonomies: &[Taxonomy], statuses: &StatusRegistry) -> Vec<ArgSpec> {
    let mut args = vec![
        context_arg(),
        ArgSpec::new("page", ArgKind::Integer)
            .describe("Current page of the collection.")
            .default_value(1)
            .range(Some(1), None),
        ArgSpec::new("per_page", ArgKind::Integer)
            .describe("Maximum number of items to be returned in result set.")
            .default_value(10)
            .range(Some(1), Some(100)),
        ArgSpec::new("search", ArgKind::String).describe("Limit results to those matching a string."),
        ArgSpec::new("after", ArgKind::DateTime)
            .describe("Limit response to items published after a given ISO8601 compliant date."),
        ArgSpec::new("before", ArgKind::DateTime)
            .describe("Limit response to items published before a given ISO8601 compliant date."),
    ];

    if ty.supports(Feature::Author) {
        args.push(
            ArgSpec::new("author", ArgKind::IdList)
                .describe("Limit result set to items assigned to specific authors.")
                .default_value(json!([])),
        );
        args.push(
            ArgSpec::new("author_exclude", ArgKind::IdList)
                .describe("Ensure result set excludes items assigned to specific authors.")
                .default_value(json!([])),
        );
    }

    args.push(
        ArgSpec::new("exclude", ArgKind::IdList)
            .describe("Ensure result set excludes specific IDs.")
            .default_value(json!([])),
    );
    args.push(
        ArgSpec::new("include", ArgKind::IdList)
            .describe("Limit result set to specific IDs.")
            .default_value(json!([])),
    );

    if ty.supports(Feature::PageAttributes) {
        args.push(
            ArgSpec::new("menu_order", ArgKind::Integer)
                .describe("Limit result set to items with a specific menu_order value."),
        );
    }

    args.push(
        ArgSpec::new("offset", ArgKind::Integer)
            .describe("Offset the result set by a specific number of items.")
            .range(Some(0), None),
    );
    args.push(
        ArgSpec::new("order", ArgKind::String)
            .describe("Order sort attribute ascending or descending.")
            .choices(["asc", "desc"])
            .default_value("desc"),
    );

    let mut orderby = vec![
        "author", "date", "id", "include", "modified", "parent", "relevance", "slug", "include_slugs", "title",
    ];
    if ty.supports(Feature::PageAttributes) {
        orderby.push("menu_order");
    }
    args.push(
        ArgSpec::new("orderby", ArgKind::String)
            .describe("Sort collection by item attribute.")
            .choices(orderby)
            .default_value("date"),
    );

    if ty.hierarchical || ty.attachment_like {
        args.push(
            ArgSpec::new("parent", ArgKind::IdList)
                .describe("Limit result set to items with particular parent IDs.")
                .default_value(json!([])),
        );
        args.push(
            ArgSpec::new("parent_exclude", ArgKind::IdList)
                .describe("Limit result set to all items except those of a particular parent ID.")
                .default_value(json!([])),
        );
    }

    args.push(
        ArgSpec::new("slug", ArgKind::StringList)
            .describe("Limit result set to items with one or more specific slugs."),
    );
    args.push(
        ArgSpec::new("status", ArgKind::StringList)
            .describe("Limit result set to items assigned one or more statuses.")
            .choices(statuses.names().chain(std::iter::once("any")))
            .default_value(json!(["publish"])),
    );

    for tax in taxonomies {
        args.push(
            ArgSpec::new(&tax.rest_base, ArgKind::IdList)
                .describe(&format!("Limit result set to items with specific terms assigned in the {} taxonomy.", tax.name))
                .default_value(json!([])),
        );
        args.push(
            ArgSpec::new(&format!("{}_exclude", tax.rest_base), ArgKind::IdList)
                .describe(&format!("Limit result set to items except those with specific terms assigned in the {} taxonomy.", tax.name))
                .default_value(json!([])),
        );
    }

    if ty.sticky {
        args.push(ArgSpec::new("sticky", ArgKind::Boolean).describe("Limit result set to items that are sticky."));
    }

    args
}

/// Arguments of `GET /{base}/{id}`.
pub fn read_args(ty: &ResourceType) -> Vec<ArgSpec> {
    let mut args = vec![context_arg()];
    if ty.password {
        args.push(ArgSpec::new("password", ArgKind::String).describe("The password for the item if it is password protected."));
    }
    args
}

/// Arguments of `DELETE /{base}/{id}`.
pub fn delete_args() -> Vec<ArgSpec> {
    vec![ArgSpec::new("force", ArgKind::Boolean)
        .describe("Whether to bypass trash and force deletion.")
        .default_value(false)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(args: &[ArgSpec]) -> Vec<&str> {
        args.iter().map(|a| a.name.as_str()).collect()
    }

    #[test]
    fn post_collection_params() {
        let args = collection_params(
            &ResourceType::post(),
            &[Taxonomy::category(), Taxonomy::post_tag()],
            &StatusRegistry::default(),
        );
        let n = names(&args);
        for expected in ["author", "categories", "categories_exclude", "tags", "tags_exclude", "sticky", "status"] {
            assert!(n.contains(&expected), "missing {expected}");
        }
        assert!(!n.contains(&"parent") && !n.contains(&"menu_order"));

        let status = args.iter().find(|a| a.name == "status").unwrap();
        assert!(status.choices.contains(&"any".to_string()));
        assert!(status.choices.contains(&"trash".to_string()));
        assert_eq!(status.default, Some(json!(["publish"])));
    }

    #[test]
    fn page_collection_params() {
        let args = collection_params(&ResourceType::page(), &[], &StatusRegistry::default());
        let n = names(&args);
        assert!(n.contains(&"parent") && n.contains(&"parent_exclude") && n.contains(&"menu_order"));
        assert!(!n.contains(&"sticky"));

        let orderby = args.iter().find(|a| a.name == "orderby").unwrap();
        assert!(orderby.choices.contains(&"menu_order".to_string()));
    }

    #[test]
    fn media_collection_accepts_parent_filters() {
        let n_args = collection_params(&ResourceType::attachment(), &[], &StatusRegistry::default());
        assert!(names(&n_args).contains(&"parent"));
    }

    #[test]
    fn read_args_include_password_only_when_supported() {
        assert_eq!(names(&read_args(&ResourceType::post())), vec!["context", "password"]);
        assert_eq!(names(&read_args(&ResourceType::attachment())), vec!["context"]);
    }
}
