// crates/adapt/src/rest/translate.rs

//! Public collection parameters to storage query.

use super::args::ArgSpec;
use super::dates::date_with_gmt;
use crate::core::{RestError, RestRequest};
use domain::resource::{ResourceType, Taxonomy};
use domain::status::Status;
use serve::query::{DateRange, Order, OrderBy, StatusFilter, TaxClause, TaxOp, IMPOSSIBLE_ID};
use serve::{ItemQuery, ItemStore};

/// `orderby=relevance` only makes sense with a search term.
pub fn check_relevance(req: &RestRequest) -> Result<(), RestError> {
    let searching = req.param_str("search").is_some_and(|s| !s.trim().is_empty());
    if req.param_str("orderby") == Some("relevance") && !searching {
        return Err(RestError::bad_request(
            "rest_no_search_term_defined",
            "You need to define a search term to order by relevance.",
        ));
    }
    Ok(())
}

fn orderby(name: &str) -> Option<OrderBy> {
    Some(match name {
        "author" => OrderBy::Author,
        "date" => OrderBy::Date,
        "id" => OrderBy::Id,
        "include" => OrderBy::PreserveIds,
        "modified" => OrderBy::Modified,
        "parent" => OrderBy::Parent,
        "relevance" => OrderBy::Relevance,
        "slug" => OrderBy::Slug,
        "include_slugs" => OrderBy::PreserveNames,
        "title" => OrderBy::Title,
        "menu_order" => OrderBy::MenuOrder,
        _ => return None,
    })
}

pub struct Translator<'a> {
    pub ty: &'a ResourceType,
    pub args: &'a [ArgSpec],
    pub taxonomies: &'a [Taxonomy],
    pub store: &'a dyn ItemStore,
    pub gmt_offset_minutes: i32,
}

impl Translator<'_> {
    /// Registered and present, defaults included.
    fn given(&self, req: &RestRequest, name: &str) -> bool {
        self.args.iter().any(|a| a.name == name) && req.param(name).is_some()
    }

    pub fn translate(&self, req: &RestRequest) -> ItemQuery {
        let mut q = ItemQuery::for_kind(&self.ty.name);
        let ids = |name: &str| req.param_ids(name);

        if self.given(req, "author") {
            q.author_in = ids("author");
        }
        if self.given(req, "author_exclude") {
            q.author_not_in = ids("author_exclude");
        }
        if self.given(req, "exclude") {
            q.id_not_in = ids("exclude");
        }
        if self.given(req, "include") {
            q.id_in = ids("include");
        }
        if self.given(req, "menu_order") {
            q.menu_order = req.param_i64("menu_order");
        }
        if self.given(req, "offset") {
            q.offset = req.param_u64("offset").map(|n| n as usize);
        }
        if self.given(req, "order") {
            q.order = match req.param_str("order") {
                Some("asc") => Order::Asc,
                _ => Order::Desc,
            };
        }
        if self.given(req, "orderby") {
            if let Some(o) = req.param_str("orderby").and_then(orderby) {
                q.orderby = o;
            }
        }
        if self.given(req, "page") {
            q.paged = req.param_u64("page").map(|n| n as usize);
        }
        if self.given(req, "parent") {
            q.parent_in = ids("parent");
        }
        if self.given(req, "parent_exclude") {
            q.parent_not_in = ids("parent_exclude");
        }
        if self.given(req, "search") {
            q.search = req
                .param_str("search")
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from);
        }
        if self.given(req, "slug") {
            q.names = req.param_strings("slug");
        }
        if self.given(req, "status") {
            let statuses = req.param_strings("status");
            q.status = if statuses.iter().any(|s| s == "any") {
                StatusFilter::Any
            } else {
                StatusFilter::In(statuses.iter().map(|s| Status::parse(s)).collect())
            };
        }

        let bound = |name: &str| {
            self.given(req, name)
                .then(|| req.param_str(name))
                .flatten()
                .and_then(|raw| date_with_gmt(raw, false, self.gmt_offset_minutes))
                .map(|(local, _)| local)
        };
        let (after, before) = (bound("after"), bound("before"));
        if after.is_some() || before.is_some() {
            q.date = Some(DateRange { after, before });
        }

        q.per_page = req.param_u64("per_page").map(|n| n as usize);

        if self.given(req, "sticky") {
            self.apply_sticky(&mut q, req.param_bool("sticky").unwrap_or(false));
        }

        for tax in self.taxonomies {
            let include = ids(&tax.rest_base);
            if !include.is_empty() {
                q.tax.push(TaxClause {
                    taxonomy: tax.name.clone(),
                    terms: include,
                    op: TaxOp::In,
                });
            }
            let exclude = ids(&format!("{}_exclude", tax.rest_base));
            if !exclude.is_empty() {
                q.tax.push(TaxClause {
                    taxonomy: tax.name.clone(),
                    terms: exclude,
                    op: TaxOp::NotIn,
                });
            }
        }

        q
    }

    fn apply_sticky(&self, q: &mut ItemQuery, sticky: bool) {
        let pinned = self.store.sticky_ids();
        if sticky {
            q.id_in = if q.id_in.is_empty() {
                pinned
            } else {
                pinned.into_iter().filter(|id| q.id_in.contains(id)).collect()
            };
            if q.id_in.is_empty() {
                q.id_in = vec![IMPOSSIBLE_ID];
            }
        } else if !pinned.is_empty() {
            q.id_not_in.extend(pinned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::args::validate;
    use crate::rest::params::collection_params;
    use crate::rest::testing::{item, Fixture};
    use chrono::NaiveDate;
    use http::Method;
    use serde_json::json;

    fn run(fx: &Fixture, kind: &str, req: RestRequest) -> ItemQuery {
        let ty = fx.registry.get_type(kind).unwrap();
        let taxonomies = fx.registry.rest_taxonomies_for(ty);
        let args = collection_params(ty, &taxonomies, &fx.statuses);
        let mut req = req;
        validate(&args, &mut req).unwrap();
        Translator {
            ty,
            args: &args,
            taxonomies: &taxonomies,
            store: fx.store.as_ref(),
            gmt_offset_minutes: 60,
        }
        .translate(&req)
    }

    fn list() -> RestRequest {
        RestRequest::new(Method::GET, "/wp/v2/posts")
    }

    #[test]
    fn relevance_needs_a_search_term() {
        let err = check_relevance(&list().with_query("orderby", "relevance")).unwrap_err();
        assert_eq!(err.code, "rest_no_search_term_defined");
        assert!(check_relevance(&list().with_query("orderby", "relevance").with_query("search", "x")).is_ok());
        assert!(check_relevance(&list().with_query("orderby", "relevance").with_query("search", "  ")).is_err());
    }

    #[test]
    fn defaults_translate_to_first_published_page() {
        let fx = Fixture::new();
        let q = run(&fx, "post", list());
        assert_eq!(q.kinds, vec!["post"]);
        assert_eq!(q.paged, Some(1));
        assert_eq!(q.per_page, Some(10));
        assert_eq!(q.order, Order::Desc);
        assert_eq!(q.orderby, OrderBy::Date);
        assert_eq!(q.status, StatusFilter::In(vec![Status::Publish]));
        assert!(q.id_in.is_empty() && q.tax.is_empty() && q.date.is_none());
    }

    #[test]
    fn public_names_map_to_query_fields() {
        let fx = Fixture::new();
        let q = run(
            &fx,
            "post",
            list()
                .with_query("author", "3,4")
                .with_query("author_exclude", "5")
                .with_query("include", "7,8")
                .with_query("exclude", json!([9]))
                .with_query("orderby", "include")
                .with_query("order", "asc")
                .with_query("slug", "a,b")
                .with_query("offset", "2")
                .with_query("page", "3")
                .with_query("per_page", "5")
                .with_query("status", "any")
                .with_query("categories", "1")
                .with_query("tags_exclude", "3"),
        );
        assert_eq!(q.author_in, vec![3, 4]);
        assert_eq!(q.author_not_in, vec![5]);
        assert_eq!(q.id_in, vec![7, 8]);
        assert_eq!(q.id_not_in, vec![9]);
        assert_eq!(q.orderby, OrderBy::PreserveIds);
        assert_eq!(q.order, Order::Asc);
        assert_eq!(q.names, vec!["a", "b"]);
        assert_eq!((q.offset, q.paged, q.per_page), (Some(2), Some(3), Some(5)));
        assert_eq!(q.status, StatusFilter::Any);
        assert_eq!(
            q.tax,
            vec![
                TaxClause { taxonomy: "category".into(), terms: vec![1], op: TaxOp::In },
                TaxClause { taxonomy: "post_tag".into(), terms: vec![3], op: TaxOp::NotIn },
            ]
        );
    }

    #[test]
    fn unregistered_params_are_ignored() {
        let fx = Fixture::new();
        let q = run(&fx, "post", list().with_query("parent", "4").with_query("menu_order", "2"));
        assert!(q.parent_in.is_empty());
        assert_eq!(q.menu_order, None);

        let q = run(&fx, "page", list().with_query("parent", "4").with_query("menu_order", "2"));
        assert_eq!(q.parent_in, vec![4]);
        assert_eq!(q.menu_order, Some(2));
    }

    #[test]
    fn dates_become_a_local_range() {
        let fx = Fixture::new();
        let q = run(
            &fx,
            "post",
            list()
                .with_query("after", "2024-01-01T00:00:00")
                .with_query("before", "2024-02-01T00:00:00Z"),
        );
        let at = |m, h| NaiveDate::from_ymd_opt(2024, m, 1).and_then(|d| d.and_hms_opt(h, 0, 0)).unwrap();
        assert_eq!(
            q.date,
            Some(DateRange {
                after: Some(at(1, 0)),
                before: Some(at(2, 1)),
            })
        );
    }

    #[test]
    fn sticky_true_intersects_with_include() {
        let fx = Fixture::new();
        for id in [1, 2, 3] {
            fx.put(item(id, "post", Status::Publish));
        }
        fx.store.set_sticky(2, true).unwrap();
        fx.store.set_sticky(3, true).unwrap();

        let q = run(&fx, "post", list().with_query("sticky", "true"));
        assert_eq!(q.id_in, vec![2, 3]);

        let q = run(&fx, "post", list().with_query("sticky", "true").with_query("include", "3,1"));
        assert_eq!(q.id_in, vec![3]);

        let q = run(&fx, "post", list().with_query("sticky", "true").with_query("include", "1"));
        assert_eq!(q.id_in, vec![IMPOSSIBLE_ID]);
    }

    #[test]
    fn sticky_false_excludes_the_sticky_set() {
        let fx = Fixture::new();
        fx.put(item(2, "post", Status::Publish));
        fx.store.set_sticky(2, true).unwrap();

        let q = run(&fx, "post", list().with_query("sticky", "false").with_query("exclude", "5"));
        assert_eq!(q.id_not_in, vec![5, 2]);
    }

    #[test]
    fn sticky_with_empty_set_yields_nothing() {
        let fx = Fixture::new();
        let q = run(&fx, "post", list().with_query("sticky", "1"));
        assert_eq!(q.id_in, vec![IMPOSSIBLE_ID]);
    }
}
