// crates/serve/src/query/eval.rs

use super::ast::{ItemQuery, StatusFilter, TaxClause, TaxOp};
use domain::item::Item;
use domain::status::Status;

/// Does `item` satisfy every constraint of `q`? Paging and ordering are not
/// considered here.
pub fn matches(q: &ItemQuery, item: &Item) -> bool {
    in_set(&q.kinds, &item.kind)
        && in_set(&q.author_in, &item.author)
        && not_in_set(&q.author_not_in, &item.author)
        && in_set(&q.id_in, &item.id)
        && not_in_set(&q.id_not_in, &item.id)
        && in_set(&q.parent_in, &item.parent)
        && not_in_set(&q.parent_not_in, &item.parent)
        && in_set(&q.names, &item.slug)
        && status_matches(&q.status, &item.status)
        && q.menu_order.map_or(true, |m| item.menu_order == m)
        && date_matches(q, item)
        && q.tax.iter().all(|c| tax_matches(c, item))
        && search_matches(&q.search_terms(), item)
}

fn in_set<T: PartialEq>(set: &[T], v: &T) -> bool {
    set.is_empty() || set.contains(v)
}

fn not_in_set<T: PartialEq>(set: &[T], v: &T) -> bool {
    !set.contains(v)
}

/// `inherit` rides along with `publish`; attachments live in that status.
pub fn status_matches(filter: &StatusFilter, status: &Status) -> bool {
    match filter {
        StatusFilter::Any => !matches!(status, Status::Trash | Status::AutoDraft),
        StatusFilter::Published => matches!(status, Status::Publish | Status::Inherit),
        StatusFilter::In(list) => {
            list.contains(status) || (*status == Status::Inherit && list.contains(&Status::Publish))
        }
    }
}

fn date_matches(q: &ItemQuery, item: &Item) -> bool {
    let Some(range) = q.date else {
        return true;
    };
    range.after.map_or(true, |a| item.date > a) && range.before.map_or(true, |b| item.date < b)
}

fn tax_matches(clause: &TaxClause, item: &Item) -> bool {
    let assigned = item.terms_in(&clause.taxonomy);
    let hit = clause.terms.iter().any(|t| assigned.contains(t));
    match clause.op {
        TaxOp::In => hit,
        TaxOp::NotIn => !hit,
    }
}

/// Every term must appear in title, excerpt or content. A leading `-`
/// excludes the term instead.
fn search_matches(terms: &[String], item: &Item) -> bool {
    if terms.is_empty() {
        return true;
    }
    let hay = [&item.title, &item.excerpt, &item.content]
        .iter()
        .map(|s| s.to_lowercase())
        .collect::<Vec<_>>();
    terms.iter().all(|t| match t.strip_prefix('-') {
        Some(neg) if !neg.is_empty() => !hay.iter().any(|h| h.contains(neg)),
        _ => hay.iter().any(|h| h.contains(t.as_str())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::DateRange;
    use crate::store::tests::sample_item;
    use chrono::NaiveDate;

    // ─────────────────────────────────────────────────────────────
    // status
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn any_excludes_trash_and_auto_draft() {
        assert!(status_matches(&StatusFilter::Any, &Status::Private));
        assert!(!status_matches(&StatusFilter::Any, &Status::Trash));
        assert!(!status_matches(&StatusFilter::Any, &Status::AutoDraft));
    }

    #[test]
    fn publish_filter_admits_inherit() {
        assert!(status_matches(&StatusFilter::Published, &Status::Inherit));
        assert!(!status_matches(&StatusFilter::Published, &Status::Draft));
        let f = StatusFilter::In(vec![Status::Draft, Status::Publish]);
        assert!(status_matches(&f, &Status::Inherit));
        assert!(status_matches(&f, &Status::Draft));
        assert!(!status_matches(&StatusFilter::In(vec![Status::Draft]), &Status::Inherit));
    }

    // ─────────────────────────────────────────────────────────────
    // field filters
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn id_and_author_sets() {
        let item = sample_item(4, "post", Status::Publish);
        let mut q = ItemQuery::for_kind("post");
        assert!(matches(&q, &item));

        q.id_in = vec![1, 2];
        assert!(!matches(&q, &item));
        q.id_in = vec![4];
        assert!(matches(&q, &item));

        q.author_not_in = vec![item.author];
        assert!(!matches(&q, &item));
    }

    #[test]
    fn kind_mismatch_never_matches() {
        let item = sample_item(1, "page", Status::Publish);
        assert!(!matches(&ItemQuery::for_kind("post"), &item));
    }

    #[test]
    fn date_window_is_exclusive() {
        let item = sample_item(1, "post", Status::Publish);
        let at = item.date;
        let mut q = ItemQuery::for_kind("post");

        q.date = Some(DateRange {
            after: Some(at),
            before: None,
        });
        assert!(!matches(&q, &item));

        let earlier = NaiveDate::from_ymd_opt(2000, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        q.date = Some(DateRange {
            after: Some(earlier),
            before: None,
        });
        assert!(matches(&q, &item));
    }

    #[test]
    fn taxonomy_clauses_match_by_term_id() {
        let mut item = sample_item(1, "post", Status::Publish);
        item.terms.insert("category".into(), vec![3, 5]);
        let mut q = ItemQuery::for_kind("post");

        q.tax = vec![TaxClause {
            taxonomy: "category".into(),
            terms: vec![5, 9],
            op: TaxOp::In,
        }];
        assert!(matches(&q, &item));

        q.tax[0].op = TaxOp::NotIn;
        assert!(!matches(&q, &item));

        q.tax[0].taxonomy = "post_tag".into();
        assert!(matches(&q, &item));
    }

    #[test]
    fn search_requires_every_term_and_honours_exclusion() {
        let mut item = sample_item(1, "post", Status::Publish);
        item.title = "Rust in Production".into();
        item.content = "Ownership everywhere".into();
        let mut q = ItemQuery::for_kind("post");

        q.search = Some("rust ownership".into());
        assert!(matches(&q, &item));
        q.search = Some("rust python".into());
        assert!(!matches(&q, &item));
        q.search = Some("rust -ownership".into());
        assert!(!matches(&q, &item));
    }
}
