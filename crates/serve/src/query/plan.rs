// crates/serve/src/query/plan.rs

use super::ast::{ItemQuery, Order, OrderBy};
use super::eval::matches;
use domain::item::Item;
use std::cmp::Ordering;

/// Rows of one page plus the number of rows matching overall.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPage {
    pub items: Vec<Item>,
    /// Total matches ignoring paging. Left at 0 when the page is empty, so
    /// callers that need an authoritative count on an out-of-range page
    /// must ask again without paging.
    pub found: u64,
}

/// Filter, sort and page `items` according to `q`.
pub fn execute<'a, I>(q: &ItemQuery, items: I) -> QueryPage
where
    I: IntoIterator<Item = &'a Item>,
{
    let mut rows: Vec<&Item> = items.into_iter().filter(|i| matches(q, i)).collect();
    let total = rows.len();

    apply_sort(&mut rows, q);
    let page = apply_skip_limit(rows, q.start(), q.per_page);

    let found = if page.is_empty() { 0 } else { total as u64 };
    QueryPage {
        items: page.into_iter().cloned().collect(),
        found,
    }
}

fn apply_sort(rows: &mut [&Item], q: &ItemQuery) {
    if rows.len() <= 1 {
        return;
    }

    match q.orderby {
        OrderBy::PreserveIds => {
            rows.sort_by_key(|i| position(&q.id_in, &i.id));
            return;
        }
        OrderBy::PreserveNames => {
            rows.sort_by_key(|i| position(&q.names, &i.slug));
            return;
        }
        OrderBy::Relevance => {
            let terms = q.search_terms();
            let phrase = terms.join(" ");
            rows.sort_by(|a, b| {
                relevance(a, &phrase, &terms)
                    .cmp(&relevance(b, &phrase, &terms))
                    .then_with(|| b.date.cmp(&a.date))
            });
            return;
        }
        _ => {}
    }

    rows.sort_by(|a, b| {
        let ord = compare_field(a, b, q.orderby).then_with(|| a.id.cmp(&b.id));
        match q.order {
            Order::Asc => ord,
            Order::Desc => ord.reverse(),
        }
    });
}

fn compare_field(a: &Item, b: &Item, by: OrderBy) -> Ordering {
    match by {
        OrderBy::Author => a.author.cmp(&b.author),
        OrderBy::Date => a.date.cmp(&b.date),
        OrderBy::Id => a.id.cmp(&b.id),
        OrderBy::Modified => a.modified.cmp(&b.modified),
        OrderBy::Parent => a.parent.cmp(&b.parent),
        OrderBy::Slug => a.slug.cmp(&b.slug),
        OrderBy::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        OrderBy::MenuOrder => a.menu_order.cmp(&b.menu_order),
        OrderBy::Relevance | OrderBy::PreserveIds | OrderBy::PreserveNames => Ordering::Equal,
    }
}

fn position<T: PartialEq>(list: &[T], v: &T) -> usize {
    list.iter().position(|x| x == v).unwrap_or(usize::MAX)
}

/// Lower is more relevant: full phrase in title, all terms in title, any
/// term in title, phrase in excerpt, phrase in content, anything else.
fn relevance(item: &Item, phrase: &str, terms: &[String]) -> u8 {
    let title = item.title.to_lowercase();
    if !phrase.is_empty() && title.contains(phrase) {
        1
    } else if !terms.is_empty() && terms.iter().all(|t| title.contains(t.as_str())) {
        2
    } else if terms.iter().any(|t| title.contains(t.as_str())) {
        3
    } else if !phrase.is_empty() && item.excerpt.to_lowercase().contains(phrase) {
        4
    } else if !phrase.is_empty() && item.content.to_lowercase().contains(phrase) {
        5
    } else {
        6
    }
}

fn apply_skip_limit<T>(mut rows: Vec<T>, skip: usize, limit: Option<usize>) -> Vec<T> {
    let total = rows.len();
    let start = skip.min(total);
    let end = limit.map_or(total, |l| start.saturating_add(l).min(total));
    if start >= end {
        return Vec::new();
    }
    rows.drain(start..end).collect()
}
