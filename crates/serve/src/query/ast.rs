// crates/serve/src/query/ast.rs

use chrono::NaiveDateTime;
use domain::item::{ItemId, TermId, UserId};
use domain::status::Status;

/// No stored item ever carries this id; filtering on it yields zero rows.
pub const IMPOSSIBLE_ID: ItemId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderBy {
    Author,
    #[default]
    Date,
    Id,
    Modified,
    Parent,
    Relevance,
    Slug,
    Title,
    MenuOrder,
    /// Keep the order of `id_in`.
    PreserveIds,
    /// Keep the order of `names`.
    PreserveNames,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusFilter {
    /// Every status except `trash` and `auto-draft`.
    Any,
    In(Vec<Status>),
    /// Only `publish`.
    #[default]
    Published,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxOp {
    In,
    NotIn,
}

/// Term filter on one taxonomy. Matched by term id, children are never
/// expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxClause {
    pub taxonomy: String,
    pub terms: Vec<TermId>,
    pub op: TaxOp,
}

/// Exclusive date window on the local `date` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub after: Option<NaiveDateTime>,
    pub before: Option<NaiveDateTime>,
}

/// Storage-level query descriptor.
///
/// Empty vectors mean "no constraint". Paging follows the usual convention:
/// `offset` wins over `paged`, and `per_page == None` returns every row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemQuery {
    pub kinds: Vec<String>,
    pub author_in: Vec<UserId>,
    pub author_not_in: Vec<UserId>,
    pub id_in: Vec<ItemId>,
    pub id_not_in: Vec<ItemId>,
    pub parent_in: Vec<ItemId>,
    pub parent_not_in: Vec<ItemId>,
    pub names: Vec<String>,
    pub status: StatusFilter,
    pub search: Option<String>,
    pub menu_order: Option<i64>,
    pub offset: Option<usize>,
    pub order: Order,
    pub orderby: OrderBy,
    pub paged: Option<usize>,
    pub per_page: Option<usize>,
    pub date: Option<DateRange>,
    pub tax: Vec<TaxClause>,
}

impl ItemQuery {
    pub fn for_kind(kind: &str) -> Self {
        Self {
            kinds: vec![kind.to_string()],
            ..Default::default()
        }
    }

    /// First row index of the requested page.
    pub fn start(&self) -> usize {
        match (self.offset, self.per_page) {
            (Some(off), _) => off,
            (None, Some(pp)) => self.paged.unwrap_or(1).saturating_sub(1).saturating_mul(pp),
            (None, None) => 0,
        }
    }

    /// Search terms, lower-cased and split on whitespace.
    pub fn search_terms(&self) -> Vec<String> {
        self.search
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_lowercase).collect())
            .unwrap_or_default()
    }
}
