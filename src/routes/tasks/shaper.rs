//! Turns the raw `/tasks` query string into a validated list query and renders
//! it into SQL fragments.
//!
//! Recognised parameters:
//!
//! * `filter[is_done]=true` or `filter[is_done]=true,false` (OR semantics)
//! * `sort=created_at,-title` (leading `-` means descending)
//! * `page=2` and `page_size=25`
//!
//! Every user-supplied value is bound as a parameter. Column names come from
//! [`SortField::column`] and never from the request.

use std::collections::HashMap;

use sqlx::{Postgres, QueryBuilder};
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

const FILTER_PREFIX: &str = "filter[";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid filter value `{0}` for `is_done`. Allowed values are true, false, 1 and 0.")]
    InvalidFilterValue(String),

    #[error("Requested filter `{0}` is not allowed. Allowed filters are `is_done`.")]
    UnknownFilter(String),

    #[error("Invalid sort parameter `{0}`. Allowed sorts are `created_at, title, is_done`.")]
    InvalidSortField(String),

    #[error("The page must be an integer.")]
    InvalidPageValue(String),

    #[error("The page size must be an integer between 1 and 100.")]
    InvalidPageSize(String),
}

impl QueryError {
    /// Query-string parameter the error refers to.
    pub fn parameter(&self) -> &'static str {
        match self {
            Self::InvalidFilterValue(_) => "filter[is_done]",
            Self::UnknownFilter(_) => "filter",
            Self::InvalidSortField(_) => "sort",
            Self::InvalidPageValue(_) => "page",
            Self::InvalidPageSize(_) => "page_size",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    Title,
    IsDone,
}

impl SortField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "created_at" => Some(Self::CreatedAt),
            "title" => Some(Self::Title),
            "is_done" => Some(Self::IsDone),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::Title => "title",
            Self::IsDone => "is_done",
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "t.created_at",
            Self::Title => "t.title",
            Self::IsDone => "t.is_done",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub direction: Direction,
}

impl SortKey {
    pub fn asc(field: SortField) -> Self {
        Self { field, direction: Direction::Asc }
    }

    pub fn desc(field: SortField) -> Self {
        Self { field, direction: Direction::Desc }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilters {
    /// Accepted `is_done` values; `None` leaves the column unfiltered.
    pub is_done: Option<Vec<bool>>,
}

impl TaskFilters {
    pub fn matches(&self, is_done: bool) -> bool {
        self.is_done.as_ref().map_or(true, |set| set.contains(&is_done))
    }

    pub fn push_conditions(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        if let Some(values) = &self.is_done {
            qb.push(" AND t.is_done = ANY(");
            qb.push_bind(values.clone());
            qb.push(")");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: i64,
    pub size: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self { number: 1, size: DEFAULT_PAGE_SIZE }
    }
}

impl Page {
    pub fn offset(&self) -> i64 {
        (self.number - 1).saturating_mul(self.size)
    }

    pub fn push_limit(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        qb.push(" LIMIT ");
        qb.push_bind(self.size);
        qb.push(" OFFSET ");
        qb.push_bind(self.offset());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListQuery {
    pub filters: TaskFilters,
    pub sort: Vec<SortKey>,
    pub page: Page,
}

impl Default for TaskListQuery {
    fn default() -> Self {
        Self {
            filters: TaskFilters::default(),
            sort: vec![SortKey::desc(SortField::CreatedAt)],
            page: Page::default(),
        }
    }
}

impl TaskListQuery {
    /// Validates the query-string map.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, QueryError> {
        let mut query = Self::default();

        for (key, value) in params {
            if let Some(name) = key
                .strip_prefix(FILTER_PREFIX)
                .and_then(|rest| rest.strip_suffix(']'))
            {
                match name {
                    "is_done" => query.filters.is_done = parse_bool_set(value)?,
                    other => return Err(QueryError::UnknownFilter(other.to_string())),
                }
            }
        }

        if let Some(raw) = params.get("sort") {
            let keys = parse_sort(raw)?;
            if !keys.is_empty() {
                query.sort = keys;
            }
        }

        if let Some(raw) = params.get("page") {
            query.page.number = parse_positive(raw)
                .ok_or_else(|| QueryError::InvalidPageValue(raw.clone()))?;
        }

        if let Some(raw) = params.get("page_size") {
            query.page.size = parse_positive(raw)
                .filter(|size| *size <= MAX_PAGE_SIZE)
                .ok_or_else(|| QueryError::InvalidPageSize(raw.clone()))?;
        }

        tracing::debug!(?query, "shaped task list query");
        Ok(query)
    }

    /// Query-string pairs, page number excluded, that reproduce this query.
    /// Defaults are left out.
    pub fn link_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        if let Some(values) = &self.filters.is_done {
            let joined = values
                .iter()
                .map(|v| if *v { "true" } else { "false" })
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("filter[is_done]", joined));
        }

        if self.sort != Self::default().sort {
            let joined = self
                .sort
                .iter()
                .map(|key| match key.direction {
                    Direction::Asc => key.field.name().to_string(),
                    Direction::Desc => format!("-{}", key.field.name()),
                })
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("sort", joined));
        }

        if self.page.size != DEFAULT_PAGE_SIZE {
            pairs.push(("page_size", self.page.size.to_string()));
        }

        pairs
    }

    /// ` ORDER BY ...` with `t.id ASC` as the final tie-breaker.
    pub fn push_order(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        qb.push(" ORDER BY ");
        for key in &self.sort {
            qb.push(key.field.column());
            qb.push(" ");
            qb.push(key.direction.keyword());
            qb.push(", ");
        }
        qb.push("t.id ASC");
    }
}

fn parse_bool_token(token: &str) -> Option<bool> {
    match token.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_bool_set(raw: &str) -> Result<Option<Vec<bool>>, QueryError> {
    let mut values = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let value =
            parse_bool_token(token).ok_or_else(|| QueryError::InvalidFilterValue(token.to_string()))?;
        if !values.contains(&value) {
            values.push(value);
        }
    }

    Ok((!values.is_empty()).then_some(values))
}

fn parse_sort(raw: &str) -> Result<Vec<SortKey>, QueryError> {
    let mut keys: Vec<SortKey> = Vec::new();
    for segment in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (name, direction) = match segment.strip_prefix('-') {
            Some(name) => (name, Direction::Desc),
            None => (segment, Direction::Asc),
        };
        let field =
            SortField::parse(name).ok_or_else(|| QueryError::InvalidSortField(name.to_string()))?;
        if keys.iter().all(|k| k.field != field) {
            keys.push(SortKey { field, direction });
        }
    }
    Ok(keys)
}

fn parse_positive(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|n| *n >= 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let query = TaskListQuery::from_params(&HashMap::new()).unwrap();

        assert_eq!(query.filters.is_done, None);
        assert_eq!(query.sort, vec![SortKey::desc(SortField::CreatedAt)]);
        assert_eq!(query.page, Page { number: 1, size: 10 });
    }

    #[rstest]
    #[case("true", vec![true])]
    #[case("1", vec![true])]
    #[case("FALSE", vec![false])]
    #[case("0", vec![false])]
    #[case("true,false", vec![true, false])]
    #[case(" 1 , 1 ", vec![true])]
    fn test_is_done_filter(#[case] raw: &str, #[case] expected: Vec<bool>) {
        let query = TaskListQuery::from_params(&params(&[("filter[is_done]", raw)])).unwrap();

        assert_eq!(query.filters.is_done, Some(expected));
    }

    #[test]
    fn test_empty_filter_is_ignored() {
        let query = TaskListQuery::from_params(&params(&[("filter[is_done]", "")])).unwrap();

        assert_eq!(query.filters.is_done, None);
        assert!(query.filters.matches(true));
        assert!(query.filters.matches(false));
    }

    #[rstest]
    #[case("invalid")]
    #[case("true,maybe")]
    #[case("yes")]
    fn test_invalid_filter_value(#[case] raw: &str) {
        let err = TaskListQuery::from_params(&params(&[("filter[is_done]", raw)])).unwrap_err();

        assert!(matches!(err, QueryError::InvalidFilterValue(_)));
    }

    #[test]
    fn test_unknown_filter() {
        let err = TaskListQuery::from_params(&params(&[("filter[title]", "x")])).unwrap_err();

        assert_eq!(err, QueryError::UnknownFilter("title".into()));
        assert!(err.to_string().contains("`is_done`"));
    }

    #[test]
    fn test_filter_predicate() {
        let filters = TaskFilters { is_done: Some(vec![true]) };

        assert!(filters.matches(true));
        assert!(!filters.matches(false));
    }

    #[test]
    fn test_composite_sort() {
        let query = TaskListQuery::from_params(&params(&[("sort", "created_at,-title")])).unwrap();

        assert_eq!(
            query.sort,
            vec![SortKey::asc(SortField::CreatedAt), SortKey::desc(SortField::Title)]
        );
    }

    #[test]
    fn test_repeated_sort_field_keeps_first() {
        let query = TaskListQuery::from_params(&params(&[("sort", "-title,title,is_done")])).unwrap();

        assert_eq!(
            query.sort,
            vec![SortKey::desc(SortField::Title), SortKey::asc(SortField::IsDone)]
        );
    }

    #[test]
    fn test_blank_sort_uses_default() {
        let query = TaskListQuery::from_params(&params(&[("sort", " , ")])).unwrap();

        assert_eq!(query.sort, vec![SortKey::desc(SortField::CreatedAt)]);
    }

    #[rstest]
    #[case("invalid", "invalid")]
    #[case("-id", "id")]
    #[case("title,-owner_id", "owner_id")]
    #[case("-", "")]
    fn test_invalid_sort(#[case] raw: &str, #[case] field: &str) {
        let err = TaskListQuery::from_params(&params(&[("sort", raw)])).unwrap_err();

        assert_eq!(err, QueryError::InvalidSortField(field.to_string()));
        assert!(err.to_string().starts_with("Invalid sort parameter"));
    }

    #[rstest]
    #[case("abc")]
    #[case("0")]
    #[case("-3")]
    #[case("1.5")]
    fn test_invalid_page(#[case] raw: &str) {
        let err = TaskListQuery::from_params(&params(&[("page", raw)])).unwrap_err();

        assert_eq!(err, QueryError::InvalidPageValue(raw.to_string()));
        assert_eq!(err.parameter(), "page");
    }

    #[rstest]
    #[case("0")]
    #[case("101")]
    #[case("ten")]
    fn test_invalid_page_size(#[case] raw: &str) {
        let err = TaskListQuery::from_params(&params(&[("page_size", raw)])).unwrap_err();

        assert!(matches!(err, QueryError::InvalidPageSize(_)));
    }

    #[test]
    fn test_page_offset() {
        let query =
            TaskListQuery::from_params(&params(&[("page", "3"), ("page_size", "25")])).unwrap();

        assert_eq!(query.page.offset(), 50);
        assert_eq!(Page::default().offset(), 0);
    }

    #[test]
    fn test_unrelated_parameters_ignored() {
        let query = TaskListQuery::from_params(&params(&[("is_done", "invalid")])).unwrap();

        assert_eq!(query, TaskListQuery::default());
    }

    #[test]
    fn test_order_clause_ends_with_id() {
        let query = TaskListQuery::from_params(&params(&[("sort", "is_done,-created_at")])).unwrap();
        let mut qb = QueryBuilder::new("SELECT 1 FROM tasks t");
        query.push_order(&mut qb);

        assert!(qb
            .sql()
            .ends_with(" ORDER BY t.is_done ASC, t.created_at DESC, t.id ASC"));
    }

    #[test]
    fn test_filter_and_limit_are_bound() {
        let query = TaskListQuery::from_params(&params(&[
            ("filter[is_done]", "true"),
            ("page", "2"),
        ]))
        .unwrap();
        let mut qb = QueryBuilder::new("SELECT 1 FROM tasks t WHERE TRUE");
        query.filters.push_conditions(&mut qb);
        query.page.push_limit(&mut qb);

        assert_eq!(
            qb.sql(),
            "SELECT 1 FROM tasks t WHERE TRUE AND t.is_done = ANY($1) LIMIT $2 OFFSET $3"
        );
    }

    #[test]
    fn test_link_pairs_omit_defaults() {
        assert!(TaskListQuery::default().link_pairs().is_empty());
    }

    #[test]
    fn test_link_pairs_reproduce_the_query() {
        let query = TaskListQuery::from_params(&params(&[
            ("filter[is_done]", "1,false"),
            ("sort", "-title, is_done"),
            ("page", "1"),
            ("page_size", "2"),
        ]))
        .unwrap();

        let mut reparsed: HashMap<String, String> = query
            .link_pairs()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        reparsed.insert("page".into(), "2".into());
        let next = TaskListQuery::from_params(&reparsed).unwrap();

        assert_eq!(next.filters, query.filters);
        assert_eq!(next.sort, query.sort);
        assert_eq!(next.page, Page { number: 2, size: 2 });
    }
}
