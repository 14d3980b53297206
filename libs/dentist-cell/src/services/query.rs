use shared_database::query::{FilterOp, PostgrestQuery, SortDirection};
use shared_models::response::{PageRef, Pagination};

use crate::models::DentistError;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 25;
const DEFAULT_SORT: &str = "created_at";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

/// Parsed `GET /dentists` query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DentistListParams {
    pub filters: Vec<FieldFilter>,
    pub select: Option<Vec<String>>,
    pub sort: Vec<(String, SortDirection)>,
    pub page: u64,
    pub limit: u64,
}

impl Default for DentistListParams {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            select: None,
            sort: Vec::new(),
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn field_name(name: &str) -> Result<String, DentistError> {
    let name = name.trim();
    if is_identifier(name) {
        Ok(name.to_string())
    } else {
        Err(DentistError::InvalidQuery(format!("invalid field name {:?}", name)))
    }
}

/// `rating[gte]` -> (`rating`, Gte); bare `name` -> (`name`, Eq).
fn parse_filter_key(key: &str) -> Result<(String, FilterOp), DentistError> {
    match key.split_once('[') {
        None => Ok((field_name(key)?, FilterOp::Eq)),
        Some((field, rest)) => {
            let token = rest
                .strip_suffix(']')
                .ok_or_else(|| DentistError::InvalidQuery(format!("unterminated operator in {:?}", key)))?;
            let op = match FilterOp::from_token(token) {
                Some(FilterOp::Eq) | None => {
                    return Err(DentistError::InvalidQuery(format!("unsupported operator {:?}", token)))
                }
                Some(op) => op,
            };
            Ok((field_name(field)?, op))
        }
    }
}

fn parse_positive(raw: &str, default: u64) -> u64 {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => default,
        Ok(n) => n,
    }
}

fn parse_list(raw: &str) -> Result<Vec<String>, DentistError> {
    raw.split(',')
        .filter(|item| !item.trim().is_empty())
        .map(field_name)
        .collect()
}

fn parse_sort(raw: &str) -> Result<Vec<(String, SortDirection)>, DentistError> {
    raw.split(',')
        .filter(|item| !item.trim().is_empty())
        .map(|item| {
            let item = item.trim();
            match item.strip_prefix('-') {
                Some(field) => Ok((field_name(field)?, SortDirection::Desc)),
                None => Ok((field_name(item)?, SortDirection::Asc)),
            }
        })
        .collect()
}

impl DentistListParams {
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, DentistError> {
        let mut params = Self::default();

        // select, sort, page and limit shape the result set; everything else filters rows
        for (key, value) in pairs {
            match key.as_str() {
                "select" => params.select = Some(parse_list(value)?),
                "sort" => params.sort = parse_sort(value)?,
                "page" => params.page = parse_positive(value, DEFAULT_PAGE),
                "limit" => params.limit = parse_positive(value, DEFAULT_LIMIT),
                _ => {
                    let (field, op) = parse_filter_key(key)?;
                    params.filters.push(FieldFilter {
                        field,
                        op,
                        value: value.clone(),
                    });
                }
            }
        }

        Ok(params)
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    pub fn to_query(&self) -> PostgrestQuery {
        let mut query = PostgrestQuery::new();

        for filter in &self.filters {
            query = query.filter(&filter.field, filter.op, &filter.value);
        }

        if let Some(columns) = self.select.as_ref().filter(|c| !c.is_empty()) {
            query = query.select(&columns.join(","));
        }

        query = if self.sort.is_empty() {
            query.order(&[(DEFAULT_SORT.to_string(), SortDirection::Desc)])
        } else {
            query.order(&self.sort)
        };

        query.limit(self.limit).offset(self.offset())
    }

    pub fn pagination(&self, total: u64) -> Pagination {
        let end = self.page.saturating_mul(self.limit);
        Pagination {
            next: (end < total).then(|| PageRef {
                page: self.page.saturating_add(1),
                limit: self.limit,
            }),
            prev: (self.page > 1).then(|| PageRef {
                page: self.page - 1,
                limit: self.limit,
            }),
        }
    }
}
