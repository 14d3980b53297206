use std::fmt;

/// Comparison operators understood by PostgREST horizontal filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl FilterOp {
    /// Parses the shorthand tokens accepted in `field[op]=value` parameters.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "eq" => Some(FilterOp::Eq),
            "gt" => Some(FilterOp::Gt),
            "gte" => Some(FilterOp::Gte),
            "lt" => Some(FilterOp::Lt),
            "lte" => Some(FilterOp::Lte),
            "in" => Some(FilterOp::In),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::In => "in",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Ordered set of PostgREST query pairs. Values are encoded by reqwest when
/// the request is built, never spliced into the URL by hand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostgrestQuery {
    pairs: Vec<(String, String)>,
}

impl PostgrestQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(self, field: &str, value: impl fmt::Display) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    pub fn filter(mut self, field: &str, op: FilterOp, value: impl fmt::Display) -> Self {
        let rendered = match op {
            FilterOp::In => {
                let items: Vec<String> = value
                    .to_string()
                    .split(',')
                    .map(|item| item.trim().to_string())
                    .filter(|item| !item.is_empty())
                    .collect();
                format!("in.({})", items.join(","))
            }
            _ => format!("{}.{}", op, value),
        };
        self.pairs.push((field.to_string(), rendered));
        self
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.pairs.push(("select".to_string(), columns.to_string()));
        self
    }

    pub fn order(mut self, keys: &[(String, SortDirection)]) -> Self {
        if keys.is_empty() {
            return self;
        }
        let rendered: Vec<String> = keys
            .iter()
            .map(|(field, direction)| match direction {
                SortDirection::Asc => format!("{}.asc", field),
                SortDirection::Desc => format!("{}.desc", field),
            })
            .collect();
        self.pairs.push(("order".to_string(), rendered.join(",")));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.pairs.push(("limit".to_string(), limit.to_string()));
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.pairs.push(("offset".to_string(), offset.to_string()));
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Value of the first pair with the given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Copy of this query keeping only row filters (no projection, ordering or paging).
    pub fn filters_only(&self) -> Self {
        const NON_FILTER_KEYS: [&str; 4] = ["select", "order", "limit", "offset"];
        Self {
            pairs: self
                .pairs
                .iter()
                .filter(|(k, _)| !NON_FILTER_KEYS.contains(&k.as_str()))
                .cloned()
                .collect(),
        }
    }
}
