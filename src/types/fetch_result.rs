use serde::Deserialize;

use crate::types::{OrderedMap, Row, SqlValue};

/// Accumulation strategy applied to a result cursor by the generic `fetch`.
///
/// Object shapes need a target type and are only reachable through
/// `fetch_object` and `fetch_objects`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchShape {
    #[default]
    All,
    Assoc,
    Col,
    Pairs,
    One,
    Value,
}

/// A shaped result set.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    All(Vec<Row>),
    Assoc(OrderedMap<SqlValue, Row>),
    Col(Vec<SqlValue>),
    Pairs(OrderedMap<SqlValue, SqlValue>),
    One(Option<Row>),
    Value(Option<SqlValue>),
}

impl FetchResult {
    pub fn shape(&self) -> FetchShape {
        match self {
            FetchResult::All(_) => FetchShape::All,
            FetchResult::Assoc(_) => FetchShape::Assoc,
            FetchResult::Col(_) => FetchShape::Col,
            FetchResult::Pairs(_) => FetchShape::Pairs,
            FetchResult::One(_) => FetchShape::One,
            FetchResult::Value(_) => FetchShape::Value,
        }
    }

    pub fn into_rows(self) -> Option<Vec<Row>> {
        match self {
            FetchResult::All(rows) => Some(rows),
            _ => None,
        }
    }
}
