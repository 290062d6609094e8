mod bind_values;
mod fetch_result;
mod ordered_map;
mod row;
mod sql_value;

pub use bind_values::BindValues;
pub use fetch_result::{FetchResult, FetchShape};
pub use ordered_map::OrderedMap;
pub use row::{RawQueryResult, Row};
pub use sql_value::{FromSqlValue, SqlValue};
