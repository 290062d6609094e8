use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer};

use crate::error::DriverError;
use crate::types::{FetchShape, SqlValue};

/// Target representation forced onto a named parameter at bind time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindType {
    Bool,
    Int,
    Float,
    Text,
}

impl BindType {
    /// Coerces a value to this type. Null passes through unchanged and lists
    /// are coerced element by element.
    pub fn coerce(self, value: SqlValue) -> Result<SqlValue, DriverError> {
        let coerced = match (self, value) {
            (_, SqlValue::Null) => SqlValue::Null,
            (_, SqlValue::List(items)) => SqlValue::List(
                items
                    .into_iter()
                    .map(|item| self.coerce(item))
                    .collect::<Result<_, _>>()?,
            ),

            (BindType::Bool, SqlValue::Bool(b)) => SqlValue::Bool(b),
            (BindType::Bool, SqlValue::Int32(i)) => SqlValue::Bool(i != 0),
            (BindType::Bool, SqlValue::Int64(i)) => SqlValue::Bool(i != 0),
            (BindType::Bool, SqlValue::Float64(f)) => SqlValue::Bool(f != 0.0),
            (BindType::Bool, SqlValue::Text(s)) => match s.to_ascii_lowercase().as_str() {
                "1" | "t" | "true" | "yes" | "on" => SqlValue::Bool(true),
                "" | "0" | "f" | "false" | "no" | "off" => SqlValue::Bool(false),
                _ => return Err(cannot_coerce(&s, "bool")),
            },

            (BindType::Int, SqlValue::Bool(b)) => SqlValue::Int64(i64::from(b)),
            (BindType::Int, SqlValue::Int32(i)) => SqlValue::Int64(i64::from(i)),
            (BindType::Int, SqlValue::Int64(i)) => SqlValue::Int64(i),
            (BindType::Int, SqlValue::Float64(f)) => SqlValue::Int64(f.trunc() as i64),
            (BindType::Int, SqlValue::Text(s)) => match s.trim().parse::<i64>() {
                Ok(i) => SqlValue::Int64(i),
                Err(_) => return Err(cannot_coerce(&s, "int")),
            },

            (BindType::Float, SqlValue::Bool(b)) => SqlValue::Float64(if b { 1.0 } else { 0.0 }),
            (BindType::Float, SqlValue::Int32(i)) => SqlValue::Float64(f64::from(i)),
            (BindType::Float, SqlValue::Int64(i)) => SqlValue::Float64(i as f64),
            (BindType::Float, SqlValue::Float64(f)) => SqlValue::Float64(f),
            (BindType::Float, SqlValue::Text(s)) => match s.trim().parse::<f64>() {
                Ok(f) => SqlValue::Float64(f),
                Err(_) => return Err(cannot_coerce(&s, "float")),
            },

            (BindType::Text, SqlValue::Text(s)) => SqlValue::Text(s),
            (BindType::Text, other) => SqlValue::Text(other.to_string()),
        };
        Ok(coerced)
    }
}

fn cannot_coerce(value: &str, target: &str) -> DriverError {
    DriverError::new(format!("cannot coerce {:?} to {}", value, target))
}

fn parameter_name(name: &str) -> &str {
    name.strip_prefix(':').unwrap_or(name)
}

/// Accepts `bind_types` keys written with or without the leading colon.
fn deserialize_bind_types<'de, D>(deserializer: D) -> Result<HashMap<String, BindType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = HashMap::<String, BindType>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(name, bind_type)| (parameter_name(&name).to_string(), bind_type))
        .collect())
}

/// Everything needed to open and use a connection.
///
/// Can be built in code or deserialized from any serde format:
/// ```
/// use sqlfetch::{BindType, ConnectionConfig};
///
/// let config = ConnectionConfig::new("pgsql:host=localhost;dbname=app")
///     .attribute("application_name", "reporting")
///     .bind_type("limit", BindType::Int);
/// assert_eq!(config.driver_name(), "pgsql");
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConnectionConfig {
    pub dsn: String,
    /// Post-connect attributes, applied in key order.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Per-parameter coercions applied at bind time.
    #[serde(default, deserialize_with = "deserialize_bind_types")]
    pub bind_types: HashMap<String, BindType>,
    /// Shape produced by the generic `fetch`.
    #[serde(default)]
    pub default_shape: FetchShape,
}

impl ConnectionConfig {
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            attributes: BTreeMap::new(),
            bind_types: HashMap::new(),
            default_shape: FetchShape::default(),
        }
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn bind_type(mut self, name: impl AsRef<str>, bind_type: BindType) -> Self {
        self.bind_types
            .insert(parameter_name(name.as_ref()).to_string(), bind_type);
        self
    }

    pub fn default_shape(mut self, shape: FetchShape) -> Self {
        self.default_shape = shape;
        self
    }

    /// The driver identifier: the DSN token before the first colon.
    /// Empty when the DSN has no colon.
    pub fn driver_name(&self) -> &str {
        self.dsn.split_once(':').map(|(driver, _)| driver).unwrap_or("")
    }
}
