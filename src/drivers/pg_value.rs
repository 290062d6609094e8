use std::error::Error;

use bytes::BytesMut;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use tokio_postgres::types::{to_sql_checked, FromSql, IsNull, Kind, ToSql, Type};
use uuid::Uuid;

use crate::types::SqlValue;

type BoxError = Box<dyn Error + Sync + Send>;

/// Carries a `SqlValue` across the tokio-postgres boundary.
///
/// As a parameter it is converted to whatever type PostgreSQL inferred for the
/// placeholder; NULL is sent untyped. As a column it decodes by column type;
/// types without a scalar `SqlValue` counterpart (numeric, temporal, uuid,
/// json, bytea, enums) come back as their text rendering. Anything else is a
/// decode error, never a NULL.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PgValue(pub(crate) SqlValue);

fn mismatch(value: &SqlValue, ty: &Type) -> BoxError {
    format!(
        "cannot bind {} value {} to parameter of type {}",
        value.type_name(),
        value,
        ty
    )
    .into()
}

fn integer(value: &SqlValue, ty: &Type) -> Result<i64, BoxError> {
    match value {
        SqlValue::Bool(b) => Ok(i64::from(*b)),
        SqlValue::Int32(i) => Ok(i64::from(*i)),
        SqlValue::Int64(i) => Ok(*i),
        SqlValue::Float64(f) if f.is_finite() && f.fract() == 0.0 => Ok(*f as i64),
        SqlValue::Text(s) => s.trim().parse().map_err(|_| mismatch(value, ty)),
        _ => Err(mismatch(value, ty)),
    }
}

fn narrow<T: TryFrom<i64>>(value: &SqlValue, ty: &Type) -> Result<T, BoxError> {
    T::try_from(integer(value, ty)?).map_err(|_| mismatch(value, ty))
}

fn float(value: &SqlValue, ty: &Type) -> Result<f64, BoxError> {
    match value {
        SqlValue::Int32(i) => Ok(f64::from(*i)),
        SqlValue::Int64(i) => Ok(*i as f64),
        SqlValue::Float64(f) => Ok(*f),
        SqlValue::Text(s) => s.trim().parse().map_err(|_| mismatch(value, ty)),
        _ => Err(mismatch(value, ty)),
    }
}

fn boolean(value: &SqlValue, ty: &Type) -> Result<bool, BoxError> {
    match value {
        SqlValue::Bool(b) => Ok(*b),
        SqlValue::Int32(i) => Ok(*i != 0),
        SqlValue::Int64(i) => Ok(*i != 0),
        SqlValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "t" | "true" | "yes" | "on" => Ok(true),
            "0" | "f" | "false" | "no" | "off" => Ok(false),
            _ => Err(mismatch(value, ty)),
        },
        _ => Err(mismatch(value, ty)),
    }
}

fn decimal(value: &SqlValue, ty: &Type) -> Result<Decimal, BoxError> {
    match value {
        SqlValue::Int32(i) => Ok(Decimal::from(*i)),
        SqlValue::Int64(i) => Ok(Decimal::from(*i)),
        SqlValue::Float64(f) => Decimal::try_from(*f).map_err(|_| mismatch(value, ty)),
        SqlValue::Text(s) => s.trim().parse().map_err(|_| mismatch(value, ty)),
        _ => Err(mismatch(value, ty)),
    }
}

fn text<'v>(value: &'v SqlValue, ty: &Type) -> Result<&'v str, BoxError> {
    value.as_str().map(str::trim).ok_or_else(|| mismatch(value, ty))
}

fn timestamp(value: &SqlValue, ty: &Type) -> Result<NaiveDateTime, BoxError> {
    let s = text(value, ty)?;
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .map_err(|_| mismatch(value, ty))
}

fn json(value: &SqlValue, ty: &Type) -> Result<serde_json::Value, BoxError> {
    match value {
        SqlValue::Bool(b) => Ok(serde_json::Value::from(*b)),
        SqlValue::Int32(i) => Ok(serde_json::Value::from(*i)),
        SqlValue::Int64(i) => Ok(serde_json::Value::from(*i)),
        SqlValue::Float64(f) => Ok(serde_json::Value::from(*f)),
        SqlValue::Text(s) => serde_json::from_str(s).map_err(|_| mismatch(value, ty)),
        _ => Err(mismatch(value, ty)),
    }
}

fn is_textual(ty: &Type) -> bool {
    <String as ToSql>::accepts(ty) || matches!(ty.kind(), Kind::Enum(_))
}

impl ToSql for PgValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError>
    where
        Self: Sized,
    {
        let value = &self.0;
        if value.is_null() {
            return Ok(IsNull::Yes);
        }
        match *ty {
            Type::BOOL => boolean(value, ty)?.to_sql(ty, out),
            Type::CHAR => narrow::<i8>(value, ty)?.to_sql(ty, out),
            Type::INT2 => narrow::<i16>(value, ty)?.to_sql(ty, out),
            Type::INT4 => narrow::<i32>(value, ty)?.to_sql(ty, out),
            Type::INT8 => integer(value, ty)?.to_sql(ty, out),
            Type::OID => narrow::<u32>(value, ty)?.to_sql(ty, out),
            Type::FLOAT4 => (float(value, ty)? as f32).to_sql(ty, out),
            Type::FLOAT8 => float(value, ty)?.to_sql(ty, out),
            Type::NUMERIC => decimal(value, ty)?.to_sql(ty, out),
            Type::DATE => text(value, ty)?
                .parse::<NaiveDate>()
                .map_err(|_| mismatch(value, ty))?
                .to_sql(ty, out),
            Type::TIME => text(value, ty)?
                .parse::<NaiveTime>()
                .map_err(|_| mismatch(value, ty))?
                .to_sql(ty, out),
            Type::TIMESTAMP => timestamp(value, ty)?.to_sql(ty, out),
            Type::TIMESTAMPTZ => text(value, ty)?
                .parse::<DateTime<FixedOffset>>()
                .map_err(|_| mismatch(value, ty))?
                .to_sql(ty, out),
            Type::UUID => Uuid::parse_str(text(value, ty)?)
                .map_err(|_| mismatch(value, ty))?
                .to_sql(ty, out),
            Type::JSON | Type::JSONB => json(value, ty)?.to_sql(ty, out),
            _ if is_textual(ty) => match value {
                SqlValue::List(_) => Err(mismatch(value, ty)),
                other => other.to_string().to_sql(ty, out),
            },
            _ => Err(mismatch(value, ty)),
        }
    }

    fn accepts(_ty: &Type) -> bool
    where
        Self: Sized,
    {
        true
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for PgValue {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let value = match *ty {
            Type::BOOL => SqlValue::Bool(bool::from_sql(ty, raw)?),
            Type::CHAR => SqlValue::Int32(i32::from(i8::from_sql(ty, raw)?)),
            Type::INT2 => SqlValue::Int32(i32::from(i16::from_sql(ty, raw)?)),
            Type::INT4 => SqlValue::Int32(i32::from_sql(ty, raw)?),
            Type::INT8 => SqlValue::Int64(i64::from_sql(ty, raw)?),
            Type::OID => SqlValue::Int64(i64::from(u32::from_sql(ty, raw)?)),
            Type::FLOAT4 => SqlValue::Float64(f64::from(f32::from_sql(ty, raw)?)),
            Type::FLOAT8 => SqlValue::Float64(f64::from_sql(ty, raw)?),
            Type::NUMERIC => SqlValue::Text(Decimal::from_sql(ty, raw)?.to_string()),
            Type::DATE => SqlValue::Text(NaiveDate::from_sql(ty, raw)?.to_string()),
            Type::TIME => SqlValue::Text(NaiveTime::from_sql(ty, raw)?.to_string()),
            Type::TIMESTAMP => SqlValue::Text(NaiveDateTime::from_sql(ty, raw)?.to_string()),
            Type::TIMESTAMPTZ => SqlValue::Text(DateTime::<Utc>::from_sql(ty, raw)?.to_rfc3339()),
            Type::UUID => SqlValue::Text(Uuid::from_sql(ty, raw)?.to_string()),
            Type::JSON | Type::JSONB => {
                SqlValue::Text(serde_json::Value::from_sql(ty, raw)?.to_string())
            }
            Type::BYTEA => {
                let bytes = <Vec<u8>>::from_sql(ty, raw)?;
                let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
                SqlValue::Text(format!("\\x{}", hex))
            }
            _ if <String as FromSql>::accepts(ty) => SqlValue::Text(String::from_sql(ty, raw)?),
            _ if matches!(ty.kind(), Kind::Enum(_)) => {
                SqlValue::Text(std::str::from_utf8(raw)?.to_string())
            }
            _ => return Err(format!("cannot decode column of type {}", ty).into()),
        };
        Ok(PgValue(value))
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, BoxError> {
        Ok(PgValue(SqlValue::Null))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}
