use crate::error::Result;
use crate::types::{Row, SqlValue};

/// A type that rows can be materialized into by `fetch_object` and
/// `fetch_objects`.
///
/// Materialization is two-phase and the order is part of the contract:
/// 1. `Self::default()` allocates a zero-value instance,
/// 2. `assign` is called once per column, in column order,
/// 3. `construct` runs with the caller's arguments.
///
/// `construct` therefore sees every column value already assigned, and any
/// field it overwrites loses the fetched value.
pub trait FetchObject: Default {
    /// Arguments handed to `construct`.
    type Args;

    /// Assign one column value to the identically-named field.
    /// Return `SqlFetchError::ShapeConstruction` for columns the type cannot hold.
    fn assign(&mut self, column: &str, value: SqlValue) -> Result<()>;

    /// Post-assignment initialization hook.
    fn construct(&mut self, _args: &Self::Args) -> Result<()> {
        Ok(())
    }
}

/// `Row` is the dynamic record: every column becomes a field.
impl FetchObject for Row {
    type Args = ();

    fn assign(&mut self, column: &str, value: SqlValue) -> Result<()> {
        self.set(column, value);
        Ok(())
    }
}
