use std::fmt;
use std::str::FromStr;

use crate::error::{MealError, Result};
use crate::models::MealRecord;

/// Persistence primitives a storage medium provides.
///
/// Implementations keep records in insertion order and keep a record's
/// position when it is replaced. They assume a single writer: nothing here
/// locks or coordinates between processes.
pub trait MealStore {
    /// Every stored record, in storage order.
    fn load_all(&self) -> Result<Vec<MealRecord>>;

    fn find(&self, id: &str) -> Result<Option<MealRecord>>;

    /// Persist a new record. Fails if a record with the same id exists.
    fn insert(&mut self, record: &MealRecord) -> Result<()>;

    /// Overwrite the stored record with the same id. Returns false when
    /// there is no such record.
    fn replace(&mut self, record: &MealRecord) -> Result<bool>;

    /// Remove and return the record with this id, if any.
    fn remove(&mut self, id: &str) -> Result<Option<MealRecord>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite,
    Csv,
}

impl StoreKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreKind {
    type Err = MealError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "db" => Ok(Self::Sqlite),
            "csv" => Ok(Self::Csv),
            other => Err(MealError::validation(format!(
                "Unknown store '{other}'. Must be one of: sqlite, csv"
            ))),
        }
    }
}

pub(crate) fn duplicate_id(id: &str) -> MealError {
    MealError::storage(format!("A meal with id {id} already exists"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_kind_parse() {
        assert_eq!("sqlite".parse::<StoreKind>().unwrap(), StoreKind::Sqlite);
        assert_eq!("CSV".parse::<StoreKind>().unwrap(), StoreKind::Csv);
        assert_eq!(" db ".parse::<StoreKind>().unwrap(), StoreKind::Sqlite);
        assert!("parquet".parse::<StoreKind>().is_err());
    }
}
