use thiserror::Error;

#[derive(Error, Debug)]
pub enum MealError {
    #[error("Meal not found: {0}")]
    NotFound(String),

    #[error("Invalid meal: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MealError {
    /// True for every failure of the underlying medium, as opposed to a
    /// missing id or bad input.
    #[must_use]
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Sqlite(_) | Self::Csv(_) | Self::Io(_) | Self::Json(_)
        )
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

pub type Result<T> = std::result::Result<T, MealError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_grouping() {
        assert!(MealError::storage("locked").is_storage());
        assert!(MealError::Io(std::io::Error::other("disk")).is_storage());
        assert!(!MealError::NotFound("x".into()).is_storage());
        assert!(!MealError::validation("bad").is_storage());
    }

    #[test]
    fn test_display_names_the_id() {
        let err = MealError::NotFound("abc-123".into());
        assert_eq!(err.to_string(), "Meal not found: abc-123");
        assert!(err.is_not_found());
    }
}
