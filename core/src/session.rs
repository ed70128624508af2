use crate::error::{MealError, Result};
use crate::models::MealRecord;

/// Who is making a request. Passed explicitly to whatever needs it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user_id: Option<String>,
}

impl Session {
    #[must_use]
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    /// A blank id is treated as anonymous.
    #[must_use]
    pub fn signed_in(user_id: &str) -> Self {
        let user_id = user_id.trim();
        Self {
            user_id: (!user_id.is_empty()).then(|| user_id.to_string()),
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// The signed-in user's id, or a validation error naming `action`.
    pub fn require_user(&self, action: &str) -> Result<&str> {
        self.user_id()
            .ok_or_else(|| MealError::validation(format!("Please sign in to {action}")))
    }

    /// Records without an owner (sample data) may be changed by any
    /// signed-in user. An anonymous session owns nothing.
    #[must_use]
    pub fn owns(&self, record: &MealRecord) -> bool {
        let Some(user) = self.user_id() else {
            return false;
        };
        record
            .owner_user_id
            .as_deref()
            .is_none_or(|owner| owner == user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, NewMeal};
    use chrono::Utc;

    fn owned_by(owner: Option<&str>) -> MealRecord {
        NewMeal {
            owner_user_id: owner.map(str::to_string),
            ..NewMeal::new("Pancakes", Category::Breakfast)
        }
        .into_record("id".into(), Utc::now())
    }

    #[test]
    fn test_anonymous_session() {
        let session = Session::anonymous();
        assert!(!session.is_authenticated());
        assert!(session.user_id().is_none());
        assert!(session.require_user("share a recipe").is_err());
        assert_eq!(Session::signed_in("  "), session);
    }

    #[test]
    fn test_signed_in_session() {
        let session = Session::signed_in(" alice ");
        assert!(session.is_authenticated());
        assert_eq!(session.require_user("share").unwrap(), "alice");
    }

    #[test]
    fn test_ownership() {
        let alice = Session::signed_in("alice");
        assert!(alice.owns(&owned_by(Some("alice"))));
        assert!(!alice.owns(&owned_by(Some("bob"))));
        assert!(alice.owns(&owned_by(None)));
        assert!(!Session::anonymous().owns(&owned_by(Some("alice"))));
        assert!(!Session::anonymous().owns(&owned_by(None)));
    }
}
