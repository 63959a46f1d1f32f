//! Default credit configuration.
//!
//! Administrators decide how many welcome credits a new student receives.
//! Each change is kept as a row so that the history can be audited; at most
//! one row is active at a time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CreditError, Result};
use crate::{ConfigId, UserId};

/// Credits granted to a new student when no configuration is active.
pub const FALLBACK_CREDITS_PER_NEW_STUDENT: i64 = 10;

/// A default-credit configuration row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultCreditConfig {
    /// Row ID.
    pub id: ConfigId,
    /// Welcome credits granted to each new student.
    pub credits_per_new_student: i64,
    /// Human-readable description of the change.
    pub description: Option<String>,
    /// Whether this is the configuration in force.
    pub is_active: bool,
    /// Admin who made the change.
    pub updated_by: Option<UserId>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last modified.
    pub updated_at: DateTime<Utc>,
}

impl DefaultCreditConfig {
    /// Build a new row.
    ///
    /// # Errors
    ///
    /// Returns [`CreditError::InvalidConfig`] if `credits_per_new_student` is negative.
    pub fn new(
        credits_per_new_student: i64,
        description: Option<String>,
        is_active: bool,
        updated_by: Option<UserId>,
    ) -> Result<Self> {
        validate_credits(credits_per_new_student)?;
        let now = Utc::now();
        Ok(Self {
            id: ConfigId::generate(),
            credits_per_new_student,
            description,
            is_active,
            updated_by,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update in place.
    ///
    /// # Errors
    ///
    /// Returns [`CreditError::InvalidConfig`] if the patch sets a negative value.
    pub fn apply_patch(&mut self, patch: &DefaultCreditConfigPatch) -> Result<()> {
        if let Some(credits) = patch.credits_per_new_student {
            validate_credits(credits)?;
            self.credits_per_new_student = credits;
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        if patch.updated_by.is_some() {
            self.updated_by = patch.updated_by;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Partial update for a configuration row. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultCreditConfigPatch {
    /// New credit value.
    pub credits_per_new_student: Option<i64>,
    /// New description.
    pub description: Option<String>,
    /// Activate or deactivate the row.
    pub is_active: Option<bool>,
    /// Admin making the change.
    pub updated_by: Option<UserId>,
}

impl DefaultCreditConfigPatch {
    /// Whether applying this patch makes the row active.
    #[must_use]
    pub const fn activates(&self) -> bool {
        matches!(self.is_active, Some(true))
    }
}

fn validate_credits(credits: i64) -> Result<()> {
    if credits < 0 {
        return Err(CreditError::InvalidConfig(format!(
            "credits per new student must be non-negative, got {credits}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_credits_rejected() {
        assert!(matches!(
            DefaultCreditConfig::new(-1, None, true, None),
            Err(CreditError::InvalidConfig(_))
        ));
        assert!(DefaultCreditConfig::new(0, None, true, None).is_ok());
    }

    #[test]
    fn patch_updates_only_given_fields() {
        let mut config = DefaultCreditConfig::new(10, Some("start".into()), true, None).unwrap();
        let patch = DefaultCreditConfigPatch {
            credits_per_new_student: Some(25),
            ..DefaultCreditConfigPatch::default()
        };
        config.apply_patch(&patch).unwrap();

        assert_eq!(config.credits_per_new_student, 25);
        assert_eq!(config.description.as_deref(), Some("start"));
        assert!(config.is_active);
        assert!(!patch.activates());
    }

    #[test]
    fn invalid_patch_leaves_row_untouched() {
        let mut config = DefaultCreditConfig::new(10, None, false, None).unwrap();
        let patch = DefaultCreditConfigPatch {
            credits_per_new_student: Some(-5),
            is_active: Some(true),
            ..DefaultCreditConfigPatch::default()
        };
        assert!(config.apply_patch(&patch).is_err());
        assert_eq!(config.credits_per_new_student, 10);
        assert!(!config.is_active);
    }
}
