//! Default-credit configuration: how many credits a new student starts with.

use std::sync::Arc;

use serde::Deserialize;

use examprep_core::{
    ConfigId, DefaultCreditConfig, DefaultCreditConfigPatch, UserId,
    FALLBACK_CREDITS_PER_NEW_STUDENT,
};
use examprep_store::{Store, StoreError};

use crate::error::ApiError;
use crate::pagination::MAX_LIMIT;

/// Default number of history rows.
pub const DEFAULT_HISTORY_LIMIT: u32 = 10;

/// Input for creating a configuration row.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCreditConfig {
    /// Credits granted to each new student.
    pub credits_per_new_student: i64,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the row becomes the active one (default true).
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Partial update of a configuration row.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCreditConfig {
    /// New credit value.
    #[serde(default)]
    pub credits_per_new_student: Option<i64>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// Activate or deactivate.
    #[serde(default)]
    pub is_active: Option<bool>,
}

fn validate_credits(credits: i64) -> Result<(), ApiError> {
    if credits < 0 {
        return Err(ApiError::InvalidAmount(
            "Credits must be a non-negative integer".into(),
        ));
    }
    Ok(())
}

fn config_not_found(id: ConfigId) -> ApiError {
    ApiError::CreditConfigNotFound(format!("Credit configuration {id} not found"))
}

fn config_error(id: ConfigId) -> impl FnOnce(StoreError) -> ApiError {
    move |err| match err {
        StoreError::NotFound { .. } => config_not_found(id),
        other => other.into(),
    }
}

/// Reads and writes the default-credit configuration.
pub struct DefaultCreditService {
    store: Arc<dyn Store>,
}

impl DefaultCreditService {
    /// Create the service.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Credits for a new student: the active row's value, or 10 when no row is active.
    pub async fn get_default_credits(&self) -> Result<i64, ApiError> {
        Ok(self
            .store
            .get_active_default_credit_config()
            .await?
            .map_or(FALLBACK_CREDITS_PER_NEW_STUDENT, |c| c.credits_per_new_student))
    }

    /// Make `credits` the new default, replacing the active row.
    pub async fn update_default_credits(
        &self,
        credits: i64,
        updated_by: Option<UserId>,
    ) -> Result<DefaultCreditConfig, ApiError> {
        validate_credits(credits)?;
        let config = DefaultCreditConfig::new(
            credits,
            Some(format!("Updated to {credits} credits per new student")),
            true,
            updated_by,
        )
        .map_err(StoreError::from)?;

        self.store.activate_default_credit_config(&config).await?;
        tracing::info!(
            config_id = %config.id,
            credits_per_new_student = credits,
            updated_by = ?updated_by,
            "Default credits updated"
        );
        Ok(config)
    }

    /// Most recent configuration rows, newest first.
    pub async fn get_config_history(
        &self,
        limit: Option<i64>,
    ) -> Result<Vec<DefaultCreditConfig>, ApiError> {
        let limit = limit.unwrap_or(i64::from(DEFAULT_HISTORY_LIMIT));
        let limit = usize::try_from(limit)
            .ok()
            .filter(|l| (1..=MAX_LIMIT as usize).contains(l))
            .ok_or(ApiError::InvalidLimit { max: MAX_LIMIT })?;
        Ok(self.store.list_default_credit_configs(limit).await?)
    }

    /// Create a row. It becomes active unless `is_active` is `false`.
    pub async fn create(
        &self,
        input: CreateCreditConfig,
        created_by: Option<UserId>,
    ) -> Result<DefaultCreditConfig, ApiError> {
        validate_credits(input.credits_per_new_student)?;
        let is_active = input.is_active.unwrap_or(true);
        let config = DefaultCreditConfig::new(
            input.credits_per_new_student,
            input.description,
            is_active,
            created_by,
        )
        .map_err(StoreError::from)?;

        if is_active {
            self.store.activate_default_credit_config(&config).await?;
        } else {
            self.store.insert_default_credit_config(&config).await?;
        }
        tracing::info!(config_id = %config.id, is_active, "Credit configuration created");
        Ok(config)
    }

    /// All rows, newest first.
    pub async fn get_all(&self) -> Result<Vec<DefaultCreditConfig>, ApiError> {
        Ok(self.store.list_default_credit_configs(usize::MAX).await?)
    }

    /// One row.
    pub async fn get_by_id(&self, id: ConfigId) -> Result<DefaultCreditConfig, ApiError> {
        self.store
            .get_default_credit_config(&id)
            .await?
            .ok_or_else(|| config_not_found(id))
    }

    /// The active row, if any.
    pub async fn get_active(&self) -> Result<Option<DefaultCreditConfig>, ApiError> {
        Ok(self.store.get_active_default_credit_config().await?)
    }

    /// Apply a partial update. Activating a row deactivates the others.
    pub async fn update(
        &self,
        id: ConfigId,
        input: UpdateCreditConfig,
        updated_by: Option<UserId>,
    ) -> Result<DefaultCreditConfig, ApiError> {
        if let Some(credits) = input.credits_per_new_student {
            validate_credits(credits)?;
        }
        let patch = DefaultCreditConfigPatch {
            credits_per_new_student: input.credits_per_new_student,
            description: input.description,
            is_active: input.is_active,
            updated_by,
        };
        let config = self
            .store
            .update_default_credit_config(&id, &patch)
            .await
            .map_err(config_error(id))?;
        tracing::info!(config_id = %id, "Credit configuration updated");
        Ok(config)
    }

    /// Delete a row.
    pub async fn delete(&self, id: ConfigId) -> Result<(), ApiError> {
        self.store
            .delete_default_credit_config(&id)
            .await
            .map_err(config_error(id))?;
        tracing::info!(config_id = %id, "Credit configuration deleted");
        Ok(())
    }
}
