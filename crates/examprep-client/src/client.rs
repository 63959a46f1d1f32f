//! ExamPrep HTTP client implementation.

use reqwest::Client;
use std::time::Duration;

use examprep_core::{JobId, PaperId, UserId};

use crate::error::ClientError;
use crate::types::{
    ApiErrorResponse, BalanceResponse, DeductRequest, DeductionResponse, Envelope,
    GeneratePaperRequest, GenerationTicket, JobStatus, TransactionPage,
};

/// ExamPrep API client.
///
/// Service calls authenticate with the API key; student calls take the
/// student's access token.
#[derive(Debug, Clone)]
pub struct ExamPrepClient {
    client: Client,
    base_url: String,
    api_key: String,
    service_name: String,
}

impl ExamPrepClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the examprep service (e.g., `"http://examprep:8080"`)
    /// * `api_key` - Service API key for authentication
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ClientError> {
        Self::with_options(base_url, api_key, ClientOptions::default())
    }

    /// Create a new client with custom options.
    pub fn with_options(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            service_name: options.service_name,
        })
    }

    /// Deduct one credit from a user.
    ///
    /// Passing `related_paper_id` makes the charge idempotent per paper: a
    /// second call for the same paper fails with [`ClientError::DuplicateEvent`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InsufficientCredits`] when the balance is zero,
    /// or another error if the request fails.
    pub async fn deduct_credit(
        &self,
        user_id: UserId,
        related_paper_id: Option<PaperId>,
        notes: Option<&str>,
    ) -> Result<DeductionResponse, ClientError> {
        let url = format!("{}/v1/credits/deduct", self.base_url);
        let request = DeductRequest {
            user_id,
            related_paper_id,
            notes: notes.map(str::to_string),
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("x-service-name", &self.service_name)
            .json(&request)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get a user's current balance (requires the user's access token).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn get_balance(&self, user_jwt: &str) -> Result<BalanceResponse, ClientError> {
        let url = format!("{}/v1/credits/balance", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("authorization", format!("Bearer {user_jwt}"))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get a page of a user's transaction history, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn get_transactions(
        &self,
        user_jwt: &str,
        page: u32,
        limit: u32,
    ) -> Result<TransactionPage, ClientError> {
        let url = format!("{}/v1/credits/transactions", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("authorization", format!("Bearer {user_jwt}"))
            .query(&[("page", page), ("limit", limit)])
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Pay for a paper and queue its generation.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InsufficientCredits`] when the balance is zero,
    /// or another error if the request fails.
    pub async fn generate_paper(
        &self,
        user_jwt: &str,
        topic: &str,
    ) -> Result<GenerationTicket, ClientError> {
        let url = format!("{}/v1/papers", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("authorization", format!("Bearer {user_jwt}"))
            .json(&GeneratePaperRequest { topic })
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Poll a generation job.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn get_job(&self, user_jwt: &str, job_id: JobId) -> Result<JobStatus, ClientError> {
        let url = format!("{}/v1/papers/jobs/{job_id}", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("authorization", format!("Bearer {user_jwt}"))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Unwrap the success envelope or convert the error body.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            let envelope: Envelope<T> = response.json().await?;
            return Ok(envelope.data);
        }

        // Try to parse error response
        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        match error_body {
            Ok(api_error) => {
                let code = api_error.error.code.as_str();
                let message = api_error.error.message;
                let detail = |key: &str| {
                    api_error
                        .error
                        .details
                        .as_ref()
                        .and_then(|d| d.get(key))
                        .and_then(serde_json::Value::as_i64)
                        .unwrap_or(0)
                };

                tracing::debug!(code, status = status.as_u16(), "examprep API error");

                // Map specific error codes to typed errors
                match code {
                    "INSUFFICIENT_CREDITS" => Err(ClientError::InsufficientCredits {
                        balance: detail("balance"),
                        required: detail("required"),
                    }),
                    "DUPLICATE_EVENT" => Err(ClientError::DuplicateEvent { message }),
                    "NOT_FOUND" => Err(ClientError::NotFound { message }),
                    "UNAUTHORIZED" => Err(ClientError::Unauthorized),
                    _ => Err(ClientError::Api {
                        code: code.to_string(),
                        message,
                        status: status.as_u16(),
                    }),
                }
            }
            Err(_) => Err(ClientError::Api {
                code: "UNKNOWN".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            }),
        }
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
    /// Service name to include in requests.
    pub service_name: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            service_name: "unknown".to_string(),
        }
    }
}

impl ClientOptions {
    /// Create options with a service name.
    #[must_use]
    pub fn with_service_name(name: impl Into<String>) -> Self {
        Self {
            service_name: name.into(),
            ..Self::default()
        }
    }
}
