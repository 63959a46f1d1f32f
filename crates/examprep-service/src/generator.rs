//! Question generators used by the paper worker.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use examprep_core::PaperQuestion;

/// Generation failures. Every variant is retried by the worker.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// The request never got a response.
    #[error("generator request failed: {0}")]
    Request(String),

    /// The generator answered with an error status.
    #[error("generator returned status {0}")]
    Status(u16),

    /// The response could not be used.
    #[error("invalid generator response: {0}")]
    InvalidResponse(String),
}

/// Produces the questions for a paper.
#[async_trait]
pub trait PaperGenerator: Send + Sync {
    /// Generate questions about `topic`.
    async fn generate(&self, topic: &str) -> Result<Vec<PaperQuestion>, GeneratorError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    topic: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    questions: Vec<PaperQuestion>,
}

/// Calls an external generation endpoint with `POST { "topic": ... }`.
#[derive(Debug, Clone)]
pub struct HttpPaperGenerator {
    client: reqwest::Client,
    url: String,
}

impl HttpPaperGenerator {
    /// Create a generator posting to `url`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl PaperGenerator for HttpPaperGenerator {
    async fn generate(&self, topic: &str) -> Result<Vec<PaperQuestion>, GeneratorError> {
        let response = self
            .client
            .post(&self.url)
            .json(&GenerateRequest { topic })
            .send()
            .await
            .map_err(|e| GeneratorError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeneratorError::Status(status.as_u16()));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::InvalidResponse(e.to_string()))?;

        if body.questions.is_empty() {
            return Err(GeneratorError::InvalidResponse("no questions".into()));
        }
        Ok(body.questions)
    }
}

/// Returns one fixed question. Used when no generator URL is configured.
#[derive(Debug, Default)]
pub struct SampleGenerator;

#[async_trait]
impl PaperGenerator for SampleGenerator {
    async fn generate(&self, topic: &str) -> Result<Vec<PaperQuestion>, GeneratorError> {
        Ok(vec![PaperQuestion {
            question_text: format!("Sample question about {topic}"),
            options: vec![
                "Option A".into(),
                "Option B".into(),
                "Option C".into(),
                "Option D".into(),
            ],
            correct_answer: "Option A".into(),
        }])
    }
}
