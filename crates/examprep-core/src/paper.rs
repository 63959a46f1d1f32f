//! Generated papers and their generation jobs.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{JobId, PaperId, UserId};

/// Lifecycle of a paper and of the job producing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    /// Paid for and queued, or being generated.
    Pending,
    /// Questions are available.
    Done,
    /// Generation gave up; the credit was refunded.
    Failed,
}

impl GenerationStatus {
    /// Database / wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Whether the status can no longer change.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "done" => Ok(Self::Done),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown generation status: {other}")),
        }
    }
}

/// A multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperQuestion {
    /// Question text.
    pub question_text: String,
    /// Answer options.
    pub options: Vec<String>,
    /// The correct option.
    pub correct_answer: String,
}

/// A question paper a student paid one credit for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    /// Paper ID; also keys the deduction and any refund.
    pub id: PaperId,
    /// Owner.
    pub user_id: UserId,
    /// Requested topic.
    pub topic: String,
    /// Generation status.
    pub status: GenerationStatus,
    /// Generated questions. Empty until `status` is `Done`.
    pub questions: Vec<PaperQuestion>,
    /// When the paper was requested.
    pub created_at: DateTime<Utc>,
    /// When the paper last changed.
    pub updated_at: DateTime<Utc>,
}

impl Paper {
    /// A pending paper with no questions.
    #[must_use]
    pub fn pending(id: PaperId, user_id: UserId, topic: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            topic,
            status: GenerationStatus::Pending,
            questions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A queued unit of generation work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationJob {
    /// Job ID.
    pub id: JobId,
    /// Paper being generated.
    pub paper_id: PaperId,
    /// Owner.
    pub user_id: UserId,
    /// Topic to generate for.
    pub topic: String,
    /// Job status.
    pub status: GenerationStatus,
    /// Failed attempts so far.
    pub attempts: u32,
    /// Last failure message.
    pub error: Option<String>,
    /// When the job was queued.
    pub created_at: DateTime<Utc>,
    /// When the job last changed.
    pub updated_at: DateTime<Utc>,
}

impl GenerationJob {
    /// A pending job for `paper`.
    #[must_use]
    pub fn pending(id: JobId, paper: &Paper) -> Self {
        let now = Utc::now();
        Self {
            id,
            paper_id: paper.id,
            user_id: paper.user_id,
            topic: paper.topic.clone(),
            status: GenerationStatus::Pending,
            attempts: 0,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}
