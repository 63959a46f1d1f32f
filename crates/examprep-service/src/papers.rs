//! Paper generation: charge a credit, queue a job, generate, refund on failure.
//!
//! [`PaperService::generate_paper`] deducts one credit and creates the
//! pending paper and job in a single store operation, then hands the job to
//! the [`GenerationWorker`] over a bounded channel. The worker retries a
//! failing generator with exponential backoff; once `max_attempts` is used up
//! it refunds the credit (keyed by paper, so at most once) and marks the
//! paper failed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

use examprep_core::{
    GenerationJob, GenerationStatus, JobId, LedgerEntry, Paper, PaperId, UserId,
};
use examprep_store::{Store, StoreError};

use crate::config::WorkerSettings;
use crate::credits::CreditService;
use crate::error::ApiError;
use crate::generator::PaperGenerator;
use crate::pagination::{PageRequest, Pagination};

/// Papers per page in a student's paper list.
pub const PAPERS_PAGE_SIZE: u32 = 10;

/// Returned when a paper has been paid for and queued.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationTicket {
    /// Job to poll.
    pub job_id: JobId,
    /// Paper being generated.
    pub paper_id: PaperId,
    /// Balance after the deduction.
    pub new_balance: i64,
    /// Whether the deduction crossed the low-credit threshold.
    pub should_notify: bool,
}

/// A question as shown to the student, without the answer.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    /// Question text.
    pub question_text: String,
    /// Answer options.
    pub options: Vec<String>,
}

/// A paper as shown to its owner.
#[derive(Debug, Clone, Serialize)]
pub struct PaperView {
    /// Paper ID.
    pub id: PaperId,
    /// Topic.
    pub topic: String,
    /// Generation status.
    pub status: GenerationStatus,
    /// Questions, empty until generation finishes.
    pub questions: Vec<QuestionView>,
    /// Created.
    pub created_at: DateTime<Utc>,
    /// Last changed.
    pub updated_at: DateTime<Utc>,
}

impl From<Paper> for PaperView {
    fn from(paper: Paper) -> Self {
        Self {
            id: paper.id,
            topic: paper.topic,
            status: paper.status,
            questions: paper
                .questions
                .into_iter()
                .map(|q| QuestionView {
                    question_text: q.question_text,
                    options: q.options,
                })
                .collect(),
            created_at: paper.created_at,
            updated_at: paper.updated_at,
        }
    }
}

/// One row of a paper list.
#[derive(Debug, Clone, Serialize)]
pub struct PaperSummary {
    /// Paper ID.
    pub id: PaperId,
    /// Topic.
    pub topic: String,
    /// Generation status.
    pub status: GenerationStatus,
    /// Number of questions.
    pub question_count: usize,
    /// Created.
    pub created_at: DateTime<Utc>,
}

/// One page of a student's papers.
#[derive(Debug, Clone, Serialize)]
pub struct PaperPage {
    /// Papers, newest first.
    pub papers: Vec<PaperSummary>,
    /// Page metadata.
    pub pagination: Pagination,
}

/// Front half of the pipeline: payment, queueing and the read side.
pub struct PaperService {
    store: Arc<dyn Store>,
    credits: Arc<CreditService>,
    queue: mpsc::Sender<GenerationJob>,
}

impl PaperService {
    /// Create the service and the worker that drains its queue.
    ///
    /// The worker does nothing until [`GenerationWorker::run`] is spawned.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        credits: Arc<CreditService>,
        generator: Arc<dyn PaperGenerator>,
        settings: WorkerSettings,
    ) -> (Self, GenerationWorker) {
        let (queue, receiver) = mpsc::channel(settings.queue_capacity.max(1));
        let worker = GenerationWorker {
            store: Arc::clone(&store),
            generator,
            settings,
            receiver,
        };
        (
            Self {
                store,
                credits,
                queue,
            },
            worker,
        )
    }

    /// Charge one credit for a paper on `topic` and queue its generation.
    pub async fn generate_paper(
        &self,
        user_id: UserId,
        topic: &str,
    ) -> Result<GenerationTicket, ApiError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ApiError::BadRequest("Topic is required".into()));
        }

        let paper = Paper::pending(PaperId::generate(), user_id, topic.to_string());
        let job = GenerationJob::pending(JobId::generate(), &paper);
        let entry = LedgerEntry::paper_deduction(user_id, paper.id)
            .with_notes(format!("Paper generation: {topic}"));

        let receipt = self.store.begin_generation(&entry, &paper, &job).await?;
        let should_notify = self.credits.notify_if_low(&receipt).await;

        tracing::info!(
            user_id = %user_id,
            paper_id = %paper.id,
            job_id = %job.id,
            new_balance = receipt.new_balance,
            "Paper generation queued"
        );

        self.enqueue(job.clone()).await?;

        Ok(GenerationTicket {
            job_id: job.id,
            paper_id: paper.id,
            new_balance: receipt.new_balance,
            should_notify,
        })
    }

    /// Re-queue jobs left pending by a previous run.
    pub async fn resume_pending(&self) -> Result<usize, ApiError> {
        let jobs = self.store.list_pending_jobs().await?;
        let count = jobs.len();
        for job in jobs {
            self.enqueue(job).await?;
        }
        if count > 0 {
            tracing::info!(count, "Resumed pending generation jobs");
        }
        Ok(count)
    }

    async fn enqueue(&self, job: GenerationJob) -> Result<(), ApiError> {
        let job_id = job.id;
        if let Err(mpsc::error::SendError(job)) = self.queue.send(job).await {
            tracing::error!(job_id = %job_id, "Generation queue closed; refunding");
            let refund = refund_entry(&job);
            self.store
                .fail_generation(&job.id, "generation queue unavailable", &refund)
                .await?;
            return Err(ApiError::Internal("generation queue unavailable".into()));
        }
        Ok(())
    }

    /// A paper owned by `user_id`. Answers are not included.
    pub async fn get_paper(&self, user_id: UserId, paper_id: PaperId) -> Result<PaperView, ApiError> {
        self.store
            .get_paper(&paper_id)
            .await?
            .filter(|p| p.user_id == user_id)
            .map(PaperView::from)
            .ok_or_else(|| ApiError::NotFound(format!("Paper {paper_id} not found")))
    }

    /// A page of the user's papers, newest first, ten per page.
    pub async fn list_papers(&self, user_id: UserId, page: Option<i64>) -> Result<PaperPage, ApiError> {
        let request = PageRequest::new(page, None, PAPERS_PAGE_SIZE)?;
        let papers = self
            .store
            .list_papers(&user_id, request.limit(), request.offset())
            .await?;
        let total = self.store.count_papers(&user_id).await?;

        Ok(PaperPage {
            papers: papers
                .into_iter()
                .map(|p| PaperSummary {
                    id: p.id,
                    question_count: p.questions.len(),
                    topic: p.topic,
                    status: p.status,
                    created_at: p.created_at,
                })
                .collect(),
            pagination: request.paginate(total),
        })
    }

    /// A generation job owned by `user_id`.
    pub async fn get_job(&self, user_id: UserId, job_id: JobId) -> Result<GenerationJob, ApiError> {
        self.store
            .get_job(&job_id)
            .await?
            .filter(|j| j.user_id == user_id)
            .ok_or_else(|| ApiError::NotFound(format!("Job {job_id} not found")))
    }
}

fn refund_entry(job: &GenerationJob) -> LedgerEntry {
    LedgerEntry::paper_refund(job.user_id, job.paper_id)
        .with_notes(format!("Refund: paper generation failed ({})", job.topic))
}

/// Delay before retry number `retry` (1-based): `initial * 2^(retry-1)`, capped.
fn backoff(settings: &WorkerSettings, retry: u32) -> Duration {
    let factor = 2u32.saturating_pow(retry.saturating_sub(1));
    settings
        .initial_backoff
        .saturating_mul(factor)
        .min(settings.max_backoff)
}

/// Back half of the pipeline: drains the queue and runs the generator.
pub struct GenerationWorker {
    store: Arc<dyn Store>,
    generator: Arc<dyn PaperGenerator>,
    settings: WorkerSettings,
    receiver: mpsc::Receiver<GenerationJob>,
}

impl GenerationWorker {
    /// Process jobs until every [`PaperService`] handle is dropped.
    ///
    /// Each job runs in its own task so that one job's backoff does not
    /// hold up the rest of the queue.
    pub async fn run(mut self) {
        tracing::info!("Generation worker started");
        let context = Arc::new(JobContext {
            store: self.store,
            generator: self.generator,
            settings: self.settings,
        });
        while let Some(job) = self.receiver.recv().await {
            let context = Arc::clone(&context);
            tokio::spawn(async move { context.process(job).await });
        }
        tracing::info!("Generation worker stopped");
    }
}

struct JobContext {
    store: Arc<dyn Store>,
    generator: Arc<dyn PaperGenerator>,
    settings: WorkerSettings,
}

impl JobContext {
    async fn process(&self, job: GenerationJob) {
        loop {
            let error = match self.generator.generate(&job.topic).await {
                Ok(questions) => {
                    let stored = self
                        .persist(&job, "store paper", || {
                            self.store.complete_generation(&job.id, &questions)
                        })
                        .await;
                    if stored.is_some() {
                        tracing::info!(
                            job_id = %job.id,
                            paper_id = %job.paper_id,
                            questions = questions.len(),
                            "Paper generated"
                        );
                    }
                    return;
                }
                Err(e) => e.to_string(),
            };

            let Some(attempts) = self
                .persist(&job, "record attempt", || {
                    self.store.record_job_attempt(&job.id, &error)
                })
                .await
            else {
                return;
            };

            if attempts >= self.settings.max_attempts {
                self.give_up(&job, &error).await;
                return;
            }

            let delay = backoff(&self.settings, attempts);
            tracing::warn!(
                job_id = %job.id,
                attempt = attempts,
                error = %error,
                retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Paper generation failed; retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn give_up(&self, job: &GenerationJob, error: &str) {
        let refund = refund_entry(job);
        let outcome = self
            .persist(job, "refund paper", || {
                self.store.fail_generation(&job.id, error, &refund)
            })
            .await;

        match outcome {
            Some(Some(receipt)) => tracing::warn!(
                job_id = %job.id,
                paper_id = %job.paper_id,
                user_id = %job.user_id,
                new_balance = receipt.new_balance,
                "Paper generation failed; credit refunded"
            ),
            Some(None) => tracing::warn!(
                job_id = %job.id,
                paper_id = %job.paper_id,
                "Paper generation failed; paper was already refunded"
            ),
            None => {}
        }
    }

    /// Run a store write for `job`, retrying transient failures with the
    /// worker's backoff. `None` means the job has left the worker's hands:
    /// it is gone, already finished, or the store stayed unavailable (it is
    /// still pending and is picked up again on restart).
    async fn persist<T, F, Fut>(
        &self,
        job: &GenerationJob,
        action: &str,
        mut write: F,
    ) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = examprep_store::Result<T>>,
    {
        let mut retry = 0;
        loop {
            match write().await {
                Ok(value) => return Some(value),
                Err(e @ (StoreError::NotFound { .. } | StoreError::Conflict(_))) => {
                    tracing::warn!(job_id = %job.id, action, error = %e, "Job no longer pending");
                    return None;
                }
                Err(e) => {
                    retry += 1;
                    if retry >= self.settings.max_attempts {
                        tracing::error!(
                            job_id = %job.id,
                            action,
                            error = %e,
                            "Store unavailable; job left pending until restart"
                        );
                        return None;
                    }
                    let delay = backoff(&self.settings, retry);
                    tracing::warn!(
                        job_id = %job.id,
                        action,
                        error = %e,
                        "Store write failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
