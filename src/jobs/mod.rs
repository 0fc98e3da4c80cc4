//! Background PDF generation jobs
//!
//! A job is submitted, rendered on a blocking worker, and its record is
//! advanced as progress events arrive. Records live in a [`JobStore`];
//! [`MemoryJobStore`] keeps them in process memory only.

mod memory;

pub use memory::MemoryJobStore;

use crate::error::{Error, ErrorKind, Result};
use crate::progress::{ProgressStage, RenderProgress};
use crate::render::{fetch_book, render_book, PdfOptions};
use crate::store::ContentStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Generating,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Generating => write!(f, "generating"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Why a job failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&Error> for JobFailure {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// One PDF generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub token: String,
    pub book_id: i64,
    pub status: JobStatus,
    pub progress: u8,
    pub stage: Option<ProgressStage>,
    pub current_chapter: Option<usize>,
    pub total_chapters: Option<usize>,
    pub file_path: Option<PathBuf>,
    pub error: Option<JobFailure>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub options: PdfOptions,
}

impl Job {
    pub fn new(token: impl Into<String>, book_id: i64, options: PdfOptions) -> Self {
        let now = Utc::now();
        Self {
            token: token.into(),
            book_id,
            status: JobStatus::Queued,
            progress: 0,
            stage: None,
            current_chapter: None,
            total_chapters: None,
            file_path: None,
            error: None,
            created_at: now,
            updated_at: now,
            options,
        }
    }

    /// Fold a progress event into the record; percent never goes backwards
    pub fn apply_progress(&mut self, progress: &RenderProgress) {
        self.progress = self.progress.max(progress.percent);
        self.stage = Some(progress.stage);
        if progress.current_chapter.is_some() {
            self.current_chapter = progress.current_chapter;
        }
        if progress.total_chapters.is_some() {
            self.total_chapters = progress.total_chapters;
        }
        self.updated_at = Utc::now();
    }
}

/// Returned by submit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTicket {
    pub token: String,
    pub status: JobStatus,
}

/// Result of a successful download
#[derive(Debug, Clone)]
pub struct JobDownload {
    pub book_id: i64,
    pub bytes: Vec<u8>,
}

/// In-place modification applied by a job store
pub type JobUpdate = Box<dyn FnOnce(&mut Job) + Send>;

/// Storage for job records
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert or replace a record
    async fn put(&self, job: Job) -> Result<()>;

    async fn get(&self, token: &str) -> Result<Option<Job>>;

    /// Apply `update` to an existing record; returns the updated record
    async fn update(&self, token: &str, update: JobUpdate) -> Result<Option<Job>>;

    async fn remove(&self, token: &str) -> Result<Option<Job>>;

    async fn list(&self) -> Result<Vec<Job>>;

    /// Remove every record created before `cutoff`
    async fn remove_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Job>>;
}

/// Submits, tracks and hands out PDF jobs
#[derive(Clone)]
pub struct JobService {
    store: ContentStore,
    jobs: Arc<dyn JobStore>,
    output_dir: PathBuf,
}

impl JobService {
    pub fn new(store: ContentStore, jobs: Arc<dyn JobStore>, output_dir: PathBuf) -> Self {
        Self {
            store,
            jobs,
            output_dir,
        }
    }

    /// Service backed by a fresh [`MemoryJobStore`]
    pub fn in_memory(store: ContentStore, output_dir: PathBuf) -> Self {
        Self::new(store, Arc::new(MemoryJobStore::new()), output_dir)
    }

    /// Queue a PDF for `book_id` and return immediately
    pub async fn submit(&self, book_id: i64, options: PdfOptions) -> Result<JobTicket> {
        options.validate().map_err(Error::InvalidInput)?;

        let token = Uuid::new_v4().to_string();
        self.jobs
            .put(Job::new(token.clone(), book_id, options.clone()))
            .await?;

        let service = self.clone();
        let task_token = token.clone();
        tokio::spawn(async move {
            service.run(task_token, book_id, options).await;
        });

        info!(token = %token, book_id, "Queued PDF job");
        Ok(JobTicket {
            token,
            status: JobStatus::Queued,
        })
    }

    /// Current record for a token
    pub async fn status(&self, token: &str) -> Result<Job> {
        self.jobs
            .get(token)
            .await?
            .ok_or_else(|| Error::JobNotFound(token.to_string()))
    }

    /// All known jobs
    pub async fn list(&self) -> Result<Vec<Job>> {
        self.jobs.list().await
    }

    /// Hand out a finished PDF.
    ///
    /// The record and its file are removed afterwards, so a second download
    /// of the same token reports `JobNotFound`.
    pub async fn download(&self, token: &str) -> Result<JobDownload> {
        let job = self.status(token).await?;

        if job.status != JobStatus::Completed {
            return Err(Error::JobNotReady {
                status: job.status.to_string(),
                progress: job.progress,
            });
        }

        let path = job
            .file_path
            .ok_or_else(|| Error::Generation(format!("Job {} has no output file", token)))?;
        let bytes = tokio::fs::read(&path).await?;

        self.jobs.remove(token).await?;
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(token, path = %path.display(), error = %e, "Failed to delete downloaded PDF");
        }

        info!(token, book_id = job.book_id, bytes = bytes.len(), "PDF downloaded");
        Ok(JobDownload {
            book_id: job.book_id,
            bytes,
        })
    }

    /// Drop records older than `max_age` together with their files
    pub async fn sweep_expired(&self, max_age: chrono::Duration) -> Result<usize> {
        let cutoff = Utc::now() - max_age;
        let expired = self.jobs.remove_older_than(cutoff).await?;

        for job in &expired {
            if let Some(path) = &job.file_path {
                if let Err(e) = tokio::fs::remove_file(path).await {
                    debug!(token = %job.token, error = %e, "Expired job file already gone");
                }
            }
        }

        Ok(expired.len())
    }

    /// Run [`sweep_expired`](Self::sweep_expired) every `interval`
    pub fn spawn_sweeper(&self, interval: Duration, max_age: chrono::Duration) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match service.sweep_expired(max_age).await {
                    Ok(0) => {}
                    Ok(count) => info!(count, "Swept expired PDF jobs"),
                    Err(e) => warn!(error = %e, "Job sweep failed"),
                }
            }
        })
    }

    async fn run(&self, token: String, book_id: i64, options: PdfOptions) {
        let outcome = self.generate(&token, book_id, options).await;

        let update: JobUpdate = match outcome {
            Ok(path) => {
                info!(token = %token, book_id, path = %path.display(), "PDF job completed");
                Box::new(move |job: &mut Job| {
                    job.status = JobStatus::Completed;
                    job.progress = 100;
                    job.stage = Some(ProgressStage::Complete);
                    job.file_path = Some(path);
                    job.updated_at = Utc::now();
                })
            }
            Err(err) => {
                warn!(token = %token, book_id, error = %err, "PDF job failed");
                let failure = JobFailure::from(&err);
                Box::new(move |job: &mut Job| {
                    job.status = JobStatus::Failed;
                    job.file_path = None;
                    job.error = Some(failure);
                    job.updated_at = Utc::now();
                })
            }
        };

        if let Err(e) = self.jobs.update(&token, update).await {
            warn!(token = %token, error = %e, "Failed to record job outcome");
        }
    }

    async fn generate(&self, token: &str, book_id: i64, options: PdfOptions) -> Result<PathBuf> {
        self.record_progress(token, RenderProgress::at(ProgressStage::Fetching, 0))
            .await?;
        let (book, paragraphs) = fetch_book(&self.store, book_id).await?;

        self.jobs
            .update(
                token,
                Box::new(|job: &mut Job| {
                    job.status = JobStatus::Generating;
                    job.updated_at = Utc::now();
                }),
            )
            .await?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let render = tokio::task::spawn_blocking(move || {
            let mut sink = tx;
            render_book(&book, &paragraphs, &options, &mut sink)
        });

        while let Some(progress) = rx.recv().await {
            self.record_progress(token, progress).await?;
        }

        let bytes = render
            .await
            .map_err(|e| Error::Generation(format!("Render task failed: {}", e)))?
            .map_err(|e| match e {
                Error::Generation(_) | Error::EmptyContent(_) => e,
                other => Error::Generation(other.to_string()),
            })?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_dir.join(format!("{}.pdf", token));
        tokio::fs::write(&path, &bytes).await?;

        Ok(path)
    }

    async fn record_progress(&self, token: &str, progress: RenderProgress) -> Result<()> {
        self.jobs
            .update(
                token,
                Box::new(move |job: &mut Job| job.apply_progress(&progress)),
            )
            .await?;
        Ok(())
    }
}
