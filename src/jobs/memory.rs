//! Process-local job store

use super::{Job, JobStore, JobUpdate};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Job records held in a map; lost on restart
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn put(&self, job: Job) -> Result<()> {
        self.jobs.write().await.insert(job.token.clone(), job);
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<Job>> {
        Ok(self.jobs.read().await.get(token).cloned())
    }

    async fn update(&self, token: &str, update: JobUpdate) -> Result<Option<Job>> {
        let mut jobs = self.jobs.write().await;
        Ok(jobs.get_mut(token).map(|job| {
            update(job);
            job.clone()
        }))
    }

    async fn remove(&self, token: &str) -> Result<Option<Job>> {
        Ok(self.jobs.write().await.remove(token))
    }

    async fn list(&self) -> Result<Vec<Job>> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(jobs)
    }

    async fn remove_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Job>> {
        let mut jobs = self.jobs.write().await;
        let expired: Vec<String> = jobs
            .values()
            .filter(|job| job.created_at < cutoff)
            .map(|job| job.token.clone())
            .collect();
        Ok(expired
            .into_iter()
            .filter_map(|token| jobs.remove(&token))
            .collect())
    }
}
