use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::WorkshopConfig;
use crate::journal::Journal;
use crate::pipeline::{Pipeline, Timing};
use crate::resource::ResourceManager;
use crate::state_machine::{AdmissionSource, Category, Job};

/// Summary produced once every job of a run has left the workshop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub bays: usize,
    pub mechanics: usize,
    pub expected: u32,
    pub processed: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Jobs per second.
    pub throughput: f64,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.processed == self.expected
    }
}

/// Generates the job population and waits for all of it to finish.
pub struct Orchestrator {
    config: WorkshopConfig,
    pipeline: Arc<Pipeline>,
    shutdown: CancellationToken,
}

impl Orchestrator {
    pub fn new(config: WorkshopConfig, pipeline: Arc<Pipeline>) -> Self {
        Self {
            config,
            pipeline,
            shutdown: CancellationToken::new(),
        }
    }

    /// Builds both resource managers and the pipeline from `config`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn from_config(
        config: WorkshopConfig,
        admission: Arc<dyn AdmissionSource>,
        journal: Arc<Journal>,
    ) -> Self {
        let pipeline = Pipeline::new(
            ResourceManager::new("bays", config.bays),
            ResourceManager::new("mechanics", config.mechanics),
            admission,
            journal,
            Timing::from_config(&config),
        );
        Self::new(config, Arc::new(pipeline))
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Cancelled exactly when the run has finished.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// The jobs of one run, in launch order: one burst per category,
    /// ids strictly increasing across bursts.
    pub fn plan(&self) -> Vec<Job> {
        let mut next_id = 1;
        let mut jobs = Vec::with_capacity(self.config.total_jobs() as usize);
        for category in Category::ALL {
            let duration = self.config.duration_for(category);
            for _ in 0..self.config.jobs_for(category) {
                jobs.push(Job::new(next_id, category, duration));
                next_id += 1;
            }
        }
        jobs
    }

    /// Launches every planned job with staggered arrivals and waits for all of them.
    pub async fn run(&self) -> RunReport {
        let started_at = Utc::now();
        let clock = Instant::now();
        let plan = self.plan();
        let expected = plan.len() as u32;
        let arrival_delay = self.config.arrival_delay();

        tracing::info!(
            jobs = expected,
            bays = self.config.bays,
            mechanics = self.config.mechanics,
            "workshop open"
        );

        let mut running = JoinSet::new();
        let mut launched = 0;
        for job in plan {
            if launched > 0 && !arrival_delay.is_zero() {
                sleep(arrival_delay).await;
            }
            let pipeline = Arc::clone(&self.pipeline);
            running.spawn(async move { (job.id, pipeline.run(job).await) });
            launched += 1;
        }

        let mut processed = 0;
        while let Some(joined) = running.join_next().await {
            match joined {
                Ok((_, Ok(()))) => processed += 1,
                Ok((id, Err(e))) => tracing::error!(job = id, error = %e, "job did not finish"),
                Err(e) => tracing::error!(error = %e, "job task panicked"),
            }
        }

        self.shutdown.cancel();
        let elapsed = clock.elapsed();
        tracing::info!(processed, expected, elapsed_ms = elapsed.as_millis() as u64, "workshop closed");

        RunReport {
            run_id: Uuid::new_v4().to_string(),
            bays: self.config.bays,
            mechanics: self.config.mechanics,
            expected,
            processed,
            started_at,
            completed_at: Utc::now(),
            duration_ms: elapsed.as_millis() as u64,
            throughput: throughput(processed, elapsed),
        }
    }
}

fn throughput(processed: u32, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs == 0.0 {
        0.0
    } else {
        f64::from(processed) / secs
    }
}
