//! # Per-job pipeline
//!
//! ```text
//! wait for admission ──► acquire bay ──► ARRIVAL ──► acquire mechanic ──► REPAIR ──► release mechanic
//!                                                                                        │
//!                         release bay ◄── INSPECTION ◄── CLEANING ◄──────────────────────┘
//! ```
//! The bay is held for the whole visit; the mechanic only for the repair.
//! Each phase sleeps `base_duration * time_unit` plus a uniform jitter in
//! `[0, jitter_ms)`.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::sleep;

use crate::config::WorkshopConfig;
use crate::error::WorkshopError;
use crate::journal::Journal;
use crate::resource::ResourceManager;
use crate::state_machine::{
    AdmissionSource, AdmissionState, Direction, Job, PhaseMachine, Transition,
};

/// Timing parameters shared by every job of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub time_unit: Duration,
    pub jitter_ms: u64,
    pub closed_poll: Duration,
    pub restricted_poll: Duration,
    pub seed: Option<u64>,
}

impl Timing {
    pub fn from_config(config: &WorkshopConfig) -> Self {
        Self {
            time_unit: config.time_unit(),
            jitter_ms: config.jitter_ms,
            closed_poll: config.closed_poll(),
            restricted_poll: config.restricted_poll(),
            seed: config.seed,
        }
    }

    /// Length of one phase for `job`.
    pub fn phase_duration(&self, job: &Job, rng: &mut impl Rng) -> Duration {
        let units = u32::try_from(job.base_duration).unwrap_or(u32::MAX);
        let base = self.time_unit.saturating_mul(units);
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rng.random_range(0..self.jitter_ms)
        };
        base + Duration::from_millis(jitter)
    }

    /// How long a rejected job waits before checking the state again.
    pub fn poll_interval(&self, state: AdmissionState) -> Duration {
        if state.is_shut() {
            self.closed_poll
        } else {
            self.restricted_poll
        }
    }

    /// Jitter source for one job; seeded runs are reproducible per job id.
    pub fn rng_for(&self, job: &Job) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ u64::from(job.id).rotate_left(32)),
            None => StdRng::from_os_rng(),
        }
    }
}

/// Drives single jobs through admission and the four phases.
pub struct Pipeline {
    bays: ResourceManager,
    mechanics: ResourceManager,
    admission: Arc<dyn AdmissionSource>,
    journal: Arc<Journal>,
    timing: Timing,
}

impl Pipeline {
    pub fn new(
        bays: ResourceManager,
        mechanics: ResourceManager,
        admission: Arc<dyn AdmissionSource>,
        journal: Arc<Journal>,
        timing: Timing,
    ) -> Self {
        Self {
            bays,
            mechanics,
            admission,
            journal,
            timing,
        }
    }

    pub fn journal(&self) -> &Arc<Journal> {
        &self.journal
    }

    pub fn bays(&self) -> &ResourceManager {
        &self.bays
    }

    pub fn mechanics(&self) -> &ResourceManager {
        &self.mechanics
    }

    /// Runs `job` from admission to leaving the workshop.
    ///
    /// Once a job holds a bay it always finishes all four phases and
    /// returns both resources.
    pub async fn run(&self, job: Job) -> Result<(), WorkshopError> {
        let admitted = self.wait_for_admission(&job).await;
        tracing::debug!(job = job.id, state = %admitted, "admitted");

        let bay = self.bays.acquire(&job).await?;
        let mut rng = self.timing.rng_for(&job);
        let mut machine = PhaseMachine::new();
        let mut step = machine.current();

        while let Some(phase) = step {
            let mechanic = if phase.needs_mechanic() {
                Some(self.mechanics.acquire(&job).await?)
            } else {
                None
            };

            self.journal.phase(&job, phase, Direction::Entering);
            sleep(self.timing.phase_duration(&job, &mut rng)).await;
            self.journal.phase(&job, phase, Direction::Leaving);

            if let Some(mechanic) = mechanic {
                mechanic.release();
            }
            step = match machine.advance() {
                Transition::Next(next) => Some(next),
                Transition::Complete => None,
            };
        }

        bay.release();
        self.journal.job_done(&job);
        Ok(())
    }

    /// Polls the admission state until `job` may enter.
    pub async fn wait_for_admission(&self, job: &Job) -> AdmissionState {
        loop {
            let state = self.admission.get();
            if state.admits(job.category) {
                return state;
            }
            sleep(self.timing.poll_interval(state)).await;
        }
    }
}
