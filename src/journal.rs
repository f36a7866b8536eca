//! # Chronological event journal
//!
//! Every phase transition is stamped with the time elapsed since the journal
//! was created and appended under a single lock, so the recorded order is the
//! order in which transitions happened. Observers (terminal output, tests) are
//! notified while that lock is held.
//!
//! ## Line format
//! ```text
//! t=12.04 job=3 category=mechanical phase=repair entering
//! ```
//! [`PhaseEvent`] renders to and parses from this format.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::error::WorkshopError;
use crate::state_machine::{Category, Change, Direction, Job, Phase};

/// One phase entry or exit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseEvent {
    pub elapsed: Duration,
    pub job_id: u32,
    pub category: Category,
    pub phase: Phase,
    pub direction: Direction,
}

impl fmt::Display for PhaseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:.2} job={} category={} phase={} {}",
            self.elapsed.as_secs_f64(),
            self.job_id,
            self.category,
            self.phase,
            self.direction
        )
    }
}

impl FromStr for PhaseEvent {
    type Err = WorkshopError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let bad = || WorkshopError::JournalLine(line.to_string());
        let mut fields = line.split_whitespace();

        let secs: f64 = field(&mut fields, "t")
            .and_then(|v| v.parse().ok())
            .ok_or_else(bad)?;
        let job_id = field(&mut fields, "job")
            .and_then(|v| v.parse().ok())
            .ok_or_else(bad)?;
        let category = field(&mut fields, "category")
            .and_then(Category::from_label)
            .ok_or_else(bad)?;
        let phase = field(&mut fields, "phase")
            .and_then(Phase::from_label)
            .ok_or_else(bad)?;
        let direction = fields
            .next()
            .and_then(Direction::from_label)
            .ok_or_else(bad)?;
        if fields.next().is_some() || !secs.is_finite() || secs < 0.0 {
            return Err(bad());
        }

        Ok(Self {
            elapsed: Duration::from_secs_f64(secs),
            job_id,
            category,
            phase,
            direction,
        })
    }
}

fn field<'a>(fields: &mut std::str::SplitWhitespace<'a>, key: &str) -> Option<&'a str> {
    fields.next()?.strip_prefix(key)?.strip_prefix('=')
}

/// Receives workshop notifications.
///
/// Journal callbacks run synchronously under the journal lock; implementations
/// must be quick.
pub trait Observe: Send + Sync {
    fn on_phase(&self, _event: &PhaseEvent) {}

    fn on_state_change(&self, _change: &Change) {}

    fn on_job_done(&self, _job: &Job) {}
}

/// Shared, append-only record of a simulation run.
pub struct Journal {
    started: Instant,
    events: Mutex<Vec<PhaseEvent>>,
    observers: Vec<Arc<dyn Observe>>,
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}

impl Journal {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            events: Mutex::new(Vec::new()),
            observers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn Observe>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Records a phase transition and returns the stamped event.
    pub fn phase(&self, job: &Job, phase: Phase, direction: Direction) -> PhaseEvent {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        let event = PhaseEvent {
            elapsed: self.elapsed(),
            job_id: job.id,
            category: job.category,
            phase,
            direction,
        };
        tracing::debug!(
            job = job.id,
            category = %job.category,
            phase = %phase,
            direction = %direction,
            elapsed_ms = event.elapsed.as_millis() as u64,
            "phase transition"
        );
        events.push(event);
        for observer in &self.observers {
            observer.on_phase(&event);
        }
        event
    }

    pub fn job_done(&self, job: &Job) {
        let _events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        for observer in &self.observers {
            observer.on_job_done(job);
        }
    }

    /// All recorded events, oldest first.
    pub fn events(&self) -> Vec<PhaseEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, phase: Phase, direction: Direction) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.phase == phase && e.direction == direction)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl Observe for Recorder {
        fn on_phase(&self, event: &PhaseEvent) {
            self.seen.lock().unwrap().push(event.to_string());
        }

        fn on_job_done(&self, job: &Job) {
            self.seen.lock().unwrap().push(format!("done {}", job.id));
        }
    }

    #[test]
    fn event_renders_fixed_field_order() {
        let event = PhaseEvent {
            elapsed: Duration::from_millis(12_346),
            job_id: 3,
            category: Category::Mechanical,
            phase: Phase::Repair,
            direction: Direction::Entering,
        };
        assert_eq!(
            event.to_string(),
            "t=12.35 job=3 category=mechanical phase=repair entering"
        );
    }

    #[test]
    fn event_parses_back() {
        let line = "t=0.52 job=17 category=bodywork phase=inspection leaving";
        let event: PhaseEvent = line.parse().unwrap();
        assert_eq!(event.job_id, 17);
        assert_eq!(event.category, Category::Bodywork);
        assert_eq!(event.phase, Phase::Inspection);
        assert_eq!(event.direction, Direction::Leaving);
        assert_eq!(event.elapsed, Duration::from_secs_f64(0.52));
        assert_eq!(event.to_string(), line);
    }

    #[test]
    fn malformed_lines_are_rejected() {
        for line in [
            "",
            "t=1.00 job=1 category=bodywork phase=repair",
            "t=1.00 job=x category=bodywork phase=repair entering",
            "t=1.00 job=1 category=paint phase=repair entering",
            "t=1.00 job=1 category=bodywork phase=repair entering extra",
            "job=1 t=1.00 category=bodywork phase=repair entering",
            "t=-1.00 job=1 category=bodywork phase=repair entering",
        ] {
            assert!(line.parse::<PhaseEvent>().is_err(), "{line:?} should not parse");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn records_in_order_with_elapsed_time() {
        let journal = Journal::new();
        let job = Job::new(1, Category::Electrical, 3);

        journal.phase(&job, Phase::Arrival, Direction::Entering);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        journal.phase(&job, Phase::Arrival, Direction::Leaving);

        let events = journal.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].elapsed, Duration::ZERO);
        assert!(events[1].elapsed >= Duration::from_millis(1500));
        assert!(events[1].elapsed < Duration::from_millis(1501));
        assert_eq!(journal.count(Phase::Arrival, Direction::Leaving), 1);
        assert_eq!(journal.count(Phase::Repair, Direction::Entering), 0);
        assert_eq!(events[1].to_string(), "t=1.50 job=1 category=electrical phase=arrival leaving");
    }

    #[tokio::test]
    async fn observers_see_phases_and_completions() {
        let recorder = Arc::new(Recorder::default());
        let journal = Journal::new().with_observer(recorder.clone());
        let job = Job::new(4, Category::Bodywork, 1);

        journal.phase(&job, Phase::Cleaning, Direction::Entering);
        journal.job_done(&job);

        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].ends_with("job=4 category=bodywork phase=cleaning entering"));
        assert_eq!(seen[1], "done 4");
    }
}
