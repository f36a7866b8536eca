mod admission;
mod job;
mod phase;

pub use admission::{AdmissionCell, AdmissionSource, AdmissionState, Change, can_enter};
pub use job::{Category, Job, Priority};
pub use phase::{Direction, Phase, PhaseMachine, Transition};
