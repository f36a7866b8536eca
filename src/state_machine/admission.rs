//! Workshop-wide admission state.
//!
//! A single code in `0..=9` decides which [`Category`] may start the
//! pipeline. Codes 7 and 8 are reserved and never accepted. The state is
//! written rarely (by the controller listener) and read by every waiting job,
//! so it lives behind a reader/writer lock instead of a control loop.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use super::job::Category;

/// Accepted admission codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdmissionState {
    #[default]
    Inactive = 0,
    OnlyMechanical = 1,
    OnlyElectrical = 2,
    OnlyBodywork = 3,
    PriorityMechanical = 4,
    PriorityElectrical = 5,
    PriorityBodywork = 6,
    Closed = 9,
}

impl AdmissionState {
    /// Maps a raw code to a state. Reserved (7, 8) and out-of-range codes yield `None`.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(AdmissionState::Inactive),
            1 => Some(AdmissionState::OnlyMechanical),
            2 => Some(AdmissionState::OnlyElectrical),
            3 => Some(AdmissionState::OnlyBodywork),
            4 => Some(AdmissionState::PriorityMechanical),
            5 => Some(AdmissionState::PriorityElectrical),
            6 => Some(AdmissionState::PriorityBodywork),
            9 => Some(AdmissionState::Closed),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether the shop is fully shut (no category may enter).
    pub fn is_shut(self) -> bool {
        matches!(self, AdmissionState::Inactive | AdmissionState::Closed)
    }

    pub fn admits(self, category: Category) -> bool {
        can_enter(category, self.code())
    }

    /// Whether every category may enter.
    pub fn admits_all(self) -> bool {
        Category::ALL.into_iter().all(|category| self.admits(category))
    }

    pub fn label(self) -> &'static str {
        match self {
            AdmissionState::Inactive => "Inactive",
            AdmissionState::OnlyMechanical => "Only mechanical",
            AdmissionState::OnlyElectrical => "Only electrical",
            AdmissionState::OnlyBodywork => "Only bodywork",
            AdmissionState::PriorityMechanical => "Priority mechanical",
            AdmissionState::PriorityElectrical => "Priority electrical",
            AdmissionState::PriorityBodywork => "Priority bodywork",
            AdmissionState::Closed => "Closed",
        }
    }
}

impl fmt::Display for AdmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.code())
    }
}

/// Pure admission predicate over raw codes.
///
/// - `0`, `9`: nobody enters.
/// - `1`, `2`, `3`: only the matching category enters.
/// - anything else (including the priority variants `4..=6`): everybody enters.
pub fn can_enter(category: Category, code: u8) -> bool {
    match code {
        0 | 9 => false,
        1 => category == Category::Mechanical,
        2 => category == Category::Electrical,
        3 => category == Category::Bodywork,
        _ => true,
    }
}

/// Read access to the current admission state.
///
/// Jobs only ever read through this trait, so tests can substitute a fixed
/// or scripted source for the shared [`AdmissionCell`].
pub trait AdmissionSource: Send + Sync {
    fn get(&self) -> AdmissionState;
}

/// A state change that actually altered the stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change {
    pub from: AdmissionState,
    pub to: AdmissionState,
}

/// Shared, lock-guarded admission state.
#[derive(Debug, Default)]
pub struct AdmissionCell {
    state: RwLock<AdmissionState>,
}

impl AdmissionCell {
    pub fn new(initial: AdmissionState) -> Self {
        Self {
            state: RwLock::new(initial),
        }
    }

    /// Stores `next`, returning the change if the value differs.
    pub fn set(&self, next: AdmissionState) -> Option<Change> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let from = *state;
        *state = next;
        (from != next).then_some(Change { from, to: next })
    }

    /// Applies a raw code. Rejected codes leave the state untouched.
    pub fn apply(&self, code: u8) -> Option<Change> {
        let Some(next) = AdmissionState::from_code(code) else {
            tracing::debug!(code, "ignoring reserved or out-of-range admission code");
            return None;
        };
        self.set(next)
    }
}

impl AdmissionSource for AdmissionCell {
    fn get(&self) -> AdmissionState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}
