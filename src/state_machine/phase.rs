use std::fmt;

use serde::{Deserialize, Serialize};

/// The four pipeline phases every job walks through, in order.
///
/// ARRIVAL → REPAIR → CLEANING → INSPECTION → done
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Arrival,
    Repair,
    Cleaning,
    Inspection,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Arrival, Phase::Repair, Phase::Cleaning, Phase::Inspection];

    /// Only the repair phase occupies a mechanic.
    pub fn needs_mechanic(self) -> bool {
        matches!(self, Phase::Repair)
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Arrival => "arrival",
            Phase::Repair => "repair",
            Phase::Cleaning => "cleaning",
            Phase::Inspection => "inspection",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.label() == label)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether a job is entering or leaving a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Entering,
    Leaving,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Direction::Entering => "entering",
            Direction::Leaving => "leaving",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "entering" => Some(Direction::Entering),
            "leaving" => Some(Direction::Leaving),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The result of finishing the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Advance to the next phase.
    Next(Phase),
    /// The last phase finished; the job leaves the workshop.
    Complete,
}

/// Tracks one job's position in the phase chain.
#[derive(Debug, Clone)]
pub struct PhaseMachine {
    current: Option<Phase>,
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseMachine {
    pub fn new() -> Self {
        Self {
            current: Some(Phase::Arrival),
        }
    }

    /// The phase in progress, or `None` once the chain is complete.
    pub fn current(&self) -> Option<Phase> {
        self.current
    }

    /// Finishes the current phase and moves to the next one.
    ///
    /// Calling this after completion keeps returning `Complete`.
    pub fn advance(&mut self) -> Transition {
        let Some(phase) = self.current else {
            return Transition::Complete;
        };

        let next = match phase {
            Phase::Arrival => Some(Phase::Repair),
            Phase::Repair => Some(Phase::Cleaning),
            Phase::Cleaning => Some(Phase::Inspection),
            Phase::Inspection => None,
        };
        self.current = next;

        match next {
            Some(phase) => Transition::Next(phase),
            None => Transition::Complete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_all_phases_in_order() {
        let mut machine = PhaseMachine::new();
        assert_eq!(machine.current(), Some(Phase::Arrival));

        assert_eq!(machine.advance(), Transition::Next(Phase::Repair));
        assert_eq!(machine.advance(), Transition::Next(Phase::Cleaning));
        assert_eq!(machine.advance(), Transition::Next(Phase::Inspection));
        assert_eq!(machine.advance(), Transition::Complete);
        assert_eq!(machine.current(), None);
    }

    #[test]
    fn complete_is_terminal() {
        let mut machine = PhaseMachine::new();
        for _ in 0..4 {
            machine.advance();
        }
        assert_eq!(machine.advance(), Transition::Complete);
        assert_eq!(machine.current(), None);
    }

    #[test]
    fn only_repair_needs_a_mechanic() {
        let with_mechanic: Vec<_> = Phase::ALL.into_iter().filter(|p| p.needs_mechanic()).collect();
        assert_eq!(with_mechanic, vec![Phase::Repair]);
    }

    #[test]
    fn labels_parse_back() {
        for phase in Phase::ALL {
            assert_eq!(Phase::from_label(phase.label()), Some(phase));
        }
        assert_eq!(Direction::from_label("entering"), Some(Direction::Entering));
        assert_eq!(Direction::from_label("leaving"), Some(Direction::Leaving));
        assert_eq!(Direction::from_label("idle"), None);
    }
}
