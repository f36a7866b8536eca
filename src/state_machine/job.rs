use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of fault a car is brought in for.
///
/// The set is closed; every category maps to exactly one [`Priority`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Mechanical,
    Electrical,
    Bodywork,
}

impl Category {
    /// All categories in generation order (one burst each).
    pub const ALL: [Category; 3] = [Category::Mechanical, Category::Electrical, Category::Bodywork];

    pub fn priority(self) -> Priority {
        match self {
            Category::Mechanical => Priority::High,
            Category::Electrical => Priority::Medium,
            Category::Bodywork => Priority::Low,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Mechanical => "mechanical",
            Category::Electrical => "electrical",
            Category::Bodywork => "bodywork",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Service priority. Numerically lower values are served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    High = 0,
    Medium = 1,
    Low = 2,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

/// A single car passing through the workshop. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: u32,
    pub category: Category,
    /// Base service time per phase, in configured time units.
    pub base_duration: u64,
}

impl Job {
    pub fn new(id: u32, category: Category, base_duration: u64) -> Self {
        Self {
            id,
            category,
            base_duration,
        }
    }

    pub fn priority(&self) -> Priority {
        self.category.priority()
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "job {} [{} - priority {}]",
            self.id,
            self.category,
            self.priority()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_is_derived_from_category() {
        assert_eq!(Category::Mechanical.priority(), Priority::High);
        assert_eq!(Category::Electrical.priority(), Priority::Medium);
        assert_eq!(Category::Bodywork.priority(), Priority::Low);
    }

    #[test]
    fn priority_orders_high_first() {
        assert!(Priority::High < Priority::Medium);
        assert!(Priority::Medium < Priority::Low);
        assert_eq!(Priority::Low as u8, 2);
    }

    #[test]
    fn category_labels_parse_back() {
        for category in Category::ALL {
            assert_eq!(Category::from_label(category.label()), Some(category));
        }
        assert_eq!(Category::from_label("paint"), None);
    }

    #[test]
    fn job_display() {
        let job = Job::new(7, Category::Electrical, 3);
        assert_eq!(job.to_string(), "job 7 [electrical - priority medium]");
    }

    #[test]
    fn job_serialization_roundtrip() {
        let job = Job::new(1, Category::Bodywork, 1);
        let json = serde_json::to_string(&job).unwrap();
        let back: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(back, job);
    }
}
