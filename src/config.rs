//! Workshop configuration loaded from `workshop.toml`.
//!
//! Every key is optional; missing keys fall back to the defaults of the
//! reference scenario (6 bays, 3 mechanics, 10 cars per category).
//! `WORKSHOP_CONTROLLER_ADDR` takes precedence over the file for the
//! controller address.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::WorkshopError;
use crate::state_machine::Category;

pub const CONFIG_FILE: &str = "workshop.toml";
pub const CONTROLLER_ADDR_ENV: &str = "WORKSHOP_CONTROLLER_ADDR";

/// Fixed-at-start parameters of a simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkshopConfig {
    /// Address of the controller that sends admission codes.
    #[serde(default = "default_controller_addr")]
    pub controller_addr: String,

    /// Number of bays (held for a job's whole visit).
    #[serde(default = "default_bays")]
    pub bays: usize,

    /// Number of mechanics (held only during repair).
    #[serde(default = "default_mechanics")]
    pub mechanics: usize,

    #[serde(default = "default_jobs")]
    pub jobs_mechanical: u32,
    #[serde(default = "default_jobs")]
    pub jobs_electrical: u32,
    #[serde(default = "default_jobs")]
    pub jobs_bodywork: u32,

    /// Base duration of each phase, in time units.
    #[serde(default = "default_duration_mechanical")]
    pub duration_mechanical: u64,
    #[serde(default = "default_duration_electrical")]
    pub duration_electrical: u64,
    #[serde(default = "default_duration_bodywork")]
    pub duration_bodywork: u64,

    /// Length of one time unit in milliseconds.
    #[serde(default = "default_time_unit_ms")]
    pub time_unit_ms: u64,

    /// Exclusive upper bound of the random per-phase jitter.
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    /// Pause between two consecutive arrivals.
    #[serde(default = "default_arrival_delay_ms")]
    pub arrival_delay_ms: u64,

    /// Admission re-check interval while the shop is inactive or closed.
    #[serde(default = "default_closed_poll_ms")]
    pub closed_poll_ms: u64,

    /// Admission re-check interval while only other categories may enter.
    #[serde(default = "default_restricted_poll_ms")]
    pub restricted_poll_ms: u64,

    /// Fixed jitter seed; `None` draws fresh randomness every run.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_controller_addr() -> String {
    "localhost:8000".to_string()
}

fn default_bays() -> usize {
    6
}

fn default_mechanics() -> usize {
    3
}

fn default_jobs() -> u32 {
    10
}

fn default_duration_mechanical() -> u64 {
    5
}

fn default_duration_electrical() -> u64 {
    3
}

fn default_duration_bodywork() -> u64 {
    1
}

fn default_time_unit_ms() -> u64 {
    1000
}

fn default_jitter_ms() -> u64 {
    500
}

fn default_arrival_delay_ms() -> u64 {
    1500
}

fn default_closed_poll_ms() -> u64 {
    2000
}

fn default_restricted_poll_ms() -> u64 {
    500
}

impl Default for WorkshopConfig {
    fn default() -> Self {
        Self {
            controller_addr: default_controller_addr(),
            bays: default_bays(),
            mechanics: default_mechanics(),
            jobs_mechanical: default_jobs(),
            jobs_electrical: default_jobs(),
            jobs_bodywork: default_jobs(),
            duration_mechanical: default_duration_mechanical(),
            duration_electrical: default_duration_electrical(),
            duration_bodywork: default_duration_bodywork(),
            time_unit_ms: default_time_unit_ms(),
            jitter_ms: default_jitter_ms(),
            arrival_delay_ms: default_arrival_delay_ms(),
            closed_poll_ms: default_closed_poll_ms(),
            restricted_poll_ms: default_restricted_poll_ms(),
            seed: None,
        }
    }
}

impl WorkshopConfig {
    /// Loads `path`, or `workshop.toml` from the current directory, or defaults
    /// if neither is given nor present. The environment override applies last.
    ///
    /// Not validated: command-line overrides still apply on top, so callers
    /// run [`WorkshopConfig::validate`] once those are in.
    pub fn load(path: Option<&Path>) -> Result<Self, WorkshopError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None if Path::new(CONFIG_FILE).exists() => Self::load_from(Path::new(CONFIG_FILE))?,
            None => Self::default(),
        };
        config.apply_controller_override(std::env::var(CONTROLLER_ADDR_ENV).ok());
        Ok(config)
    }

    /// Parses the file at `path` without consulting the environment.
    pub fn load_from(path: &Path) -> Result<Self, WorkshopError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str::<WorkshopConfig>(&contents)?)
    }

    /// Applies `--bays` / `--mechanics`, which win over file and defaults.
    pub fn override_capacity(&mut self, bays: Option<usize>, mechanics: Option<usize>) {
        if let Some(bays) = bays {
            self.bays = bays;
        }
        if let Some(mechanics) = mechanics {
            self.mechanics = mechanics;
        }
    }

    fn apply_controller_override(&mut self, addr: Option<String>) {
        if let Some(addr) = addr
            && !addr.is_empty()
        {
            self.controller_addr = addr;
        }
    }

    pub fn validate(&self) -> Result<(), WorkshopError> {
        if self.bays == 0 {
            return Err(WorkshopError::Config("bays must be at least 1".into()));
        }
        if self.mechanics == 0 {
            return Err(WorkshopError::Config("mechanics must be at least 1".into()));
        }
        if self.time_unit_ms == 0 {
            return Err(WorkshopError::Config("time_unit_ms must be at least 1".into()));
        }
        Ok(())
    }

    pub fn jobs_for(&self, category: Category) -> u32 {
        match category {
            Category::Mechanical => self.jobs_mechanical,
            Category::Electrical => self.jobs_electrical,
            Category::Bodywork => self.jobs_bodywork,
        }
    }

    pub fn duration_for(&self, category: Category) -> u64 {
        match category {
            Category::Mechanical => self.duration_mechanical,
            Category::Electrical => self.duration_electrical,
            Category::Bodywork => self.duration_bodywork,
        }
    }

    pub fn total_jobs(&self) -> u32 {
        Category::ALL.iter().map(|c| self.jobs_for(*c)).sum()
    }

    pub fn time_unit(&self) -> Duration {
        Duration::from_millis(self.time_unit_ms)
    }

    pub fn arrival_delay(&self) -> Duration {
        Duration::from_millis(self.arrival_delay_ms)
    }

    pub fn closed_poll(&self) -> Duration {
        Duration::from_millis(self.closed_poll_ms)
    }

    pub fn restricted_poll(&self) -> Duration {
        Duration::from_millis(self.restricted_poll_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_values() {
        let config = WorkshopConfig::default();
        assert_eq!(config.controller_addr, "localhost:8000");
        assert_eq!(config.bays, 6);
        assert_eq!(config.mechanics, 3);
        assert_eq!(config.total_jobs(), 30);
        assert_eq!(config.duration_for(Category::Mechanical), 5);
        assert_eq!(config.duration_for(Category::Electrical), 3);
        assert_eq!(config.duration_for(Category::Bodywork), 1);
        assert_eq!(config.time_unit(), Duration::from_secs(1));
        assert_eq!(config.closed_poll(), Duration::from_secs(2));
        assert_eq!(config.restricted_poll(), Duration::from_millis(500));
        assert!(config.seed.is_none());
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            bays = 4
            mechanics = 4
            jobs_mechanical = 20
            seed = 42
        "#;
        let config: WorkshopConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.bays, 4);
        assert_eq!(config.mechanics, 4);
        assert_eq!(config.jobs_for(Category::Mechanical), 20);
        assert_eq!(config.jobs_for(Category::Bodywork), 10);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.jitter_ms, 500);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "controller_addr = \"127.0.0.1:9000\"\ntime_unit_ms = 10").unwrap();

        let config = WorkshopConfig::load_from(file.path()).unwrap();
        assert_eq!(config.controller_addr, "127.0.0.1:9000");
        assert_eq!(config.time_unit_ms, 10);
        assert_eq!(config.bays, 6);
    }

    #[test]
    fn validate_rejects_zero_capacity_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mechanics = 0").unwrap();

        let config = WorkshopConfig::load_from(file.path()).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, WorkshopError::Config(_)));
    }

    #[test]
    fn capacity_flags_repair_a_zero_in_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bays = 0\nmechanics = 0").unwrap();

        let mut config = WorkshopConfig::load(Some(file.path())).unwrap();
        config.override_capacity(Some(4), Some(2));
        config.validate().unwrap();
        assert_eq!(config.bays, 4);
        assert_eq!(config.mechanics, 2);
    }

    #[test]
    fn capacity_flags_left_out_keep_file_values() {
        let mut config = WorkshopConfig {
            bays: 5,
            ..Default::default()
        };
        config.override_capacity(None, Some(1));
        assert_eq!(config.bays, 5);
        assert_eq!(config.mechanics, 1);
    }

    #[test]
    fn load_from_reports_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bays = \"many\"").unwrap();

        let err = WorkshopConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, WorkshopError::Toml(_)));
    }

    #[test]
    fn load_falls_back_to_defaults() {
        // No workshop.toml in the test working directory.
        let config = WorkshopConfig::load(None).unwrap();
        assert_eq!(config.bays, 6);
        assert_eq!(config.mechanics, 3);
    }

    #[test]
    fn load_prefers_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bays = 2").unwrap();

        let config = WorkshopConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.bays, 2);
    }

    #[test]
    fn controller_override_wins_unless_empty() {
        let mut config = WorkshopConfig::default();
        config.apply_controller_override(Some(String::new()));
        assert_eq!(config.controller_addr, "localhost:8000");

        config.apply_controller_override(Some("10.0.0.2:8000".into()));
        assert_eq!(config.controller_addr, "10.0.0.2:8000");
    }

    #[test]
    fn validate_rejects_zero_time_unit() {
        let config = WorkshopConfig {
            time_unit_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
