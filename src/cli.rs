//! Workshop command line, built on clap.
//!
//! Subcommands [`Command`] (run, simulate) plus global overrides
//! (--config, --bays, --mechanics, --verbose, --json).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::state_machine::AdmissionState;

/// Repair workshop simulator with priority-ordered admission.
#[derive(Debug, Parser)]
#[command(name = "workshop", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a TOML config file (defaults to ./workshop.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the number of bays.
    #[arg(long, global = true)]
    pub bays: Option<usize>,

    /// Override the number of mechanics.
    #[arg(long, global = true)]
    pub mechanics: Option<usize>,

    /// Print the run report as JSON when the run ends.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Enable debug diagnostics on stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect to the controller and start on its first order.
    Run {
        /// Controller address, overriding config and environment.
        #[arg(long)]
        addr: Option<String>,
    },

    /// Run without a controller under a fixed, fully permissive admission code.
    Simulate {
        /// Admission code to hold for the whole run (4, 5 or 6).
        #[arg(long, default_value = "4", value_parser = parse_state)]
        state: AdmissionState,
    },
}

// Without a controller nothing can change the state later, so only codes
// that admit every category make sense here.
fn parse_state(raw: &str) -> Result<AdmissionState, String> {
    let code: u8 = raw
        .parse()
        .map_err(|_| format!("`{raw}` is not a single digit"))?;
    match AdmissionState::from_code(code) {
        Some(state) if state.admits_all() => Ok(state),
        Some(state) => Err(format!("{state} would keep some jobs out forever")),
        None if code <= 9 => Err(format!("code {code} is reserved")),
        None => Err(format!("code {code} is out of range")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_run_subcommand() {
        let cli = Cli::parse_from(["workshop", "run", "--addr", "127.0.0.1:8000"]);
        match cli.command {
            Command::Run { addr } => assert_eq!(addr.as_deref(), Some("127.0.0.1:8000")),
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "workshop",
            "--bays",
            "4",
            "--mechanics",
            "4",
            "--verbose",
            "--json",
            "simulate",
        ]);
        assert!(cli.verbose);
        assert!(cli.json);
        assert_eq!(cli.bays, Some(4));
        assert_eq!(cli.mechanics, Some(4));
        assert!(matches!(
            cli.command,
            Command::Simulate {
                state: AdmissionState::PriorityMechanical
            }
        ));
    }

    #[test]
    fn simulate_accepts_only_permissive_codes() {
        assert!(Cli::try_parse_from(["workshop", "simulate", "--state", "7"]).is_err());
        assert!(Cli::try_parse_from(["workshop", "simulate", "--state", "12"]).is_err());
        assert!(Cli::try_parse_from(["workshop", "simulate", "--state", "9"]).is_err());
        assert!(Cli::try_parse_from(["workshop", "simulate", "--state", "2"]).is_err());
        assert!(Cli::try_parse_from(["workshop", "simulate", "--state", "0"]).is_err());
        assert!(Cli::try_parse_from(["workshop", "simulate", "--state", "x"]).is_err());
        let cli = Cli::try_parse_from(["workshop", "simulate", "--state", "6"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Simulate {
                state: AdmissionState::PriorityBodywork
            }
        ));
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
