//! # workshop
//!
//! Simulates a repair workshop: cars arrive in bursts, wait until the
//! controller's admission state lets their category in, then pass through
//! four timed phases while holding a bay (whole visit) and a mechanic
//! (repair only).
//!
//! ```text
//!  controller ──► AdmissionCell ◄── polled by ──┐
//!                                               │
//!  Orchestrator ──spawns──► Pipeline::run(job) ─┴─► bays: ResourceManager ──► mechanics: ResourceManager
//!        │                        │
//!        └── waits for all ◄──────┴──► Journal ──► ShopConsole
//! ```
//!
//! Both resource managers grant slots strictly by priority, then job id,
//! from a single control loop that owns the queue.

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod journal;
pub mod orchestrator;
pub mod pipeline;
pub mod resource;
pub mod state_machine;
pub mod ui;

pub use config::WorkshopConfig;
pub use error::WorkshopError;
pub use journal::{Journal, Observe, PhaseEvent};
pub use orchestrator::{Orchestrator, RunReport};
pub use pipeline::{Pipeline, Timing};
pub use resource::{Permit, ResourceManager, Snapshot};
