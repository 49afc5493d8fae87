//! The worker runtime: pipeline dispatcher, stage processors, scrape
//! runner, queue intake, model-backed agents, and the poll-loop binary's
//! building blocks.

pub mod admin;
pub mod ai;
pub mod context;
pub mod dispatcher;
pub mod intake;
pub mod processors;
pub mod runner;
pub mod worker;

pub use context::ProcessorContext;
pub use dispatcher::Dispatcher;
pub use intake::{IntakeStats, ScraperIntake};
pub use runner::{RunStats, ScrapeRunner, TRANSIENT_FAILURE_THRESHOLD, ZERO_JOBS_RECOVERY_THRESHOLD};
pub use worker::{Worker, WorkerState};
