//! Scrape runtime: environment config, the bounded blocking bridge and the
//! batch orchestrator that ties handlers, backend and storage together.

mod bridge;
mod config;
mod orchestrator;

pub use bridge::BlockingBridge;
pub use config::ScrapeConfig;
pub use orchestrator::{BatchOrchestrator, UNKNOWN_STAT};

pub const CRATE_NAME: &str = "gridiron-sync";
