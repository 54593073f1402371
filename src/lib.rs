//! ScoreBridge library
//!
//! Exposes the CLI wiring for integration testing

pub mod bridge;
pub mod cli;
pub mod config;
pub mod page;

pub use bridge::Origin;
pub use config::BridgeConfig;
pub use page::FilePage;
