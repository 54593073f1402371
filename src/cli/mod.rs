pub mod app;
pub mod commands;
pub mod context;
pub mod env;
pub mod info;
pub mod probe;
pub mod runtime;
pub mod settings;
pub mod watch;

pub use probe::{cmd_probe, ProbeArgs};
pub use settings::{cmd_settings, SettingsArgs};
pub use watch::{cmd_watch, WatchArgs};
