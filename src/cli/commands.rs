use clap::Subcommand;

use super::probe::ProbeArgs;
use super::settings::SettingsArgs;
use super::watch::WatchArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Mirror the score of a page snapshot file until interrupted
    Watch(WatchArgs),

    /// Resolve the score of a page snapshot once
    Probe(ProbeArgs),

    /// Show or change the persisted settings
    Settings(SettingsArgs),

    /// Show build and configuration information
    Info,
}
