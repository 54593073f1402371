use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use scorebridge_core_types::ContextId;
use scorebridge_state_store::SettingsStore;
use serde_json::json;

use super::context::CliContext;
use crate::bridge::Origin;

#[derive(Args, Clone, Debug)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub action: SettingsAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum SettingsAction {
    /// Print the effective settings and the last broadcast score
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change one or more settings
    Set(SetArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct SetArgs {
    /// Score font size in pixels; empty restores the default
    #[arg(long)]
    pub font_size: Option<String>,

    #[arg(long, value_enum)]
    pub sound: Option<Toggle>,

    #[arg(long, value_enum)]
    pub auto_reload: Option<Toggle>,

    /// Reload interval in seconds; empty disables reloading
    #[arg(long)]
    pub auto_reload_seconds: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    fn enabled(self) -> bool {
        self == Toggle::On
    }
}

pub async fn cmd_settings(args: SettingsArgs, ctx: &CliContext) -> Result<()> {
    let config = ctx.config();
    let origin = Origin::open(config);
    let settings = origin.settings(config, &ContextId::named("cli"));
    settings.seed_defaults();

    match args.action {
        SettingsAction::Show { json } => show(&settings, json),
        SettingsAction::Set(set) => {
            apply(&settings, &set)?;
            show(&settings, false)
        }
    }
}

pub fn apply(settings: &SettingsStore, set: &SetArgs) -> Result<()> {
    if let Some(raw) = &set.font_size {
        settings
            .set_font_size_raw(raw)
            .context("Failed to store font size")?;
    }
    if let Some(toggle) = set.sound {
        settings
            .set_sound_enabled(toggle.enabled())
            .context("Failed to store sound flag")?;
    }
    if let Some(toggle) = set.auto_reload {
        settings
            .set_auto_reload_enabled(toggle.enabled())
            .context("Failed to store auto-reload flag")?;
    }
    if let Some(raw) = &set.auto_reload_seconds {
        settings
            .set_auto_reload_seconds_raw(raw)
            .context("Failed to store auto-reload interval")?;
    }
    Ok(())
}

fn show(settings: &SettingsStore, as_json: bool) -> Result<()> {
    let current = settings.settings();
    let last = settings.last_payload();

    if as_json {
        let value = json!({
            "settings": current,
            "last_score": last,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let flag = |on: bool| if on { "on" } else { "off" };
    println!("font size:    {}px", current.font_size_px);
    println!("sound:        {}", flag(current.sound_enabled));
    println!(
        "auto reload:  {} ({}s)",
        flag(current.auto_reload_enabled),
        current.auto_reload_seconds
    );
    match last {
        Some(payload) => {
            let at = chrono::DateTime::from_timestamp_millis(payload.timestamp_ms)
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "unknown".into());
            println!("last score:   {} (at {at})", payload.display_text());
        }
        None => println!("last score:   none"),
    }
    Ok(())
}
