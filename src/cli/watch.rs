use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use scorebridge_display_surface::HeadlessWindowHost;
use scorebridge_event_bus::BusEvent;
use scorebridge_scheduler::{metrics, SchedulerRuntime};
use scorebridge_state_store::OriginStorage;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::context::CliContext;
use crate::bridge::{audio_sink, page_session, surface_panel, Origin};
use crate::page::FilePage;

#[derive(Args, Clone, Debug)]
pub struct WatchArgs {
    /// HTML snapshot of the match page; rewrite it to simulate page updates
    #[arg(long, value_name = "FILE")]
    pub page: PathBuf,

    /// Open the display surface and print every score it renders
    #[arg(long)]
    pub show: bool,

    /// How often the page file and the settings store are checked for changes
    #[arg(long, default_value = "250ms", value_parser = humantime::parse_duration)]
    pub file_poll: Duration,

    /// Stop after this long instead of waiting for Ctrl-C
    #[arg(long, value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,
}

const MIN_FILE_POLL: Duration = Duration::from_millis(10);

pub async fn cmd_watch(args: WatchArgs, ctx: &CliContext) -> Result<()> {
    let config = ctx.config();
    let file_poll = args.file_poll.max(MIN_FILE_POLL);
    let origin = Origin::open(config);
    let page = FilePage::open(&args.page)
        .with_context(|| format!("Failed to open page {}", args.page.display()))?;
    let file_watcher = page.spawn_watcher(file_poll);
    let store_sync = spawn_store_sync(origin.storage.clone(), file_poll);
    let windows = HeadlessWindowHost::new();

    let session = page_session(config, &origin, page.clone(), windows, audio_sink(config))
        .context("Failed to build session")?;
    let runtime = SchedulerRuntime::new(session.clone());
    runtime.start().context("Failed to start scheduler")?;

    let mut panel_task = None;
    if args.show {
        match session.on_show_score() {
            Ok(state) => info!(?state, "display surface shown"),
            Err(err) => warn!(%err, "display surface unavailable"),
        }
        if let Some(window) = session.surface().window() {
            let panel = Arc::new(surface_panel(config, &origin, window));
            if let Err(err) = panel.load_controls() {
                warn!(%err, "surface controls not populated");
            }
            let mut subscription = panel.subscribe(config.scheduler.bus_capacity);
            panel_task = Some(tokio::spawn(async move {
                while let Some(delivery) = subscription.recv().await {
                    if panel.apply(&delivery) {
                        if let BusEvent::ScoreUpdate(payload) = &delivery.event {
                            println!("{}", payload.display_text());
                        }
                    }
                }
            }));
        }
    }

    match args.duration {
        Some(limit) => tokio::time::sleep(limit).await,
        None => tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?,
    }

    runtime.shutdown();
    file_watcher.abort();
    store_sync.abort();
    if let Some(task) = panel_task {
        task.abort();
    }

    let stats = metrics::snapshot();
    info!(
        extracted = stats.extracted,
        not_found = stats.not_found,
        changed = stats.changed,
        dropped = stats.dropped,
        reloads = stats.reloads,
        "watch finished"
    );
    if let Some(score) = session.last_score() {
        info!(%score, "last score");
    }
    Ok(())
}

/// Merges settings that other processes (`scorebridge settings set`) wrote to
/// the shared store file; the merge surfaces as ordinary storage changes.
fn spawn_store_sync(storage: OriginStorage, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let merged = storage.sync_from_disk();
            if !merged.is_empty() {
                info!(?merged, "settings changed outside this process");
            }
        }
    })
}
