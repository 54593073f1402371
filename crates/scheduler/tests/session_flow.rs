use std::sync::Arc;
use std::time::Duration;

use scorebridge_core_types::{ContextId, Settings};
use scorebridge_display_surface::document::SCORE_DISPLAY_ID;
use scorebridge_display_surface::{
    HeadlessWindowHost, SurfaceConfig, SurfaceController, SurfaceDocument, SurfaceState,
};
use scorebridge_event_bus::{BusEvent, ChannelHub, CrossContextBus};
use scorebridge_scheduler::{
    ExtractionOutcome, MemoryPage, RecordingSink, SchedulerConfig, SchedulerRuntime, Session,
    SessionParts, SoundNotifier, Trigger,
};
use scorebridge_selector::{ObserveTarget, ScoreResolver, SelectorStrategy};
use scorebridge_state_store::{OriginStorage, SettingsStore, StorageKeys};
use tokio::time::sleep;

fn score_page(a: &str, b: &str) -> String {
    format!(
        r#"<html><body>
        <div class="FactionsDetails__Container-abc">
          <h3 class="FactionsDetails__FactionScore-x1">{a}</h3>
          <h3 class="FactionsDetails__FactionScore-x2">{b}</h3>
        </div></body></html>"#
    )
}

fn settings(origin: &OriginStorage, context: &ContextId) -> SettingsStore {
    SettingsStore::new(
        Arc::new(origin.attach(context.clone())),
        StorageKeys::default(),
        Settings::default(),
    )
}

struct Harness {
    origin: OriginStorage,
    hub: Arc<ChannelHub>,
    page: Arc<MemoryPage>,
    host: Arc<HeadlessWindowHost>,
    sink: Arc<RecordingSink>,
    session: Arc<Session>,
}

fn harness_on(origin: OriginStorage, html: String) -> Harness {
    let hub = ChannelHub::new("faceit-score", 64);
    let page = Arc::new(MemoryPage::new(html));
    let host = HeadlessWindowHost::new();
    let sink = RecordingSink::new();
    let context = ContextId::named("page");
    let store = settings(&origin, &context);
    let document = SurfaceDocument::new(StorageKeys::default(), Some("faceit-score".into())).render();
    let session = Session::new(SessionParts {
        page: page.clone(),
        resolver: ScoreResolver::new(&SelectorStrategy::default()).unwrap(),
        settings: store.clone(),
        bus: CrossContextBus::standard(context, Some(&hub), store),
        surface: SurfaceController::new(host.clone(), SurfaceConfig::default(), document),
        sound: SoundNotifier::new(sink.clone()),
        config: SchedulerConfig::default(),
    });
    Harness {
        origin,
        hub,
        page,
        host,
        sink,
        session,
    }
}

fn harness(html: String) -> Harness {
    harness_on(OriginStorage::in_memory(), html)
}

#[tokio::test(start_paused = true)]
async fn repeated_score_sounds_once_on_real_change() {
    let h = harness(score_page("5", "3"));
    h.session.initialize();
    h.session.on_show_score().unwrap();

    let first = h.session.extract_and_propagate(Trigger::Manual).await;
    assert!(matches!(first, ExtractionOutcome::Extracted { changed: true, sounded: false, .. }));

    let repeat = h.session.extract_and_propagate(Trigger::Manual).await;
    assert!(matches!(repeat, ExtractionOutcome::Extracted { changed: false, sounded: false, .. }));

    h.page.set_html(score_page("6", "3"));
    let change = h.session.extract_and_propagate(Trigger::Manual).await;
    assert!(change.sounded());
    assert_eq!(h.sink.audible_plays(), 1);
    assert_eq!(h.session.last_score().as_deref(), Some("6-3"));
}

#[tokio::test(start_paused = true)]
async fn sound_disabled_or_locked_stays_silent() {
    let h = harness(score_page("1", "0"));
    h.session.initialize();
    h.session.extract_and_propagate(Trigger::Manual).await;
    h.page.set_html(score_page("2", "0"));
    let locked = h.session.extract_and_propagate(Trigger::Manual).await;
    assert!(matches!(locked, ExtractionOutcome::Extracted { changed: true, sounded: false, .. }));

    h.session.sound().unlock();
    h.session.settings().set_sound_enabled(false).unwrap();
    h.page.set_html(score_page("3", "0"));
    let disabled = h.session.extract_and_propagate(Trigger::Manual).await;
    assert!(!disabled.sounded());
    assert_eq!(h.sink.audible_plays(), 0);
    assert_eq!(h.session.last_score().as_deref(), Some("3-0"));
}

#[tokio::test(start_paused = true)]
async fn extraction_writes_store_and_renders_live_surface() {
    let h = harness(score_page("7", "4"));
    h.session.initialize();
    h.session.settings().set_font_size_raw("72").unwrap();
    assert_eq!(h.session.on_show_score().unwrap(), SurfaceState::OpenReady);

    let outcome = h.session.extract_and_propagate(Trigger::Manual).await;
    assert!(matches!(outcome, ExtractionOutcome::Extracted { rendered: true, .. }));

    let stored = h.session.settings().last_payload().unwrap();
    assert_eq!(stored.score_key(), "7-4");
    assert_eq!(stored.font_size_px, 72);

    let window = h.host.window("ScoreWindow").unwrap();
    assert_eq!(window.text_of(SCORE_DISPLAY_ID).as_deref(), Some("7 - 4"));
    assert_eq!(window.font_size_of(SCORE_DISPLAY_ID), Some(72));
}

#[tokio::test(start_paused = true)]
async fn half_score_is_not_found() {
    let h = harness(
        r#"<html><body><h3 class="FactionsDetails__FactionScore-x1">5</h3></body></html>"#.into(),
    );
    let outcome = h.session.extract_and_propagate(Trigger::Manual).await;
    assert_eq!(outcome, ExtractionOutcome::NotFound);
    assert!(h.session.settings().last_payload().is_none());
}

#[tokio::test(start_paused = true)]
async fn startup_seeds_defaults_and_arms_reload() {
    let h = harness(score_page("0", "0"));
    let runtime = SchedulerRuntime::new(h.session.clone());
    runtime.start().unwrap();

    assert_eq!(
        h.session.settings().settings(),
        Settings {
            font_size_px: 60,
            sound_enabled: true,
            auto_reload_enabled: true,
            auto_reload_seconds: 600,
        }
    );
    assert!(h.session.reload_timer_armed());
    assert!(h.session.update_timer_armed());
    assert_eq!(h.page.observed_targets(), vec![ObserveTarget::Container(
        r#"[class*="FactionsDetails__Container"]"#.into()
    )]);

    sleep(Duration::from_millis(50)).await;
    assert_eq!(h.session.last_score().as_deref(), Some("0-0"));
    runtime.shutdown();
    assert!(!h.session.update_timer_armed());
}

#[tokio::test(start_paused = true)]
async fn existing_preference_survives_startup() {
    let origin = OriginStorage::in_memory();
    settings(&origin, &ContextId::named("earlier"))
        .set_font_size_raw("80")
        .unwrap();
    let h = harness_on(origin, score_page("0", "0"));
    let runtime = SchedulerRuntime::new(h.session.clone());
    runtime.start().unwrap();

    assert_eq!(h.session.settings().font_size(), 80);
    assert_eq!(h.origin.snapshot().get("faceitScoreFontSize").map(String::as_str), Some("80"));
    runtime.shutdown();
}

#[tokio::test(start_paused = true)]
async fn runtime_cannot_start_twice() {
    let h = harness(score_page("0", "0"));
    let runtime = SchedulerRuntime::new(h.session.clone());
    runtime.start().unwrap();
    assert!(SchedulerRuntime::new(h.session.clone()).start().is_err());
    runtime.shutdown();
}

#[tokio::test(start_paused = true)]
async fn mutation_triggers_extraction_before_next_poll() {
    let h = harness(score_page("1", "1"));
    let runtime = SchedulerRuntime::new(h.session.clone());
    runtime.start().unwrap();
    sleep(Duration::from_millis(110)).await;
    assert_eq!(h.session.last_score().as_deref(), Some("1-1"));

    h.page.set_html(score_page("2", "1"));
    sleep(Duration::from_millis(5)).await;
    assert_eq!(h.session.last_score().as_deref(), Some("2-1"));
    runtime.shutdown();
}

#[tokio::test(start_paused = true)]
async fn polling_continues_while_hidden() {
    let h = harness(score_page("3", "3"));
    let runtime = SchedulerRuntime::new(h.session.clone());
    runtime.start().unwrap();
    h.page.set_visible(false);
    sleep(Duration::from_millis(10)).await;
    assert!(h.session.update_timer_armed());

    h.page.set_html_unobserved(score_page("4", "3"));
    sleep(Duration::from_millis(250)).await;
    assert_eq!(h.session.last_score().as_deref(), Some("4-3"));
    runtime.shutdown();
}

#[tokio::test(start_paused = true)]
async fn settings_change_from_other_context_recomputes_reload() {
    let h = harness(score_page("0", "0"));
    let runtime = SchedulerRuntime::new(h.session.clone());
    runtime.start().unwrap();
    assert!(h.session.reload_timer_armed());

    let popup = ContextId::named("popup");
    let popup_settings = settings(&h.origin, &popup);
    let popup_bus = CrossContextBus::standard(popup, Some(&h.hub), popup_settings.clone());

    popup_settings.set_auto_reload_seconds_raw("3").unwrap();
    popup_bus.publish(BusEvent::SettingsChanged).await;
    sleep(Duration::from_millis(20)).await;
    assert!(!h.session.reload_timer_armed());

    popup_settings.set_auto_reload_seconds_raw("30").unwrap();
    popup_bus.publish(BusEvent::SettingsChanged).await;
    sleep(Duration::from_millis(20)).await;
    assert!(h.session.reload_timer_armed());
    runtime.shutdown();
}

#[tokio::test(start_paused = true)]
async fn reload_timer_fires_at_configured_interval() {
    let h = harness(score_page("0", "0"));
    h.session.initialize();
    h.session.settings().set_auto_reload_seconds_raw("10").unwrap();
    assert!(h.session.apply_auto_reload());

    sleep(Duration::from_millis(10_050)).await;
    assert_eq!(h.page.reloads(), 1);
    sleep(Duration::from_secs(10)).await;
    assert_eq!(h.page.reloads(), 2);

    h.session.settings().set_auto_reload_enabled(false).unwrap();
    assert!(!h.session.apply_auto_reload());
    sleep(Duration::from_secs(30)).await;
    assert_eq!(h.page.reloads(), 2);
}

#[tokio::test(start_paused = true)]
async fn visibility_change_extracts_before_next_poll() {
    let h = harness(score_page("3", "3"));
    let runtime = SchedulerRuntime::new(h.session.clone());
    runtime.start().unwrap();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(h.session.last_score().as_deref(), Some("3-3"));

    h.page.set_html_unobserved(score_page("5", "3"));
    h.page.set_visible(false);
    sleep(Duration::from_millis(5)).await;
    assert_eq!(h.session.last_score().as_deref(), Some("5-3"));
    runtime.shutdown();
}

#[tokio::test(start_paused = true)]
async fn oversized_reload_interval_stays_disarmed() {
    let h = harness(score_page("0", "0"));
    h.session.initialize();
    h.session
        .settings()
        .set_auto_reload_seconds_raw("99999999999999999999")
        .unwrap();
    assert!(!h.session.apply_auto_reload());
    assert!(!h.session.reload_timer_armed());

    h.session.settings().set_auto_reload_seconds_raw("5.5").unwrap();
    assert!(h.session.apply_auto_reload());
    sleep(Duration::from_millis(5_550)).await;
    assert_eq!(h.page.reloads(), 1);
}
