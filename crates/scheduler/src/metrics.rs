use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
struct Counters {
    requested: AtomicU64,
    dropped: AtomicU64,
    extracted: AtomicU64,
    not_found: AtomicU64,
    skipped: AtomicU64,
    changed: AtomicU64,
    sounded: AtomicU64,
    rendered: AtomicU64,
    reloads: AtomicU64,
}

static COUNTERS: Lazy<Counters> = Lazy::new(Counters::default);

fn increment(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

pub fn record_requested() {
    increment(&COUNTERS.requested);
}

pub fn record_dropped() {
    increment(&COUNTERS.dropped);
}

pub fn record_extracted() {
    increment(&COUNTERS.extracted);
}

pub fn record_not_found() {
    increment(&COUNTERS.not_found);
}

pub fn record_skipped() {
    increment(&COUNTERS.skipped);
}

pub fn record_changed() {
    increment(&COUNTERS.changed);
}

pub fn record_sounded() {
    increment(&COUNTERS.sounded);
}

pub fn record_rendered() {
    increment(&COUNTERS.rendered);
}

pub fn record_reload() {
    increment(&COUNTERS.reloads);
}

/// Process-wide counters; shared by every session in the process.
#[derive(Clone, Debug, Default)]
pub struct SchedulerMetricsSnapshot {
    pub requested: u64,
    pub dropped: u64,
    pub extracted: u64,
    pub not_found: u64,
    pub skipped: u64,
    pub changed: u64,
    pub sounded: u64,
    pub rendered: u64,
    pub reloads: u64,
}

pub fn snapshot() -> SchedulerMetricsSnapshot {
    SchedulerMetricsSnapshot {
        requested: COUNTERS.requested.load(Ordering::Relaxed),
        dropped: COUNTERS.dropped.load(Ordering::Relaxed),
        extracted: COUNTERS.extracted.load(Ordering::Relaxed),
        not_found: COUNTERS.not_found.load(Ordering::Relaxed),
        skipped: COUNTERS.skipped.load(Ordering::Relaxed),
        changed: COUNTERS.changed.load(Ordering::Relaxed),
        sounded: COUNTERS.sounded.load(Ordering::Relaxed),
        rendered: COUNTERS.rendered.load(Ordering::Relaxed),
        reloads: COUNTERS.reloads.load(Ordering::Relaxed),
    }
}
