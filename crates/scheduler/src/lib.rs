//! Poll/observe scheduler.
//!
//! Three trigger sources (a fixed-interval poll, page mutations and
//! visibility changes) feed one request queue drained by a single worker, so
//! at most one extraction runs at a time. An independent timer applies the
//! auto-reload policy, re-derived from the store whenever settings change.

pub mod error;
pub mod metrics;
pub mod model;
pub mod page;
pub mod reload;
pub mod runtime;
pub mod session;
pub mod sound;
pub mod timer;

pub use error::SchedulerError;
pub use model::{ExtractionOutcome, SchedulerConfig, Trigger};
pub use page::{MemoryPage, MutationKind, MutationRecord, PageHost};
pub use reload::AutoReloadPolicy;
pub use runtime::SchedulerRuntime;
pub use session::{ExtractionRequester, Session, SessionParts};
pub use sound::{AudioSink, RecordingSink, SilentSink, SoundNotifier};
#[cfg(feature = "rodio")]
pub use sound::RodioSink;
pub use timer::TimerSlot;
