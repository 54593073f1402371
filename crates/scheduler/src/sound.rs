use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::SchedulerError;

/// Audio playback primitive holding a single notification clip.
pub trait AudioSink: Send + Sync {
    fn play(&self, muted: bool) -> Result<(), SchedulerError>;
    fn pause(&self);
    /// Seeks back to the start of the clip.
    fn rewind(&self);
}

/// Notification sound gated behind a one-time unlock.
///
/// Until [`Self::unlock`] succeeds every [`Self::notify`] is suppressed,
/// whatever the sound setting says.
pub struct SoundNotifier {
    sink: Arc<dyn AudioSink>,
    unlocked: AtomicBool,
}

impl SoundNotifier {
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self {
            sink,
            unlocked: AtomicBool::new(false),
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked.load(Ordering::SeqCst)
    }

    /// Plays the clip muted and pauses it at once; remembered on success.
    pub fn unlock(&self) -> bool {
        if self.is_unlocked() {
            return true;
        }
        match self.sink.play(true) {
            Ok(()) => {
                self.sink.pause();
                self.unlocked.store(true, Ordering::SeqCst);
                info!("notification sound unlocked");
                true
            }
            Err(err) => {
                debug!(%err, "sound unlock rejected");
                false
            }
        }
    }

    pub fn notify(&self) -> bool {
        if !self.is_unlocked() {
            debug!("sound suppressed until unlocked");
            return false;
        }
        self.sink.rewind();
        match self.sink.play(false) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "notification sound failed");
                false
            }
        }
    }
}

/// Sink for hosts without audio output.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentSink;

impl AudioSink for SilentSink {
    fn play(&self, _muted: bool) -> Result<(), SchedulerError> {
        Ok(())
    }

    fn pause(&self) {}

    fn rewind(&self) {}
}

/// Counts playback calls; can be told to reject playback like an autoplay
/// policy would.
#[derive(Debug, Default)]
pub struct RecordingSink {
    audible: AtomicUsize,
    muted: AtomicUsize,
    pauses: AtomicUsize,
    reject: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reject_playback(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub fn audible_plays(&self) -> usize {
        self.audible.load(Ordering::SeqCst)
    }

    pub fn muted_plays(&self) -> usize {
        self.muted.load(Ordering::SeqCst)
    }

    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }
}

impl AudioSink for RecordingSink {
    fn play(&self, muted: bool) -> Result<(), SchedulerError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(SchedulerError::Audio("autoplay blocked".into()));
        }
        let counter = if muted { &self.muted } else { &self.audible };
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn rewind(&self) {}
}

#[cfg(feature = "rodio")]
pub use self::device::RodioSink;

#[cfg(feature = "rodio")]
mod device {
    use std::io::Cursor;
    use std::path::Path;
    use std::sync::mpsc::{self, Sender};
    use std::thread;

    use rodio::{Decoder, OutputStream, Sink};
    use tracing::{debug, warn};

    use super::AudioSink;
    use crate::SchedulerError;

    enum Command {
        Play { muted: bool },
        Pause,
    }

    /// Plays a clip through the default output device on a dedicated thread.
    pub struct RodioSink {
        tx: Sender<Command>,
    }

    impl RodioSink {
        pub fn open(path: &Path) -> Result<Self, SchedulerError> {
            let clip = std::fs::read(path)
                .map_err(|err| SchedulerError::Audio(format!("{}: {err}", path.display())))?;
            let (tx, rx) = mpsc::channel::<Command>();
            thread::spawn(move || {
                let mut output = OutputStream::try_default().ok();
                if output.is_none() {
                    warn!("audio output unavailable; notification sound disabled");
                }
                let mut current: Option<Sink> = None;
                while let Ok(command) = rx.recv() {
                    match command {
                        Command::Pause => {
                            if let Some(sink) = current.as_ref() {
                                sink.pause();
                            }
                        }
                        Command::Play { muted } => {
                            if output.is_none() {
                                output = OutputStream::try_default().ok();
                            }
                            let Some((_, handle)) = output.as_ref() else {
                                continue;
                            };
                            let decoder = match Decoder::new(Cursor::new(clip.clone())) {
                                Ok(decoder) => decoder,
                                Err(err) => {
                                    debug!(?err, "failed decoding notification clip");
                                    continue;
                                }
                            };
                            match Sink::try_new(handle) {
                                Ok(sink) => {
                                    sink.set_volume(if muted { 0.0 } else { 1.0 });
                                    sink.append(decoder);
                                    current = Some(sink);
                                }
                                Err(err) => {
                                    warn!(?err, "failed to create audio sink");
                                    output = None;
                                }
                            }
                        }
                    }
                }
            });
            Ok(Self { tx })
        }
    }

    impl AudioSink for RodioSink {
        fn play(&self, muted: bool) -> Result<(), SchedulerError> {
            self.tx
                .send(Command::Play { muted })
                .map_err(|_| SchedulerError::Audio("audio thread stopped".into()))
        }

        fn pause(&self) {
            let _ = self.tx.send(Command::Pause);
        }

        // Every play starts a fresh sink from the beginning of the clip.
        fn rewind(&self) {}
    }
}
