//! SessionRuntime — dedicated session thread with channel-based dispatch.
//!
//! Owns the `PlayerSession` on a single thread, which is the serialization
//! the scheduler and state machine require: progress reports, collaborator
//! completions, and state reads all execute sequentially. External code
//! communicates via `SessionHandle` (wraps `mpsc::Sender<SessionCmd>`), which
//! is naturally Send+Sync. Side effects surface as `SessionEvent`s through a
//! callback; the collaborator performing the real work (network fetch, ad
//! render) answers by enqueuing a new command, never by touching state.

use crate::config::SessionConfig;
use crate::fsm_player::{AdFetcher, AdRenderer, PlaybackControl};
use crate::media::{AdBreak, MediaModel};
use crate::session::PlayerSession;
use std::sync::Arc;
use std::sync::mpsc;

// ── Commands & Events ────────────────────────────────────────────────────────

/// Commands sent to the session thread.
pub enum SessionCmd {
    Progress {
        position_millis: u64,
        duration_millis: u64,
    },
    AdMetadata(AdBreak),
    AdFinished,
    AdError,
    SetCuePoints(Vec<u64>),
    ClearCuePoints,
    EndSession,
    Shutdown,
}

/// Events emitted by the session thread back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Fetch ad metadata for this cue point and answer with `ad_metadata`
    /// (or `ad_error`).
    AdCallRequested { cue_point_millis: u64 },
    /// Render this creative and answer with `ad_finished` (or `ad_error`).
    AdStarted(MediaModel),
    /// Switch the visible source back to content.
    ContentResumed,
    /// Terminal: the session ended; no further events will follow commands.
    SessionEnded,
    /// A command was rejected (e.g. an unsorted replacement cue table).
    Error(String),
}

// ── Handle ───────────────────────────────────────────────────────────────────

/// Thread-safe handle for sending commands to the session runtime.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCmd>,
}

impl SessionHandle {
    pub fn progress(&self, position_millis: u64, duration_millis: u64) {
        let _ = self.tx.send(SessionCmd::Progress {
            position_millis,
            duration_millis,
        });
    }

    pub fn ad_metadata(&self, ad_break: AdBreak) {
        let _ = self.tx.send(SessionCmd::AdMetadata(ad_break));
    }

    pub fn ad_finished(&self) {
        let _ = self.tx.send(SessionCmd::AdFinished);
    }

    pub fn ad_error(&self) {
        let _ = self.tx.send(SessionCmd::AdError);
    }

    pub fn set_cue_points(&self, points: Vec<u64>) {
        let _ = self.tx.send(SessionCmd::SetCuePoints(points));
    }

    pub fn clear_cue_points(&self) {
        let _ = self.tx.send(SessionCmd::ClearCuePoints);
    }

    pub fn end_session(&self) {
        let _ = self.tx.send(SessionCmd::EndSession);
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(SessionCmd::Shutdown);
    }
}

// ── Internal collaborators ───────────────────────────────────────────────────

// The runtime wires the machine's side-effect dispatches to the event
// callback, so external collaborators see plain events and answer with
// commands.

struct EventBridge {
    on_event: Arc<dyn Fn(SessionEvent) + Send + Sync>,
}

impl AdFetcher for EventBridge {
    fn fetch_ad_metadata(&self, cue_point_millis: u64) {
        (self.on_event)(SessionEvent::AdCallRequested { cue_point_millis });
    }
}

impl AdRenderer for EventBridge {
    fn start(&self, ad: &MediaModel) {
        (self.on_event)(SessionEvent::AdStarted(ad.clone()));
    }
}

impl PlaybackControl for EventBridge {
    fn resume_content(&self) {
        (self.on_event)(SessionEvent::ContentResumed);
    }
}

// ── Runtime ──────────────────────────────────────────────────────────────────

/// Spawn a session runtime on a dedicated thread.
///
/// Fails fast on an invalid config. `on_event` is called from the session
/// thread whenever a collaborator-facing side effect fires.
pub fn spawn_session_runtime<F>(
    config: SessionConfig,
    content: MediaModel,
    on_event: F,
) -> Result<SessionHandle, String>
where
    F: Fn(SessionEvent) + Send + Sync + 'static,
{
    config.validate()?;

    let (tx, rx) = mpsc::channel::<SessionCmd>();
    let on_event: Arc<dyn Fn(SessionEvent) + Send + Sync> = Arc::new(on_event);

    std::thread::Builder::new()
        .name("session-runtime".into())
        .spawn(move || {
            session_thread_loop(rx, config, content, on_event);
        })
        .map_err(|e| format!("Failed to spawn session-runtime thread: {}", e))?;

    Ok(SessionHandle { tx })
}

/// Main loop for the session thread. Owns the PlayerSession.
fn session_thread_loop(
    rx: mpsc::Receiver<SessionCmd>,
    config: SessionConfig,
    content: MediaModel,
    on_event: Arc<dyn Fn(SessionEvent) + Send + Sync>,
) {
    // Config was validated before spawning.
    let mut session = match PlayerSession::new(&config, content) {
        Ok(s) => s,
        Err(e) => {
            on_event(SessionEvent::Error(e));
            return;
        }
    };
    session.set_fetcher(Box::new(EventBridge {
        on_event: on_event.clone(),
    }));
    session.set_renderer(Box::new(EventBridge {
        on_event: on_event.clone(),
    }));
    session.set_playback_control(Box::new(EventBridge {
        on_event: on_event.clone(),
    }));

    loop {
        match rx.recv() {
            Ok(cmd) => match cmd {
                SessionCmd::Progress {
                    position_millis,
                    duration_millis,
                } => {
                    session.on_progress(position_millis, duration_millis);
                }
                SessionCmd::AdMetadata(ad_break) => {
                    session.on_ad_metadata(ad_break);
                }
                SessionCmd::AdFinished => {
                    session.on_ad_finished();
                }
                SessionCmd::AdError => {
                    session.on_ad_error();
                }
                SessionCmd::SetCuePoints(points) => {
                    if let Err(e) = session.set_cue_points(&points) {
                        on_event(SessionEvent::Error(e));
                    }
                }
                SessionCmd::ClearCuePoints => {
                    session.clear_cue_points();
                }
                SessionCmd::EndSession => {
                    session.end_session();
                    on_event(SessionEvent::SessionEnded);
                }
                SessionCmd::Shutdown => break,
            },

            // All senders dropped — shut down.
            Err(mpsc::RecvError) => break,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    fn config(cues: &[u64]) -> SessionConfig {
        SessionConfig {
            cue_points: cues.to_vec(),
            networking_ahead_millis: 2_000,
            tolerance_window_millis: 1_500,
        }
    }

    #[test]
    fn handle_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SessionHandle>();
    }

    #[test]
    fn invalid_config_fails_fast() {
        let result = spawn_session_runtime(
            config(&[9_000, 3_000]),
            MediaModel::content("F", "u"),
            |_| {},
        );
        assert!(result.is_err());
    }

    #[test]
    fn progress_produces_ad_call_event() {
        let events: Arc<Mutex<Vec<SessionEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let events_clone = events.clone();

        let handle = spawn_session_runtime(
            config(&[10_000]),
            MediaModel::content("Feature", "u"),
            move |evt| {
                events_clone.lock().unwrap().push(evt);
            },
        )
        .unwrap();

        handle.progress(8_200, 100_000);
        std::thread::sleep(Duration::from_millis(100));

        let evts = events.lock().unwrap();
        assert!(
            evts.contains(&SessionEvent::AdCallRequested {
                cue_point_millis: 10_000
            }),
            "Expected AdCallRequested, got: {:?}",
            *evts
        );
        drop(evts);
        handle.shutdown();
    }

    #[test]
    fn rejected_cue_table_emits_error_event() {
        let events: Arc<Mutex<Vec<SessionEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let events_clone = events.clone();

        let handle = spawn_session_runtime(
            config(&[]),
            MediaModel::content("Feature", "u"),
            move |evt| {
                events_clone.lock().unwrap().push(evt);
            },
        )
        .unwrap();

        handle.set_cue_points(vec![5_000, 5_000]);
        std::thread::sleep(Duration::from_millis(100));

        let evts = events.lock().unwrap();
        assert!(
            evts.iter().any(|e| matches!(e, SessionEvent::Error(_))),
            "Expected Error event, got: {:?}",
            *evts
        );
        drop(evts);
        handle.shutdown();
    }

    #[test]
    fn end_session_emits_terminal_event() {
        let events: Arc<Mutex<Vec<SessionEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let events_clone = events.clone();

        let handle = spawn_session_runtime(
            config(&[10_000]),
            MediaModel::content("Feature", "u"),
            move |evt| {
                events_clone.lock().unwrap().push(evt);
            },
        )
        .unwrap();

        handle.end_session();
        std::thread::sleep(Duration::from_millis(100));

        assert!(
            events
                .lock()
                .unwrap()
                .contains(&SessionEvent::SessionEnded)
        );
        handle.shutdown();
    }
}
