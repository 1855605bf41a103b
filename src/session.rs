//! PlayerSession — facade for one playback session.
//!
//! Owns the cue monitor and the state machine, wires scheduler signals to
//! FSM inputs, applies the cue-consumption policy, and keeps a bounded log
//! of everything it decided. All entry points must be called from one
//! thread; `session_runtime` provides that serialization when callers live
//! on several threads.

use crate::config::SessionConfig;
use crate::cue_monitor::{CuePointMonitor, ScheduleSignal};
use crate::fsm_player::{AdFetcher, AdRenderer, FsmPlayer, PlaybackControl, PlayerUi};
use crate::media::{AdBreak, MediaModel};
use crate::state::{Input, StateKind};
use chrono::Local;
use serde::Serialize;
use std::collections::VecDeque;

// ── Log buffer ──────────────────────────────────────────────────────────────

const LOG_BUFFER_MAX: usize = 500;

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub message: String,
}

/// Bounded in-memory log of scheduling decisions, for UI status panes and
/// post-session inspection.
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
}

impl LogBuffer {
    pub fn new() -> Self {
        LogBuffer {
            entries: VecDeque::new(),
        }
    }

    pub fn push(&mut self, level: &str, message: String) {
        let timestamp = Local::now().format("%H:%M:%S").to_string();
        self.entries.push_back(LogEntry {
            timestamp,
            level: level.to_string(),
            message,
        });
        while self.entries.len() > LOG_BUFFER_MAX {
            self.entries.pop_front();
        }
    }

    pub fn get(&self, since_index: usize) -> Vec<LogEntry> {
        self.entries.iter().skip(since_index).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ── Session ─────────────────────────────────────────────────────────────────

pub struct PlayerSession {
    monitor: CuePointMonitor,
    fsm: FsmPlayer,
    log: LogBuffer,
}

impl PlayerSession {
    /// Build a session from a validated config and the content descriptor.
    pub fn new(config: &SessionConfig, content: MediaModel) -> Result<Self, String> {
        config.validate()?;
        let mut monitor = CuePointMonitor::new(
            config.networking_ahead_millis,
            config.tolerance_window_millis,
        );
        monitor.set_cue_points(&config.cue_points)?;
        Ok(PlayerSession {
            monitor,
            fsm: FsmPlayer::new(content),
            log: LogBuffer::new(),
        })
    }

    // Collaborator wiring, forwarded to the machine.

    pub fn set_fetcher(&mut self, fetcher: Box<dyn AdFetcher>) {
        self.fsm.set_fetcher(fetcher);
    }

    pub fn set_renderer(&mut self, renderer: Box<dyn AdRenderer>) {
        self.fsm.set_renderer(renderer);
    }

    pub fn set_playback_control(&mut self, playback: Box<dyn PlaybackControl>) {
        self.fsm.set_playback_control(playback);
    }

    pub fn set_ui(&mut self, ui: Box<dyn PlayerUi>) {
        self.fsm.set_ui(ui);
    }

    // State queries.

    pub fn current_kind(&self) -> StateKind {
        self.fsm.current_kind()
    }

    pub fn is_ad_playing(&self) -> bool {
        self.fsm.is_ad_playing()
    }

    pub fn is_ended(&self) -> bool {
        self.fsm.is_ended()
    }

    pub fn cue_points(&self) -> &[u64] {
        self.monitor.cue_points()
    }

    pub fn ad_call_points(&self) -> &[u64] {
        self.monitor.ad_call_points()
    }

    pub fn logs(&self, since_index: usize) -> Vec<LogEntry> {
        self.log.get(since_index)
    }

    /// Replace the cue table mid-session (e.g. the ad server re-announced).
    pub fn set_cue_points(&mut self, points: &[u64]) -> Result<(), String> {
        self.monitor.set_cue_points(points)?;
        self.log
            .push("info", format!("Cue table replaced: {} points", points.len()));
        Ok(())
    }

    pub fn clear_cue_points(&mut self) {
        self.monitor.clear_cue_points();
        self.log.push("info", "Cue table cleared".to_string());
    }

    // External entry points.

    /// Progress report from the playback engine, at its own cadence.
    pub fn on_progress(&mut self, position_millis: u64, duration_millis: u64) {
        if self.fsm.is_ended() {
            return;
        }
        let signals =
            self.monitor
                .on_progress(position_millis, duration_millis, self.fsm.is_ad_playing());
        for signal in signals {
            match signal {
                ScheduleSignal::RequestAdCall { cue_point_millis } => {
                    self.log.push(
                        "info",
                        format!(
                            "Ad call for cue {} at position {}",
                            cue_point_millis, position_millis
                        ),
                    );
                    self.fsm.transit(Input::MakeAdCall { cue_point_millis });
                }
                ScheduleSignal::ShowAd { cue_point_millis } => {
                    self.log.push(
                        "info",
                        format!(
                            "Show break for cue {} at position {}",
                            cue_point_millis, position_millis
                        ),
                    );
                    self.fsm.transit(Input::ShowAds);
                }
            }
        }
    }

    /// The network collaborator delivered the break it was asked for.
    pub fn on_ad_metadata(&mut self, ad_break: AdBreak) {
        self.log.push(
            "info",
            format!(
                "Metadata for cue {}: {} creative(s)",
                ad_break.cue_point_millis,
                ad_break.ad_count()
            ),
        );
        self.fsm.transit(Input::AdMetadataReceived(ad_break));
    }

    /// The renderer finished the current creative.
    pub fn on_ad_finished(&mut self) {
        self.finish_break(Input::AdFinished);
    }

    /// The fetch or the renderer failed.
    pub fn on_ad_error(&mut self) {
        self.log.push("warn", "Ad error reported".to_string());
        self.finish_break(Input::AdError);
    }

    /// The playback session is over. Every later callback becomes a no-op.
    pub fn end_session(&mut self) {
        if self.fsm.transit(Input::SessionEnded) {
            self.log.push("info", "Session ended".to_string());
        }
    }

    /// Consumption policy: a cue point is removed once its break actually
    /// ran — the machine left AdPlaying for ContentPlaying. A failed fetch
    /// never reaches AdPlaying, so its cue point survives for a retry.
    fn finish_break(&mut self, input: Input) {
        let was_playing = self.fsm.is_ad_playing();
        if !self.fsm.transit(input) {
            return;
        }
        if was_playing && self.fsm.current_kind() == StateKind::ContentPlaying {
            self.monitor.consume_cue_point();
            self.log.push("info", "Break finished, cue point consumed".to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Net {
        fetched: RefCell<Vec<u64>>,
    }

    impl AdFetcher for Rc<Net> {
        fn fetch_ad_metadata(&self, cue_point_millis: u64) {
            self.fetched.borrow_mut().push(cue_point_millis);
        }
    }

    #[derive(Default)]
    struct Screen {
        started: RefCell<Vec<String>>,
    }

    impl AdRenderer for Rc<Screen> {
        fn start(&self, ad: &MediaModel) {
            self.started.borrow_mut().push(ad.name.clone());
        }
    }

    fn config(cues: &[u64]) -> SessionConfig {
        SessionConfig {
            cue_points: cues.to_vec(),
            networking_ahead_millis: 2_000,
            tolerance_window_millis: 1_500,
        }
    }

    fn wired_session(cues: &[u64]) -> (PlayerSession, Rc<Net>, Rc<Screen>) {
        let net = Rc::new(Net::default());
        let screen = Rc::new(Screen::default());
        let mut session =
            PlayerSession::new(&config(cues), MediaModel::content("Feature", "u")).unwrap();
        session.set_fetcher(Box::new(net.clone()));
        session.set_renderer(Box::new(screen.clone()));
        (session, net, screen)
    }

    fn pod(cue: u64, names: &[&str]) -> AdBreak {
        AdBreak::new(
            cue,
            names.iter().map(|n| MediaModel::ad(*n, "u")).collect(),
        )
    }

    #[test]
    fn rejects_invalid_config() {
        let bad = config(&[9_000, 3_000]);
        assert!(PlayerSession::new(&bad, MediaModel::content("F", "u")).is_err());
    }

    #[test]
    fn progress_drives_fetch_then_break() {
        let (mut session, net, screen) = wired_session(&[10_000]);

        session.on_progress(8_200, 100_000);
        assert_eq!(*net.fetched.borrow(), vec![10_000]);
        assert_eq!(session.current_kind(), StateKind::RequestingAdMetadata);

        session.on_ad_metadata(pod(10_000, &["a"]));
        session.on_progress(10_100, 100_000);
        assert!(session.is_ad_playing());
        assert_eq!(*screen.started.borrow(), vec!["a"]);
    }

    #[test]
    fn played_break_is_consumed_and_never_refires() {
        let (mut session, _net, screen) = wired_session(&[10_000]);

        session.on_progress(8_200, 100_000);
        session.on_ad_metadata(pod(10_000, &["a"]));
        session.on_progress(10_100, 100_000);
        session.on_ad_finished();

        assert_eq!(session.current_kind(), StateKind::ContentPlaying);
        assert!(session.cue_points().is_empty());

        // Seek back over the old cue point: nothing fires again.
        session.on_progress(50_000, 100_000);
        session.on_progress(10_000, 100_000);
        assert_eq!(session.current_kind(), StateKind::ContentPlaying);
        assert_eq!(screen.started.borrow().len(), 1);
    }

    #[test]
    fn failed_fetch_keeps_cue_point_for_retry() {
        let (mut session, net, _screen) = wired_session(&[10_000]);

        session.on_progress(8_200, 100_000);
        session.on_ad_error(); // fetch failed
        assert_eq!(session.current_kind(), StateKind::ContentPlaying);
        assert_eq!(session.cue_points(), &[10_000]);

        // Replay the region: the ad call fires again.
        session.on_progress(50_000, 100_000);
        session.on_progress(8_100, 100_000);
        assert_eq!(*net.fetched.borrow(), vec![10_000, 10_000]);
    }

    #[test]
    fn progress_ignored_while_ad_playing() {
        let (mut session, net, _screen) = wired_session(&[10_000, 12_000]);

        session.on_progress(8_200, 100_000);
        session.on_ad_metadata(pod(10_000, &["a"]));
        session.on_progress(10_100, 100_000);
        assert!(session.is_ad_playing());

        // Content-time positions keep arriving while the ad runs; the next
        // cue's windows must not fire.
        session.on_progress(10_500, 100_000);
        session.on_progress(11_000, 100_000);
        assert_eq!(net.fetched.borrow().len(), 1);
    }

    #[test]
    fn end_session_silences_everything() {
        let (mut session, net, screen) = wired_session(&[10_000]);
        session.on_progress(8_200, 100_000);
        session.end_session();
        assert!(session.is_ended());

        session.on_ad_metadata(pod(10_000, &["a"]));
        session.on_progress(10_100, 100_000);
        session.on_ad_finished();
        assert!(session.is_ended());
        assert_eq!(net.fetched.borrow().len(), 1);
        assert!(screen.started.borrow().is_empty());
    }

    #[test]
    fn decisions_are_logged() {
        let (mut session, _net, _screen) = wired_session(&[10_000]);
        session.on_progress(8_200, 100_000);
        session.on_ad_metadata(pod(10_000, &["a"]));
        session.on_progress(10_100, 100_000);
        session.on_ad_finished();

        let logs = session.logs(0);
        assert!(logs.iter().any(|e| e.message.contains("Ad call for cue 10000")));
        assert!(logs.iter().any(|e| e.message.contains("Show break for cue 10000")));
        assert!(logs.iter().any(|e| e.message.contains("consumed")));
    }

    // --- LogBuffer ---

    #[test]
    fn log_buffer_caps_entries() {
        let mut log = LogBuffer::new();
        for i in 0..600 {
            log.push("info", format!("entry {}", i));
        }
        assert_eq!(log.len(), 500);
        assert_eq!(log.get(0).first().unwrap().message, "entry 100");
    }

    #[test]
    fn log_buffer_since_index() {
        let mut log = LogBuffer::new();
        log.push("info", "a".into());
        log.push("info", "b".into());
        assert_eq!(log.get(1).len(), 1);
        assert_eq!(log.get(1)[0].message, "b");
    }
}
