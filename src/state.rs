//! Playback/ad state machine types and the pure transition function.
//!
//! States are a tagged enum, each variant carrying only the data relevant to
//! it; `transit` is the single place transitions are defined. Undefined
//! (state, input) pairs are not errors — `transit` returns `None` and the
//! caller keeps the current state, which is what makes duplicate or late
//! collaborator callbacks safe no-ops.

use crate::media::{AdBreak, MediaModel};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Inputs that drive the state machine. Scheduling signals and collaborator
/// completions arrive through the same funnel.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Progress reached an ad-call point: fetch metadata for this cue point.
    MakeAdCall { cue_point_millis: u64 },
    /// The network collaborator delivered a break.
    AdMetadataReceived(AdBreak),
    /// Progress reached the cue point: start the break.
    ShowAds,
    /// The renderer finished the current creative.
    AdFinished,
    /// The fetch or the renderer failed.
    AdError,
    /// The player session is over; every later input must be ignored.
    SessionEnded,
}

/// Identifier for a state variant, used by the factory and for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    ContentPlaying,
    RequestingAdMetadata,
    AdMetadataReceived,
    AdPlaying,
    SessionEnded,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateKind::ContentPlaying => write!(f, "content-playing"),
            StateKind::RequestingAdMetadata => write!(f, "requesting-ad-metadata"),
            StateKind::AdMetadataReceived => write!(f, "ad-metadata-received"),
            StateKind::AdPlaying => write!(f, "ad-playing"),
            StateKind::SessionEnded => write!(f, "session-ended"),
        }
    }
}

/// One active playback/ad state. Replaced atomically by each transition.
#[derive(Debug, Clone, PartialEq)]
pub enum State {
    /// Content is rolling; no ad work pending.
    ContentPlaying,
    /// An ad call is in flight for the given cue point.
    RequestingAdMetadata { cue_point_millis: u64 },
    /// Metadata arrived; the pod waits for progress to hit the cue point.
    AdMetadataReceived {
        cue_point_millis: u64,
        queue: VecDeque<MediaModel>,
    },
    /// A creative is on screen; the rest of the pod queues behind it.
    AdPlaying {
        cue_point_millis: u64,
        current_ad: MediaModel,
        queue: VecDeque<MediaModel>,
    },
    /// Terminal sentinel: the session ended. Absorbs all inputs so a late
    /// network or renderer callback cannot resurrect stale ad content.
    SessionEnded,
}

impl State {
    pub fn kind(&self) -> StateKind {
        match self {
            State::ContentPlaying => StateKind::ContentPlaying,
            State::RequestingAdMetadata { .. } => StateKind::RequestingAdMetadata,
            State::AdMetadataReceived { .. } => StateKind::AdMetadataReceived,
            State::AdPlaying { .. } => StateKind::AdPlaying,
            State::SessionEnded => StateKind::SessionEnded,
        }
    }

    /// The creative currently on screen, if any.
    pub fn current_ad(&self) -> Option<&MediaModel> {
        match self {
            State::AdPlaying { current_ad, .. } => Some(current_ad),
            _ => None,
        }
    }
}

/// Side effect to dispatch to an external collaborator after a transition.
/// Dispatches are fire-and-forget; completions come back as new `Input`s.
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    /// Ask the network collaborator for the break at this cue point.
    FetchAdMetadata { cue_point_millis: u64 },
    /// Hand a creative to the ad renderer.
    StartAdRenderer { ad: MediaModel },
    /// Switch the player back to content.
    ResumeContent,
}

/// Result of a defined transition: the state to install and the effect to
/// dispatch, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: State,
    pub effect: Option<SideEffect>,
}

/// The transition function. Total and deterministic: every defined
/// (state, input) pair yields `Some`, everything else yields `None` and the
/// current state stands.
pub fn transit(state: &State, input: Input) -> Option<Transition> {
    match (state, input) {
        (State::ContentPlaying, Input::MakeAdCall { cue_point_millis }) => Some(Transition {
            next: State::RequestingAdMetadata { cue_point_millis },
            effect: Some(SideEffect::FetchAdMetadata { cue_point_millis }),
        }),

        (State::RequestingAdMetadata { .. }, Input::AdMetadataReceived(ad_break)) => {
            Some(Transition {
                next: State::AdMetadataReceived {
                    cue_point_millis: ad_break.cue_point_millis,
                    queue: ad_break.ads.into(),
                },
                effect: None,
            })
        }

        // Fetch failed: back to content, never stuck waiting.
        (State::RequestingAdMetadata { .. }, Input::AdError) => Some(Transition {
            next: State::ContentPlaying,
            effect: Some(SideEffect::ResumeContent),
        }),

        (
            State::AdMetadataReceived {
                cue_point_millis,
                queue,
            },
            Input::ShowAds,
        ) => {
            let mut queue = queue.clone();
            match queue.pop_front() {
                Some(first) => Some(Transition {
                    next: State::AdPlaying {
                        cue_point_millis: *cue_point_millis,
                        current_ad: first.clone(),
                        queue,
                    },
                    effect: Some(SideEffect::StartAdRenderer { ad: first }),
                }),
                // Server returned an empty break: skip it.
                None => Some(Transition {
                    next: State::ContentPlaying,
                    effect: Some(SideEffect::ResumeContent),
                }),
            }
        }

        (
            State::AdPlaying {
                cue_point_millis,
                queue,
                ..
            },
            Input::AdFinished | Input::AdError,
        ) => {
            let mut queue = queue.clone();
            match queue.pop_front() {
                Some(next_ad) => Some(Transition {
                    next: State::AdPlaying {
                        cue_point_millis: *cue_point_millis,
                        current_ad: next_ad.clone(),
                        queue,
                    },
                    effect: Some(SideEffect::StartAdRenderer { ad: next_ad }),
                }),
                None => Some(Transition {
                    next: State::ContentPlaying,
                    effect: Some(SideEffect::ResumeContent),
                }),
            }
        }

        // Terminal from anywhere; terminal absorbs everything.
        (State::SessionEnded, _) => None,
        (_, Input::SessionEnded) => Some(Transition {
            next: State::SessionEnded,
            effect: None,
        }),

        _ => None,
    }
}
