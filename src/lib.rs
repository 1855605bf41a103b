//! cueFlow — Ad-break scheduling core for continuous video playback.
//!
//! Decides, frame by frame, when to fetch ad creative ahead of a cue point
//! and when to cut from content into an ad break and back. The media
//! pipeline, ad renderer, and network layer are external collaborators;
//! this crate only tells them when to act.

pub mod config;
pub mod cue_monitor;
pub mod fsm_player;
pub mod media;
pub mod session;
pub mod session_runtime;
pub mod state;
pub mod state_factory;
