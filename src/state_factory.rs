//! StateFactory — registry mapping a state identifier to a fresh state value.
//!
//! Keeps state construction out of transition call sites: a deployment that
//! wants a different fresh shape for a variant (say, a pre-seeded ad queue in
//! a kiosk build) registers its own constructor instead of touching the
//! transition table.

use crate::state::{State, StateKind};
use std::collections::HashMap;
use std::collections::VecDeque;

type StateCtor = fn() -> State;

pub struct StateFactory {
    constructors: HashMap<StateKind, StateCtor>,
}

impl StateFactory {
    /// Factory pre-seeded with the builtin constructor for every variant.
    pub fn new() -> Self {
        let mut constructors: HashMap<StateKind, StateCtor> = HashMap::new();
        constructors.insert(StateKind::ContentPlaying, || State::ContentPlaying);
        constructors.insert(StateKind::RequestingAdMetadata, || {
            State::RequestingAdMetadata {
                cue_point_millis: 0,
            }
        });
        constructors.insert(StateKind::AdMetadataReceived, || State::AdMetadataReceived {
            cue_point_millis: 0,
            queue: VecDeque::new(),
        });
        constructors.insert(StateKind::AdPlaying, || State::AdPlaying {
            cue_point_millis: 0,
            current_ad: crate::media::MediaModel::ad("", ""),
            queue: VecDeque::new(),
        });
        constructors.insert(StateKind::SessionEnded, || State::SessionEnded);
        StateFactory { constructors }
    }

    /// Override the constructor for one variant.
    pub fn register(&mut self, kind: StateKind, ctor: StateCtor) {
        self.constructors.insert(kind, ctor);
    }

    /// Create a fresh state value for the given identifier.
    pub fn create_state(&self, kind: StateKind) -> State {
        match self.constructors.get(&kind) {
            Some(ctor) => ctor(),
            // Every kind is seeded in new(); reachable only if a caller
            // removed and forgot to re-register, so fall back to content.
            None => State::ContentPlaying,
        }
    }
}

impl Default for StateFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_matching_kind_for_every_variant() {
        let factory = StateFactory::new();
        for kind in [
            StateKind::ContentPlaying,
            StateKind::RequestingAdMetadata,
            StateKind::AdMetadataReceived,
            StateKind::AdPlaying,
            StateKind::SessionEnded,
        ] {
            assert_eq!(factory.create_state(kind).kind(), kind);
        }
    }

    #[test]
    fn registered_constructor_overrides_builtin() {
        let mut factory = StateFactory::new();
        factory.register(StateKind::RequestingAdMetadata, || {
            State::RequestingAdMetadata {
                cue_point_millis: 42,
            }
        });
        match factory.create_state(StateKind::RequestingAdMetadata) {
            State::RequestingAdMetadata { cue_point_millis } => {
                assert_eq!(cue_point_millis, 42)
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
