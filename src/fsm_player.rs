//! FsmPlayer — owns the current playback/ad state and drives collaborators.
//!
//! Applies the pure `transit` function, installs the next state, dispatches
//! the side effect to the right collaborator, and invokes the UI hook once
//! per transition. Collaborators are optional capabilities: a session without
//! an ad renderer still plays content, with every break degrading to a skip.

use crate::media::MediaModel;
use crate::state::{Input, SideEffect, State, StateKind, Transition, transit};
use crate::state_factory::StateFactory;

// --- Collaborator contracts ---

/// Network collaborator: fetches the break for a cue point. Fire-and-forget;
/// completion comes back as `Input::AdMetadataReceived` or `Input::AdError`.
pub trait AdFetcher {
    fn fetch_ad_metadata(&self, cue_point_millis: u64);
}

/// Ad-rendering collaborator (e.g. an embedded VPAID bridge). Completion or
/// failure comes back as `Input::AdFinished` / `Input::AdError`.
pub trait AdRenderer {
    fn start(&self, ad: &MediaModel);
}

/// Player-side hook: switch the visible source back to content.
pub trait PlaybackControl {
    fn resume_content(&self);
}

/// UI collaborator, invoked once per transition with the content descriptor
/// and the creative currently on screen, if any.
pub trait PlayerUi {
    fn update_player_ui(&self, content: &MediaModel, ad: Option<&MediaModel>);
}

// --- Player ---

pub struct FsmPlayer {
    current: State,
    factory: StateFactory,
    content: MediaModel,
    fetcher: Option<Box<dyn AdFetcher>>,
    renderer: Option<Box<dyn AdRenderer>>,
    playback: Option<Box<dyn PlaybackControl>>,
    ui: Option<Box<dyn PlayerUi>>,
}

impl FsmPlayer {
    /// Create a machine in the content-playing state for the given content.
    pub fn new(content: MediaModel) -> Self {
        Self::with_factory(content, StateFactory::new())
    }

    /// Create a machine with a caller-supplied factory (custom fresh shapes).
    pub fn with_factory(content: MediaModel, factory: StateFactory) -> Self {
        let current = factory.create_state(StateKind::ContentPlaying);
        FsmPlayer {
            current,
            factory,
            content,
            fetcher: None,
            renderer: None,
            playback: None,
            ui: None,
        }
    }

    pub fn set_fetcher(&mut self, fetcher: Box<dyn AdFetcher>) {
        self.fetcher = Some(fetcher);
    }

    pub fn set_renderer(&mut self, renderer: Box<dyn AdRenderer>) {
        self.renderer = Some(renderer);
    }

    pub fn set_playback_control(&mut self, playback: Box<dyn PlaybackControl>) {
        self.playback = Some(playback);
    }

    pub fn set_ui(&mut self, ui: Box<dyn PlayerUi>) {
        self.ui = Some(ui);
    }

    pub fn current_state(&self) -> &State {
        &self.current
    }

    pub fn current_kind(&self) -> StateKind {
        self.current.kind()
    }

    /// Queried by the cue monitor before each progress evaluation.
    pub fn is_ad_playing(&self) -> bool {
        self.current_kind() == StateKind::AdPlaying
    }

    pub fn is_ended(&self) -> bool {
        self.current_kind() == StateKind::SessionEnded
    }

    pub fn content(&self) -> &MediaModel {
        &self.content
    }

    /// Feed one input into the machine. Returns `true` if a transition was
    /// defined for it; `false` means the input was ignored and the state is
    /// unchanged (the duplicate/late-signal path).
    ///
    /// A dispatch against an absent collaborator can synthesize a follow-up
    /// input (a missing renderer fails the creative immediately), so this
    /// loops until the machine settles.
    pub fn transit(&mut self, input: Input) -> bool {
        let mut next_input = Some(input);
        let mut any = false;

        while let Some(input) = next_input.take() {
            let Some(Transition { next, effect }) = transit(&self.current, input) else {
                break;
            };
            any = true;

            // Dataless targets come from the factory so a deployment's
            // registered shape wins; data-carrying targets are built by the
            // transition itself.
            self.current = match next {
                State::ContentPlaying => self.factory.create_state(StateKind::ContentPlaying),
                State::SessionEnded => self.factory.create_state(StateKind::SessionEnded),
                other => other,
            };

            if let Some(ui) = &self.ui {
                ui.update_player_ui(&self.content, self.current.current_ad());
            }

            next_input = effect.and_then(|e| self.dispatch(e));
        }

        any
    }

    /// Dispatch one side effect. Returns an input to feed back when the
    /// responsible collaborator is absent and the effect must degrade.
    fn dispatch(&self, effect: SideEffect) -> Option<Input> {
        match effect {
            SideEffect::FetchAdMetadata { cue_point_millis } => match &self.fetcher {
                Some(f) => {
                    f.fetch_ad_metadata(cue_point_millis);
                    None
                }
                // No network collaborator: the fetch fails on the spot and
                // the machine returns to content.
                None => Some(Input::AdError),
            },
            SideEffect::StartAdRenderer { ad } => match &self.renderer {
                Some(r) => {
                    r.start(&ad);
                    None
                }
                // Content-only deployment: skip the creative.
                None => Some(Input::AdError),
            },
            SideEffect::ResumeContent => {
                if let Some(p) = &self.playback {
                    p.resume_content();
                }
                None
            }
        }
    }
}
