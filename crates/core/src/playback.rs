//! Playback State Machine
//!
//! The player moves through a small set of phases per session. The transition
//! function here is pure so the FAQ reveal timing can be checked without any
//! view or media element behind it.

/// Where the session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackPhase {
    /// Nothing selected yet; the welcome placeholder is showing.
    #[default]
    Welcome,
    /// A topic is rendered and its narration is (or should be) playing.
    PlayingTopicAudio,
    /// The topic narration has ended and the FAQ list is visible.
    FaqAvailable,
    /// A FAQ answer narration is playing.
    PlayingFaqAudio,
}

impl PlaybackPhase {
    /// Whether the FAQ list has been revealed, so a FAQ may be selected.
    pub fn accepts_faq(self) -> bool {
        matches!(self, Self::FaqAvailable | Self::PlayingFaqAudio)
    }
}

/// Inputs that can move the session between phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    TopicLoaded,
    FaqLoaded,
    AudioEnded,
    FetchFailed,
}

/// What the FAQ list should do as part of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaqListChange {
    Unchanged,
    Hide,
    Reveal,
}

/// The outcome of feeding one event to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub phase: PlaybackPhase,
    pub faq_list: FaqListChange,
}

impl Step {
    fn stay(phase: PlaybackPhase) -> Self {
        Self {
            phase,
            faq_list: FaqListChange::Unchanged,
        }
    }
}

/// Computes the next phase for `event`.
///
/// The FAQ list is revealed only when the topic's own narration ends; a FAQ
/// narration ending returns to `FaqAvailable` without touching the list.
/// A FAQ can only take over the narration once the list is visible.
pub fn transition(phase: PlaybackPhase, event: PlaybackEvent) -> Step {
    use PlaybackEvent::*;
    use PlaybackPhase::*;

    match (phase, event) {
        (_, TopicLoaded) => Step {
            phase: PlayingTopicAudio,
            faq_list: FaqListChange::Hide,
        },
        (PlayingTopicAudio, AudioEnded) => Step {
            phase: FaqAvailable,
            faq_list: FaqListChange::Reveal,
        },
        (PlayingFaqAudio, AudioEnded) => Step::stay(FaqAvailable),
        (FaqAvailable | PlayingFaqAudio, FaqLoaded) => Step::stay(PlayingFaqAudio),
        (current, FetchFailed | AudioEnded | FaqLoaded) => Step::stay(current),
    }
}
