//! Platform Adapter
//!
//! Everything the controller needs from the host UI is expressed through the
//! two traits below. A browser build, a native toolkit or the headless
//! terminal frontend each provide their own implementation.

use crate::topic::{Faq, FaqSummary, Topic, TopicSummary};
use anyhow::Result;
use async_trait::async_trait;
use std::fmt;

/// Identifies one transient notification so it can be faded and removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToastId(pub u64);

impl fmt::Display for ToastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "toast-{}", self.0)
    }
}

/// Rendering surface for the topic list, topic detail and status indicators.
///
/// Calls are fire-and-forget: the controller never waits on the view and a
/// view must not call back into the controller synchronously.
pub trait TopicView: Send + Sync {
    /// Replaces the topic list with one selectable control per topic.
    fn show_topics(&self, topics: &[TopicSummary]);
    /// Replaces the topic list with an empty-state message.
    fn show_empty_topics(&self, message: &str);
    /// Replaces the topic list with an inline error message.
    fn show_topic_list_error(&self, message: &str);
    /// Marks exactly one topic control as active, clearing any other.
    /// `None` clears the highlight entirely.
    fn set_active_topic(&self, topic_id: Option<&str>);
    fn set_loading(&self, loading: bool);

    /// Switches from the welcome placeholder to the player view.
    fn show_player(&self);
    fn show_topic(&self, topic: &Topic, language_label: &str);
    /// Rebuilds the FAQ buttons; visibility is controlled separately.
    fn show_faq_list(&self, faqs: &[FaqSummary]);
    fn set_faq_list_visible(&self, visible: bool);

    fn show_faq_answer(&self, faq: &Faq);
    fn hide_faq_answer(&self);
    fn scroll_faq_answer_into_view(&self);

    fn set_speaking(&self, speaking: bool, status: &str);
    fn set_audio_unavailable(&self, visible: bool);

    fn show_toast(&self, id: ToastId, message: &str);
    fn fade_toast(&self, id: ToastId);
    fn remove_toast(&self, id: ToastId);
}

/// One media sink: the looping avatar video or the narration audio.
#[async_trait]
pub trait MediaElement: Send + Sync {
    fn set_source(&self, url: &str);
    fn source(&self) -> Option<String>;
    fn set_loop(&self, looping: bool);
    fn is_looping(&self) -> bool;
    fn set_muted(&self, muted: bool);
    /// Starts fetching the current source.
    fn load(&self);
    /// Starts playback. The host may refuse, e.g. on an autoplay policy.
    async fn play(&self) -> Result<()>;
    fn pause(&self);
    /// Whether the current source has played through to its end.
    fn is_ended(&self) -> bool;
}
