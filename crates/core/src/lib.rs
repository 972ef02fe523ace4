//! Avatar Teacher Core
//!
//! UI-agnostic logic for the avatar teacher player: the topic data model,
//! the REST client for the topic service, the playback state machine and the
//! controller that ties them to a host-provided view and media elements.

pub mod api;
pub mod controller;
pub mod notifier;
pub mod platform;
pub mod playback;
pub mod topic;

pub use api::{ApiError, HttpTopicApi, TopicApi};
pub use controller::{PlaybackController, PlayerSettings, Selection};
pub use platform::{MediaElement, ToastId, TopicView};
pub use playback::PlaybackPhase;
