//! Glue between stdin commands, media events and the playback controller.

use crate::{commands::Command, media::MediaEvent};
use avatar_teacher_core::{PlaybackController, Selection, TopicView};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::warn;

/// What the input loop should do after a command.
#[derive(Debug)]
pub enum Flow {
    Continue,
    /// A selection was started in the background.
    Pending(JoinHandle<Selection>),
    Help,
    Quit,
}

/// Runs one command against the controller.
///
/// Selections are spawned rather than awaited so a later selection can
/// supersede one whose fetch is still in flight.
pub async fn dispatch(
    controller: &Arc<PlaybackController>,
    view: &Arc<dyn TopicView>,
    command: Command,
) -> Flow {
    match command {
        Command::SelectTopic(n) => {
            let topics = controller.topics().await;
            let Some(topic) = n.checked_sub(1).and_then(|i| topics.get(i)) else {
                warn!(index = n, available = topics.len(), "No such topic");
                return Flow::Continue;
            };
            let controller = controller.clone();
            let topic_id = topic.id.clone();
            Flow::Pending(tokio::spawn(async move {
                controller.select_topic(&topic_id).await
            }))
        }
        Command::SelectFaq(n) => {
            let faqs = controller.faqs().await;
            let Some(faq) = n.checked_sub(1).and_then(|i| faqs.get(i)) else {
                warn!(index = n, available = faqs.len(), "No such FAQ");
                return Flow::Continue;
            };
            let controller = controller.clone();
            let faq_id = faq.id.clone();
            Flow::Pending(tokio::spawn(async move {
                controller.select_faq(&faq_id).await
            }))
        }
        Command::PauseAudio => {
            controller.pause_audio();
            Flow::Continue
        }
        Command::CloseAnswer => {
            controller.close_faq_answer().await;
            Flow::Continue
        }
        Command::ListTopics => {
            let topics = controller.topics().await;
            if topics.is_empty() {
                view.show_empty_topics(avatar_teacher_core::controller::EMPTY_TOPICS_MESSAGE);
            } else {
                view.show_topics(&topics);
            }
            Flow::Continue
        }
        Command::Help => Flow::Help,
        Command::Quit => Flow::Quit,
    }
}

/// Forwards one narration event to the matching controller handler.
pub async fn apply_media_event(controller: &PlaybackController, event: MediaEvent) {
    match event {
        MediaEvent::Play => controller.on_audio_play(),
        MediaEvent::Pause => controller.on_audio_pause(),
        MediaEvent::Ended => controller.on_audio_ended().await,
        MediaEvent::Loaded => controller.on_audio_loaded(),
        MediaEvent::Error(message) => controller.on_audio_error(&message),
    }
}
