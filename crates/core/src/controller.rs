//! Playback Controller
//!
//! Owns the session state of the player and sequences the topic list, topic
//! detail, FAQ answers and the two media elements. It is constructed once per
//! session, shared behind an `Arc`, and driven by two kinds of input: user
//! selections (`select_topic`, `select_faq`, ...) and media events forwarded
//! by the host (`on_audio_play`, `on_audio_ended`, ...).

use crate::{
    api::{ApiError, TopicApi},
    notifier::Notifier,
    platform::{MediaElement, TopicView},
    playback::{FaqListChange, PlaybackEvent, PlaybackPhase, transition},
    topic::{DEFAULT_AVATAR_VIDEO, FaqSummary, Topic, TopicSummary},
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

pub const EMPTY_TOPICS_MESSAGE: &str = "No topics available";
pub const TOPIC_LIST_ERROR_MESSAGE: &str = "Failed to load topics. Please refresh the page.";
pub const TOPIC_ERROR_MESSAGE: &str = "Failed to load topic. Please try again.";
pub const FAQ_ERROR_MESSAGE: &str = "Failed to load FAQ. Please try again.";
pub const SPEAKING_STATUS: &str = "Speaking...";

/// Tunables for the player. The defaults match the web frontend.
#[derive(Debug, Clone)]
pub struct PlayerSettings {
    /// Clip looped behind the narration when a topic has no video of its own.
    pub default_video_url: String,
    /// Pause between loading a narration clip and starting it.
    pub settle_delay: Duration,
    pub toast_timeout: Duration,
    pub toast_fade: Duration,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            default_video_url: DEFAULT_AVATAR_VIDEO.to_string(),
            settle_delay: Duration::from_millis(100),
            toast_timeout: Duration::from_millis(3000),
            toast_fade: Duration::from_millis(300),
        }
    }
}

/// How a selection request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The detail was fetched and rendered.
    Rendered,
    /// The fetch failed; the user was notified and nothing else changed.
    Failed,
    /// A later selection started before this one resolved; its result was dropped.
    Superseded,
    /// The FAQ does not belong to the topic currently shown, or its list has
    /// not been revealed yet.
    Ignored,
}

#[derive(Debug, Default)]
struct Session {
    phase: PlaybackPhase,
    topics: Vec<TopicSummary>,
    topic: Option<Topic>,
    faqs: Vec<FaqSummary>,
    faq_answer_visible: bool,
}

impl Session {
    fn rendered_topic_id(&self) -> Option<&str> {
        self.topic.as_ref().map(|t| t.id.as_str())
    }
}

/// The single owner of the player's state for one session.
pub struct PlaybackController {
    api: Arc<dyn TopicApi>,
    view: Arc<dyn TopicView>,
    video: Arc<dyn MediaElement>,
    audio: Arc<dyn MediaElement>,
    notifier: Notifier,
    settings: PlayerSettings,
    session: Mutex<Session>,
    /// Bumped by every topic selection.
    topic_ticket: AtomicU64,
    /// Bumped by every FAQ selection and by every topic selection, both when
    /// it starts and when it renders.
    faq_ticket: AtomicU64,
    /// Bumped every time a new narration source is loaded.
    narration_ticket: AtomicU64,
}

impl PlaybackController {
    pub fn new(
        api: Arc<dyn TopicApi>,
        view: Arc<dyn TopicView>,
        video: Arc<dyn MediaElement>,
        audio: Arc<dyn MediaElement>,
        settings: PlayerSettings,
    ) -> Self {
        let notifier = Notifier::new(view.clone(), settings.toast_timeout, settings.toast_fade);
        Self {
            api,
            view,
            video,
            audio,
            notifier,
            settings,
            session: Mutex::new(Session::default()),
            topic_ticket: AtomicU64::new(0),
            faq_ticket: AtomicU64::new(0),
            narration_ticket: AtomicU64::new(0),
        }
    }

    pub async fn phase(&self) -> PlaybackPhase {
        self.session.lock().await.phase
    }

    /// The topics rendered by the last successful `load_topics`.
    pub async fn topics(&self) -> Vec<TopicSummary> {
        self.session.lock().await.topics.clone()
    }

    /// The FAQ references of the topic currently shown.
    pub async fn faqs(&self) -> Vec<FaqSummary> {
        self.session.lock().await.faqs.clone()
    }

    pub async fn current_topic(&self) -> Option<Topic> {
        self.session.lock().await.topic.clone()
    }

    pub async fn is_faq_answer_visible(&self) -> bool {
        self.session.lock().await.faq_answer_visible
    }

    /// Fetches the topic list and renders it. There is no retry.
    ///
    /// On failure the inline error is rendered before the error is returned.
    pub async fn load_topics(&self) -> Result<(), ApiError> {
        let topics = match self.api.list_topics().await {
            Ok(topics) => topics,
            Err(e) => {
                error!(error = %e, "Error loading topics");
                self.view.show_topic_list_error(TOPIC_LIST_ERROR_MESSAGE);
                return Err(e);
            }
        };

        info!(count = topics.len(), "Loaded topics");
        if topics.is_empty() {
            self.view.show_empty_topics(EMPTY_TOPICS_MESSAGE);
        } else {
            self.view.show_topics(&topics);
        }
        self.session.lock().await.topics = topics;
        Ok(())
    }

    /// Fetches and renders a topic, then starts its media.
    ///
    /// A later call supersedes this one while its fetch is still in flight.
    #[instrument(skip(self))]
    pub async fn select_topic(&self, topic_id: &str) -> Selection {
        let ticket = self.topic_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        self.faq_ticket.fetch_add(1, Ordering::SeqCst);

        self.view.set_loading(true);
        self.view.set_active_topic(Some(topic_id));

        let result = self.api.get_topic(topic_id).await;
        if self.topic_ticket.load(Ordering::SeqCst) != ticket {
            debug!("Topic fetch superseded by a later selection");
            return Selection::Superseded;
        }

        let topic = match result {
            Ok(topic) => topic,
            Err(e) => {
                error!(error = %e, "Error selecting topic");
                let mut session = self.session.lock().await;
                session.phase = transition(session.phase, PlaybackEvent::FetchFailed).phase;
                self.view.set_active_topic(session.rendered_topic_id());
                drop(session);

                self.view.set_loading(false);
                self.notifier.notify(TOPIC_ERROR_MESSAGE);
                return Selection::Failed;
            }
        };

        let step = {
            let mut session = self.session.lock().await;
            let step = transition(session.phase, PlaybackEvent::TopicLoaded);
            session.phase = step.phase;
            // FAQ fetches of the previous topic that are still in flight lose.
            self.faq_ticket.fetch_add(1, Ordering::SeqCst);
            session.faqs = topic.faqs.clone();
            session.topic = Some(topic.clone());
            session.faq_answer_visible = false;
            step
        };

        self.view.show_topic(&topic, &topic.language_label());
        self.view.show_faq_list(&topic.faqs);
        if step.faq_list == FaqListChange::Hide {
            self.view.set_faq_list_visible(false);
        }
        self.view.hide_faq_answer();
        self.view.show_player();
        self.view.set_loading(false);
        info!(title = %topic.title, faqs = topic.faqs.len(), "Topic rendered");

        self.play_topic_media(&topic).await;
        Selection::Rendered
    }

    /// Fetches a FAQ of the current topic, shows its answer and swaps the
    /// narration to the answer's audio. The looping video is left alone.
    #[instrument(skip(self))]
    pub async fn select_faq(&self, faq_id: &str) -> Selection {
        let ticket = {
            let session = self.session.lock().await;
            if !session.faqs.iter().any(|f| f.id == faq_id) {
                warn!("FAQ does not belong to the current topic");
                return Selection::Ignored;
            }
            if !session.phase.accepts_faq() {
                warn!(phase = ?session.phase, "FAQ list is not revealed yet");
                return Selection::Ignored;
            }
            self.faq_ticket.fetch_add(1, Ordering::SeqCst) + 1
        };

        self.view.set_audio_unavailable(false);

        let result = self.api.get_faq(faq_id).await;
        if self.faq_ticket.load(Ordering::SeqCst) != ticket {
            debug!("FAQ fetch superseded by a later selection");
            return Selection::Superseded;
        }

        let faq = match result {
            Ok(faq) => faq,
            Err(e) => {
                error!(error = %e, "Error selecting FAQ");
                self.notifier.notify(FAQ_ERROR_MESSAGE);
                return Selection::Failed;
            }
        };

        {
            let mut session = self.session.lock().await;
            // A topic may have rendered while the answer was on its way.
            if self.faq_ticket.load(Ordering::SeqCst) != ticket
                || !session.faqs.iter().any(|f| f.id == faq_id)
            {
                debug!("FAQ no longer belongs to the displayed topic");
                return Selection::Superseded;
            }
            session.phase = transition(session.phase, PlaybackEvent::FaqLoaded).phase;
            session.faq_answer_visible = true;
        }

        self.view.show_faq_answer(&faq);
        self.view.scroll_faq_answer_into_view();

        match faq.narration_url() {
            Some(url) => self.play_narration(url).await,
            None => {
                warn!("No audio URL for this FAQ");
                self.view.set_audio_unavailable(true);
            }
        }
        Selection::Rendered
    }

    /// Hides the FAQ answer panel. Playback continues.
    pub async fn close_faq_answer(&self) {
        self.session.lock().await.faq_answer_visible = false;
        self.view.hide_faq_answer();
    }

    /// Pauses the narration, e.g. on a user request.
    pub fn pause_audio(&self) {
        self.audio.pause();
    }

    pub fn on_audio_play(&self) {
        self.view.set_speaking(true, SPEAKING_STATUS);
    }

    /// Handles the narration's end-of-track event.
    pub async fn on_audio_ended(&self) {
        self.view.set_speaking(false, "");

        let mut session = self.session.lock().await;
        let step = transition(session.phase, PlaybackEvent::AudioEnded);
        session.phase = step.phase;
        if step.faq_list == FaqListChange::Reveal && !session.faqs.is_empty() {
            debug!("Topic narration ended; revealing FAQs");
            self.view.set_faq_list_visible(true);
        }
    }

    pub fn on_audio_pause(&self) {
        // A natural end also pauses; `on_audio_ended` owns that case.
        if self.audio.is_ended() {
            return;
        }
        self.view.set_speaking(false, "");
    }

    pub fn on_audio_error(&self, message: &str) {
        error!(error = %message, "Audio error");
        self.view.set_audio_unavailable(true);
    }

    pub fn on_audio_loaded(&self) {
        self.view.set_audio_unavailable(false);
    }

    async fn play_topic_media(&self, topic: &Topic) {
        self.view.set_audio_unavailable(false);

        let video_url = topic.video_url(&self.settings.default_video_url).to_string();
        let narration = async {
            match topic.narration_url() {
                Some(url) => self.play_narration(url).await,
                None => {
                    warn!(topic_id = %topic.id, "No audio URL provided for this topic");
                    // Invalidate any narration of the previous topic still settling.
                    self.narration_ticket.fetch_add(1, Ordering::SeqCst);
                    self.audio.pause();
                    self.view.set_audio_unavailable(true);
                }
            }
        };
        tokio::join!(self.play_video(&video_url), narration);
    }

    async fn play_video(&self, url: &str) {
        self.video.set_source(url);
        self.video.set_loop(true);
        self.video.set_muted(false);

        if let Err(e) = self.video.play().await {
            warn!(error = %e, "Error playing video; retrying muted");
            self.video.set_muted(true);
            if let Err(e) = self.video.play().await {
                error!(error = %e, "Video playback failed");
            }
        }
    }

    async fn play_narration(&self, url: &str) {
        let ticket = self.narration_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        self.audio.set_source(url);
        self.audio.load();

        tokio::time::sleep(self.settings.settle_delay).await;
        if self.narration_ticket.load(Ordering::SeqCst) != ticket {
            debug!(url, "Narration replaced before it started");
            return;
        }

        if let Err(e) = self.audio.play().await {
            error!(error = %e, url, "Error playing audio");
            self.view.set_audio_unavailable(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, MockTopicApi};
    use crate::platform::testing::{FakeMedia, RecordingView, ViewCall};
    use crate::topic::Faq;
    use reqwest::StatusCode;
    use serde_json::json;
    use std::collections::HashMap;
    use tokio::sync::oneshot;

    struct Harness {
        controller: Arc<PlaybackController>,
        view: Arc<RecordingView>,
        video: Arc<FakeMedia>,
        audio: Arc<FakeMedia>,
    }

    fn harness_with(api: MockTopicApi, video: FakeMedia, audio: FakeMedia) -> Harness {
        harness_from(Arc::new(api), video, audio)
    }

    fn harness_from(api: Arc<dyn TopicApi>, video: FakeMedia, audio: FakeMedia) -> Harness {
        let view = Arc::new(RecordingView::default());
        let video = Arc::new(video);
        let audio = Arc::new(audio);
        let controller = Arc::new(PlaybackController::new(
            api,
            view.clone(),
            video.clone(),
            audio.clone(),
            PlayerSettings::default(),
        ));
        Harness {
            controller,
            view,
            video,
            audio,
        }
    }

    fn harness(api: MockTopicApi) -> Harness {
        harness_with(api, FakeMedia::default(), FakeMedia::default())
    }

    fn status_error(status: StatusCode) -> ApiError {
        ApiError::Status {
            url: "http://test/api".to_string(),
            status,
        }
    }

    fn intro_topic() -> Topic {
        serde_json::from_value(json!({
            "id": 1,
            "title": "Intro",
            "language": "en",
            "content_text": "Hello",
            "audio_url": "/a1.mp3",
            "faqs": [{"id": 10, "question": "Q1"}]
        }))
        .unwrap()
    }

    fn topic(id: &str, audio_url: Option<&str>) -> Topic {
        Topic {
            id: id.to_string(),
            title: format!("Topic {id}"),
            language: "fr".to_string(),
            content_text: String::new(),
            avatar_video_url: None,
            audio_url: audio_url.map(str::to_string),
            faqs: vec![FaqSummary {
                id: format!("{id}-faq"),
                question: "Why?".to_string(),
                answer_audio_url: None,
            }],
        }
    }

    fn faq(id: &str, audio_url: Option<&str>) -> Faq {
        Faq {
            id: id.to_string(),
            question: "Q1".to_string(),
            answer: "A1".to_string(),
            answer_audio_url: audio_url.map(str::to_string),
            topic_id: None,
            language: None,
        }
    }

    #[tokio::test]
    async fn test_empty_topic_list_shows_empty_state() {
        let mut api = MockTopicApi::new();
        api.expect_list_topics().returning(|| Ok(vec![]));
        let h = harness(api);

        h.controller.load_topics().await.unwrap();
        assert_eq!(
            h.view.calls(),
            vec![ViewCall::EmptyTopics(EMPTY_TOPICS_MESSAGE.to_string())]
        );
    }

    #[tokio::test]
    async fn test_topic_list_renders_badges() {
        let mut api = MockTopicApi::new();
        api.expect_list_topics().returning(|| {
            Ok(vec![
                TopicSummary {
                    id: "1".into(),
                    title: "Intro".into(),
                    language: "en".into(),
                },
                TopicSummary {
                    id: "2".into(),
                    title: "Bonjour".into(),
                    language: "fr".into(),
                },
            ])
        });
        let h = harness(api);

        h.controller.load_topics().await.unwrap();
        assert_eq!(
            h.view.calls(),
            vec![ViewCall::Topics(vec![
                "Intro [EN]".to_string(),
                "Bonjour [FR]".to_string()
            ])]
        );
        assert_eq!(h.controller.topics().await.len(), 2);
    }

    #[tokio::test]
    async fn test_topic_list_failure_is_inline_and_terminal() {
        let mut api = MockTopicApi::new();
        api.expect_list_topics()
            .times(1)
            .returning(|| Err(status_error(StatusCode::INTERNAL_SERVER_ERROR)));
        let h = harness(api);

        assert!(matches!(
            h.controller.load_topics().await,
            Err(ApiError::Status { status, .. }) if status == StatusCode::INTERNAL_SERVER_ERROR
        ));
        assert_eq!(
            h.view.calls(),
            vec![ViewCall::TopicListError(TOPIC_LIST_ERROR_MESSAGE.to_string())]
        );
        assert!(h.view.toasts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_intro_scenario_reveals_faqs_after_narration_ends() {
        let mut api = MockTopicApi::new();
        api.expect_get_topic()
            .withf(|id| id == "1")
            .returning(|_| Ok(intro_topic()));
        let h = harness(api);

        assert_eq!(h.controller.select_topic("1").await, Selection::Rendered);

        let calls = h.view.calls();
        assert!(calls.contains(&ViewCall::Topic {
            title: "Intro".into(),
            badge: "EN".into(),
            text: "Hello".into(),
        }));
        assert!(calls.contains(&ViewCall::FaqList(vec!["Q1".to_string()])));
        assert!(calls.contains(&ViewCall::Player));
        assert_eq!(h.view.faq_list_visible(), Some(false));
        assert_eq!(h.view.active_topic(), Some("1".to_string()));
        assert_eq!(h.controller.phase().await, PlaybackPhase::PlayingTopicAudio);

        assert_eq!(h.audio.source(), Some("/a1.mp3".to_string()));
        assert_eq!(h.audio.loads(), 1);
        assert_eq!(h.audio.plays(), 1);
        assert_eq!(h.video.source(), Some(DEFAULT_AVATAR_VIDEO.to_string()));
        assert!(h.video.is_looping());

        h.controller.on_audio_play();
        assert_eq!(h.view.speaking(), Some(true));

        h.audio.set_ended(true);
        h.controller.on_audio_pause();
        assert_eq!(h.view.speaking(), Some(true));
        h.controller.on_audio_ended().await;

        assert_eq!(h.view.speaking(), Some(false));
        assert_eq!(h.view.faq_list_visible(), Some(true));
        assert_eq!(h.controller.phase().await, PlaybackPhase::FaqAvailable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reselecting_topic_hides_faqs_again() {
        let mut api = MockTopicApi::new();
        api.expect_get_topic().returning(|_| Ok(intro_topic()));
        let h = harness(api);

        for _ in 0..2 {
            h.controller.select_topic("1").await;
            assert_eq!(h.view.faq_list_visible(), Some(false));
            h.controller.on_audio_ended().await;
            assert_eq!(h.view.faq_list_visible(), Some(true));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_is_cleared_on_success_and_failure() {
        let mut api = MockTopicApi::new();
        api.expect_get_topic()
            .withf(|id| id == "ok")
            .returning(|_| Ok(topic("ok", Some("/ok.mp3"))));
        api.expect_get_topic()
            .withf(|id| id == "bad")
            .returning(|_| Err(status_error(StatusCode::NOT_FOUND)));
        let h = harness(api);

        h.controller.select_topic("ok").await;
        assert_eq!(
            h.view.last_flag(|c| match c {
                ViewCall::Loading(v) => Some(*v),
                _ => None,
            }),
            Some(false)
        );

        h.view.clear();
        assert_eq!(h.controller.select_topic("bad").await, Selection::Failed);
        let calls = h.view.calls();
        assert_eq!(calls.first(), Some(&ViewCall::Loading(true)));
        assert!(calls.contains(&ViewCall::Loading(false)));
        assert_eq!(h.view.toasts(), vec![TOPIC_ERROR_MESSAGE.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_selection_keeps_previous_view_and_highlight() {
        let mut api = MockTopicApi::new();
        api.expect_get_topic()
            .withf(|id| id == "a")
            .returning(|_| Ok(topic("a", Some("/a.mp3"))));
        api.expect_get_topic()
            .withf(|id| id == "b")
            .returning(|_| Err(status_error(StatusCode::BAD_GATEWAY)));
        let h = harness(api);

        h.controller.select_topic("a").await;
        h.controller.on_audio_ended().await;
        h.view.clear();

        h.controller.select_topic("b").await;

        assert_eq!(h.view.active_topic(), Some("a".to_string()));
        assert_eq!(h.controller.phase().await, PlaybackPhase::FaqAvailable);
        assert_eq!(h.controller.current_topic().await.unwrap().id, "a");
        assert!(!h.view.calls().iter().any(|c| matches!(
            c,
            ViewCall::Topic { .. } | ViewCall::FaqListVisible(_) | ViewCall::Player
        )));
        assert_eq!(h.audio.source(), Some("/a.mp3".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_selection_failure_clears_highlight() {
        let mut api = MockTopicApi::new();
        api.expect_get_topic()
            .returning(|_| Err(status_error(StatusCode::NOT_FOUND)));
        let h = harness(api);

        h.controller.select_topic("x").await;
        assert_eq!(h.view.active_topic(), None);
        assert_eq!(h.controller.phase().await, PlaybackPhase::Welcome);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_topic_audio_shows_indicator_without_playing() {
        let mut api = MockTopicApi::new();
        api.expect_get_topic().returning(|_| Ok(topic("n", None)));
        let h = harness(api);

        h.controller.select_topic("n").await;

        assert_eq!(h.view.audio_unavailable(), Some(true));
        assert_eq!(h.audio.plays(), 0);
        assert_eq!(h.audio.source(), None);
        assert_eq!(h.video.plays(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_audio_shows_indicator() {
        let mut api = MockTopicApi::new();
        api.expect_get_topic()
            .returning(|_| Ok(topic("r", Some("/r.mp3"))));
        let h = harness_with(api, FakeMedia::default(), FakeMedia::refusing(1));

        h.controller.select_topic("r").await;
        assert_eq!(h.view.audio_unavailable(), Some(true));
        assert_eq!(h.audio.plays(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_video_retries_muted_then_gives_up_silently() {
        let mut api = MockTopicApi::new();
        api.expect_get_topic()
            .returning(|_| Ok(topic("v", Some("/v.mp3"))));

        let h = harness_with(api, FakeMedia::refusing(1), FakeMedia::default());
        h.controller.select_topic("v").await;
        assert_eq!(h.video.plays(), 1);
        assert!(h.video.is_muted());

        let mut api = MockTopicApi::new();
        api.expect_get_topic()
            .returning(|_| Ok(topic("v", Some("/v.mp3"))));
        let h = harness_with(api, FakeMedia::refusing(2), FakeMedia::default());
        h.controller.select_topic("v").await;
        assert_eq!(h.video.plays(), 0);
        assert!(h.view.toasts().is_empty());
        assert_eq!(h.view.audio_unavailable(), Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn test_topic_video_overrides_default() {
        let mut api = MockTopicApi::new();
        api.expect_get_topic().returning(|_| {
            let mut t = topic("c", Some("/c.mp3"));
            t.avatar_video_url = Some("/static/media/custom.mp4".to_string());
            Ok(t)
        });
        let h = harness(api);

        h.controller.select_topic("c").await;
        assert_eq!(h.video.source(), Some("/static/media/custom.mp4".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_faq_selection_swaps_audio_only() {
        let mut api = MockTopicApi::new();
        api.expect_get_topic().returning(|_| Ok(intro_topic()));
        api.expect_get_faq()
            .withf(|id| id == "10")
            .returning(|id| Ok(faq(id, Some("/faq10.mp3"))));
        let h = harness(api);

        h.controller.select_topic("1").await;
        h.controller.on_audio_ended().await;
        let video_source = h.video.source();

        assert_eq!(h.controller.select_faq("10").await, Selection::Rendered);

        assert_eq!(h.video.source(), video_source);
        assert!(h.video.is_looping());
        assert_eq!(h.video.plays(), 1);
        assert_eq!(h.audio.source(), Some("/faq10.mp3".to_string()));
        assert_eq!(h.audio.plays(), 2);
        assert!(h.view.calls().contains(&ViewCall::FaqAnswer {
            question: "Q1".into(),
            answer: "A1".into()
        }));
        assert!(h.view.calls().contains(&ViewCall::ScrollFaqAnswer));
        assert!(h.controller.is_faq_answer_visible().await);
        assert_eq!(h.controller.phase().await, PlaybackPhase::PlayingFaqAudio);

        h.controller.on_audio_ended().await;
        assert_eq!(h.view.faq_list_visible(), Some(true));
        assert_eq!(h.controller.phase().await, PlaybackPhase::FaqAvailable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_faq_narration_end_does_not_touch_faq_list() {
        let mut api = MockTopicApi::new();
        api.expect_get_topic().returning(|_| Ok(intro_topic()));
        api.expect_get_faq()
            .returning(|id| Ok(faq(id, Some("/faq.mp3"))));
        let h = harness(api);

        h.controller.select_topic("1").await;
        h.controller.on_audio_ended().await;
        h.controller.select_faq("10").await;
        h.view.clear();

        h.controller.on_audio_ended().await;
        assert_eq!(h.view.faq_list_visible(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_faq_without_audio_shows_indicator() {
        let mut api = MockTopicApi::new();
        api.expect_get_topic().returning(|_| Ok(intro_topic()));
        api.expect_get_faq().returning(|id| Ok(faq(id, None)));
        let h = harness(api);

        h.controller.select_topic("1").await;
        h.controller.on_audio_ended().await;
        h.controller.select_faq("10").await;
        assert_eq!(h.view.audio_unavailable(), Some(true));
        assert_eq!(h.audio.source(), Some("/a1.mp3".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_faq_fetch_failure_notifies() {
        let mut api = MockTopicApi::new();
        api.expect_get_topic().returning(|_| Ok(intro_topic()));
        api.expect_get_faq()
            .returning(|_| Err(status_error(StatusCode::NOT_FOUND)));
        let h = harness(api);

        h.controller.select_topic("1").await;
        h.controller.on_audio_ended().await;
        assert_eq!(h.controller.select_faq("10").await, Selection::Failed);
        assert_eq!(h.view.toasts(), vec![FAQ_ERROR_MESSAGE.to_string()]);
        assert_eq!(h.controller.phase().await, PlaybackPhase::FaqAvailable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_faq_selection_before_reveal_is_ignored() {
        let mut api = MockTopicApi::new();
        api.expect_get_topic().returning(|_| Ok(intro_topic()));
        api.expect_get_faq().never();
        let h = harness(api);

        h.controller.select_topic("1").await;
        assert_eq!(h.controller.select_faq("10").await, Selection::Ignored);
        assert_eq!(h.audio.source(), Some("/a1.mp3".to_string()));
        assert_eq!(h.controller.phase().await, PlaybackPhase::PlayingTopicAudio);
        assert!(!h.controller.is_faq_answer_visible().await);

        h.controller.on_audio_ended().await;
        assert_eq!(h.view.faq_list_visible(), Some(true));
        assert_eq!(h.controller.phase().await, PlaybackPhase::FaqAvailable);
    }

    #[tokio::test]
    async fn test_faq_of_another_topic_is_ignored() {
        let mut api = MockTopicApi::new();
        api.expect_get_faq().never();
        let h = harness(api);

        assert_eq!(h.controller.select_faq("10").await, Selection::Ignored);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_faq_answer_hides_panel() {
        let mut api = MockTopicApi::new();
        api.expect_get_topic().returning(|_| Ok(intro_topic()));
        api.expect_get_faq()
            .returning(|id| Ok(faq(id, Some("/faq.mp3"))));
        let h = harness(api);

        h.controller.select_topic("1").await;
        h.controller.on_audio_ended().await;
        h.controller.select_faq("10").await;
        h.controller.close_faq_answer().await;

        assert!(!h.controller.is_faq_answer_visible().await);
        assert_eq!(h.view.calls().last(), Some(&ViewCall::HideFaqAnswer));
    }

    #[tokio::test]
    async fn test_pause_hides_speaking_unless_ended() {
        let h = harness(MockTopicApi::new());

        h.controller.on_audio_play();
        h.controller.on_audio_pause();
        assert_eq!(h.view.speaking(), Some(false));

        h.controller.on_audio_play();
        h.audio.set_ended(true);
        h.controller.on_audio_pause();
        assert_eq!(h.view.speaking(), Some(true));
    }

    #[tokio::test]
    async fn test_audio_error_and_loaded_toggle_indicator() {
        let h = harness(MockTopicApi::new());

        h.controller.on_audio_error("decode failed");
        assert_eq!(h.view.audio_unavailable(), Some(true));
        h.controller.on_audio_loaded();
        assert_eq!(h.view.audio_unavailable(), Some(false));
    }

    #[tokio::test]
    async fn test_end_event_before_any_topic_is_ignored() {
        let h = harness(MockTopicApi::new());

        h.controller.on_audio_ended().await;
        assert_eq!(h.view.faq_list_visible(), None);
        assert_eq!(h.controller.phase().await, PlaybackPhase::Welcome);
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_selection_supersedes_slow_fetch() {
        let mut api = MockTopicApi::new();
        api.expect_get_topic()
            .withf(|id| id == "slow")
            .returning(|_| Ok(topic("slow", Some("/slow.mp3"))));
        api.expect_get_topic()
            .withf(|id| id == "fast")
            .returning(|_| Ok(topic("fast", Some("/fast.mp3"))));
        let api = Arc::new(Gated::new(api));
        let release = api.hold("topic:slow").await;
        let h = harness_from(api, FakeMedia::default(), FakeMedia::default());

        let first = tokio::spawn({
            let controller = h.controller.clone();
            async move { controller.select_topic("slow").await }
        });
        tokio::task::yield_now().await;

        assert_eq!(h.controller.select_topic("fast").await, Selection::Rendered);
        release.send(()).unwrap();
        assert_eq!(first.await.unwrap(), Selection::Superseded);

        assert_eq!(h.controller.current_topic().await.unwrap().id, "fast");
        assert_eq!(h.view.active_topic(), Some("fast".to_string()));
        assert_eq!(h.audio.source(), Some("/fast.mp3".to_string()));
        assert_eq!(
            h.view
                .calls()
                .iter()
                .filter(|c| matches!(c, ViewCall::Topic { .. }))
                .count(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_topic_render_supersedes_faq_of_previous_topic() {
        let mut api = MockTopicApi::new();
        api.expect_get_topic()
            .withf(|id| id == "1")
            .returning(|_| Ok(topic("1", Some("/one.mp3"))));
        api.expect_get_topic()
            .withf(|id| id == "2")
            .returning(|_| Ok(topic("2", Some("/two.mp3"))));
        api.expect_get_faq()
            .returning(|id| Ok(faq(id, Some("/old_faq.mp3"))));
        let api = Arc::new(Gated::new(api));
        let h = harness_from(api.clone(), FakeMedia::default(), FakeMedia::default());

        h.controller.select_topic("1").await;
        h.controller.on_audio_ended().await;

        let release_topic = api.hold("topic:2").await;
        let release_faq = api.hold("faq:1-faq").await;
        let second = tokio::spawn({
            let controller = h.controller.clone();
            async move { controller.select_topic("2").await }
        });
        tokio::task::yield_now().await;
        let old_faq = tokio::spawn({
            let controller = h.controller.clone();
            async move { controller.select_faq("1-faq").await }
        });
        tokio::task::yield_now().await;

        release_topic.send(()).unwrap();
        assert_eq!(second.await.unwrap(), Selection::Rendered);
        release_faq.send(()).unwrap();
        assert_eq!(old_faq.await.unwrap(), Selection::Superseded);

        assert_eq!(h.controller.current_topic().await.unwrap().id, "2");
        assert_eq!(h.audio.source(), Some("/two.mp3".to_string()));
        assert_eq!(h.controller.phase().await, PlaybackPhase::PlayingTopicAudio);
        assert!(!h.controller.is_faq_answer_visible().await);
        assert!(
            !h.view
                .calls()
                .iter()
                .any(|c| matches!(c, ViewCall::FaqAnswer { .. }))
        );

        h.controller.on_audio_ended().await;
        assert_eq!(h.view.faq_list_visible(), Some(true));
        assert_eq!(h.controller.phase().await, PlaybackPhase::FaqAvailable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_narration_replaced_during_settle_delay_is_not_played() {
        let mut api = MockTopicApi::new();
        api.expect_get_topic()
            .withf(|id| id == "1")
            .returning(|_| Ok(intro_topic()));
        api.expect_get_topic()
            .withf(|id| id == "2")
            .returning(|_| Ok(topic("2", Some("/two.mp3"))));
        let h = harness(api);

        let first = tokio::spawn({
            let controller = h.controller.clone();
            async move { controller.select_topic("1").await }
        });
        tokio::task::yield_now().await;
        assert_eq!(h.audio.source(), Some("/a1.mp3".to_string()));

        h.controller.select_topic("2").await;
        first.await.unwrap();

        assert_eq!(h.audio.source(), Some("/two.mp3".to_string()));
        assert_eq!(h.audio.plays(), 1);
    }

    /// Holds chosen fetches until their gate is released. Keys are
    /// `topic:<id>` and `faq:<id>`.
    struct Gated {
        inner: MockTopicApi,
        gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    }

    impl Gated {
        fn new(inner: MockTopicApi) -> Self {
            Self {
                inner,
                gates: Mutex::new(HashMap::new()),
            }
        }

        async fn hold(&self, key: &str) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().await.insert(key.to_string(), rx);
            tx
        }

        async fn wait(&self, key: String) {
            let gate = self.gates.lock().await.remove(&key);
            if let Some(gate) = gate {
                let _ = gate.await;
            }
        }
    }

    #[async_trait::async_trait]
    impl TopicApi for Gated {
        async fn list_topics(&self) -> Result<Vec<TopicSummary>, ApiError> {
            self.inner.list_topics().await
        }

        async fn get_topic(&self, topic_id: &str) -> Result<Topic, ApiError> {
            self.wait(format!("topic:{topic_id}")).await;
            self.inner.get_topic(topic_id).await
        }

        async fn get_faq(&self, faq_id: &str) -> Result<Faq, ApiError> {
            self.wait(format!("faq:{faq_id}")).await;
            self.inner.get_faq(faq_id).await
        }
    }
}
