//! A `TopicView` that renders to a plain text stream.

use avatar_teacher_core::{
    ToastId, TopicView,
    topic::{Faq, FaqSummary, Topic, TopicSummary},
};
use std::io::Write;
use std::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct Screen {
    topics: Vec<TopicSummary>,
    active_topic: Option<String>,
    faqs: Vec<FaqSummary>,
    faq_list_visible: bool,
    faq_answer_visible: bool,
    speaking: bool,
    audio_unavailable: bool,
}

/// Writes the player UI as lines of text.
///
/// Topics and FAQs are numbered from 1 so they can be picked with the
/// `t <n>` and `f <n>` commands.
pub struct TerminalView<W: Write + Send> {
    out: Mutex<W>,
    screen: Mutex<Screen>,
}

impl<W: Write + Send> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            screen: Mutex::new(Screen::default()),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn screen(&self) -> std::sync::MutexGuard<'_, Screen> {
        self.screen.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn write_lines(&self, lines: &[String]) {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        for line in lines {
            if let Err(e) = writeln!(out, "{line}") {
                warn!(error = %e, "Failed to write to terminal");
                return;
            }
        }
        let _ = out.flush();
    }

    fn line(&self, line: impl Into<String>) {
        self.write_lines(&[line.into()]);
    }
}

impl<W: Write + Send> TopicView for TerminalView<W> {
    fn show_topics(&self, topics: &[TopicSummary]) {
        let active = {
            let mut screen = self.screen();
            screen.topics = topics.to_vec();
            screen.active_topic.clone()
        };
        let mut lines = vec!["Topics:".to_string()];
        lines.extend(topics.iter().enumerate().map(|(i, t)| {
            let marker = if active.as_deref() == Some(t.id.as_str()) { '*' } else { ' ' };
            format!("{marker} [{}] {} ({})", i + 1, t.title, t.language_label())
        }));
        self.write_lines(&lines);
    }

    fn show_empty_topics(&self, message: &str) {
        self.screen().topics.clear();
        self.line(format!("Topics: {message}"));
    }

    fn show_topic_list_error(&self, message: &str) {
        self.screen().topics.clear();
        self.line(format!("Topics: error: {message}"));
    }

    fn set_active_topic(&self, topic_id: Option<&str>) {
        let title = {
            let mut screen = self.screen();
            if screen.active_topic.as_deref() == topic_id {
                return;
            }
            screen.active_topic = topic_id.map(str::to_string);
            topic_id.and_then(|id| screen.topics.iter().find(|t| t.id == id).map(|t| t.title.clone()))
        };
        match title {
            Some(title) => self.line(format!("* {title}")),
            None => debug!(?topic_id, "Active topic cleared"),
        }
    }

    fn set_loading(&self, loading: bool) {
        if loading {
            self.line("Loading...");
        }
    }

    fn show_player(&self) {
        self.line("-".repeat(40));
    }

    fn show_topic(&self, topic: &Topic, language_label: &str) {
        self.write_lines(&[
            format!("{} [{}]", topic.title, language_label),
            String::new(),
            topic.content_text.clone(),
            String::new(),
        ]);
    }

    fn show_faq_list(&self, faqs: &[FaqSummary]) {
        let mut screen = self.screen();
        screen.faqs = faqs.to_vec();
        screen.faq_list_visible = false;
    }

    fn set_faq_list_visible(&self, visible: bool) {
        let faqs = {
            let mut screen = self.screen();
            let changed = screen.faq_list_visible != visible;
            screen.faq_list_visible = visible;
            if !(changed && visible) || screen.faqs.is_empty() {
                return;
            }
            screen.faqs.clone()
        };
        let mut lines = vec!["FAQs:".to_string()];
        lines.extend(
            faqs.iter()
                .enumerate()
                .map(|(i, f)| format!("  [{}] {}", i + 1, f.question)),
        );
        self.write_lines(&lines);
    }

    fn show_faq_answer(&self, faq: &Faq) {
        self.screen().faq_answer_visible = true;
        self.write_lines(&[
            format!("Q: {}", faq.question),
            format!("A: {}", faq.answer),
        ]);
    }

    fn hide_faq_answer(&self) {
        let was_visible = std::mem::replace(&mut self.screen().faq_answer_visible, false);
        if was_visible {
            self.line("(answer closed)");
        }
    }

    fn scroll_faq_answer_into_view(&self) {}

    fn set_speaking(&self, speaking: bool, status: &str) {
        let changed = std::mem::replace(&mut self.screen().speaking, speaking) != speaking;
        if !changed {
            return;
        }
        if speaking {
            self.line(format!("({status})"));
        } else {
            self.line("(silent)");
        }
    }

    fn set_audio_unavailable(&self, visible: bool) {
        let changed =
            std::mem::replace(&mut self.screen().audio_unavailable, visible) != visible;
        if changed && visible {
            self.line("! Audio unavailable");
        }
    }

    fn show_toast(&self, id: ToastId, message: &str) {
        self.line(format!("[{id}] {message}"));
    }

    fn fade_toast(&self, id: ToastId) {
        debug!(%id, "Toast fading");
    }

    fn remove_toast(&self, id: ToastId) {
        debug!(%id, "Toast removed");
    }
}
