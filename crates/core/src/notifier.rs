//! Transient notifications for recoverable failures.

use crate::platform::{ToastId, TopicView};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Shows auto-dismissing toasts on a `TopicView`.
///
/// Toasts are neither queued nor de-duplicated: two failures in quick
/// succession produce two toasts on screen at the same time.
pub struct Notifier {
    view: Arc<dyn TopicView>,
    next_id: AtomicU64,
    timeout: Duration,
    fade: Duration,
}

impl Notifier {
    pub fn new(view: Arc<dyn TopicView>, timeout: Duration, fade: Duration) -> Self {
        Self {
            view,
            next_id: AtomicU64::new(1),
            timeout,
            fade,
        }
    }

    /// Shows `message` now and schedules its fade and removal.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn notify(&self, message: &str) -> (ToastId, JoinHandle<()>) {
        let id = ToastId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.view.show_toast(id, message);

        let view = self.view.clone();
        let (timeout, fade) = (self.timeout, self.fade);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            view.fade_toast(id);
            tokio::time::sleep(fade).await;
            view.remove_toast(id);
            debug!(%id, "Toast dismissed");
        });
        (id, handle)
    }
}
