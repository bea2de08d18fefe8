//! Result delivery onto the view's execution queue
//!
//! All interaction with a view goes through one FIFO queue drained by a
//! single task, so tasks reach the view strictly in post order.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tracing::debug;

use crate::error::{Error, Result};

/// The hosting browser view
#[cfg_attr(test, mockall::automock)]
pub trait WebView: Send + Sync {
    /// Evaluate script text in the page
    fn evaluate_javascript(&self, script: &str);

    /// Show a short notification
    fn show_toast(&self, message: &str);

    /// Hide (`true`) or restore (`false`) the system bars
    fn set_full_screen(&self, enable: bool);

    /// Whether the view is hosted by a foreground screen
    fn is_screen(&self) -> bool;
}

/// Unit of work for the view queue
#[derive(Debug)]
pub enum UiTask {
    Evaluate(String),
    Toast(String),
    FullScreen(bool),
    Flush(oneshot::Sender<()>),
}

/// Handle for posting work to a view
#[derive(Debug, Clone)]
pub struct DeliveryChannel {
    tx: mpsc::UnboundedSender<UiTask>,
}

impl DeliveryChannel {
    /// Start the queue task for `view`.
    ///
    /// The task ends once every channel handle has been dropped.
    pub fn attach(view: Arc<dyn WebView>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_queue(view, rx));
        (Self { tx }, handle)
    }

    /// Schedule a script for evaluation
    pub fn post_script(&self, script: String) {
        self.post(UiTask::Evaluate(script));
    }

    /// Schedule a toast
    pub fn post_toast(&self, message: String) {
        self.post(UiTask::Toast(message));
    }

    /// Schedule a full screen toggle
    pub fn post_full_screen(&self, enable: bool) {
        self.post(UiTask::FullScreen(enable));
    }

    /// Wait until every task posted before this call has reached the view
    pub async fn flush(&self) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(UiTask::Flush(done_tx))
            .map_err(|_| Error::ViewDetached)?;
        done_rx.await.map_err(|_| Error::ViewDetached)
    }

    /// Whether the queue task is gone
    pub fn is_detached(&self) -> bool {
        self.tx.is_closed()
    }

    fn post(&self, task: UiTask) {
        if let Err(e) = self.tx.send(task) {
            debug!("View detached, dropping {:?}", e.0);
        }
    }
}

async fn run_queue(view: Arc<dyn WebView>, rx: mpsc::UnboundedReceiver<UiTask>) {
    let mut tasks = UnboundedReceiverStream::new(rx);
    while let Some(task) = tasks.next().await {
        match task {
            UiTask::Evaluate(script) => view.evaluate_javascript(&script),
            UiTask::Toast(message) => view.show_toast(&message),
            UiTask::FullScreen(enable) => {
                if view.is_screen() {
                    view.set_full_screen(enable);
                } else {
                    debug!("Ignoring full screen request outside a screen");
                }
            }
            UiTask::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("View queue closed");
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::WebView;

    /// What a [`RecordingView`] saw, in order
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Seen {
        Script(String),
        Toast(String),
        FullScreen(bool),
    }

    /// View that records every call
    #[derive(Default)]
    pub struct RecordingView {
        pub seen: Mutex<Vec<Seen>>,
        pub screen: bool,
    }

    impl RecordingView {
        pub fn screen() -> Self {
            Self {
                screen: true,
                ..Self::default()
            }
        }

        pub fn scripts(&self) -> Vec<String> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .filter_map(|seen| match seen {
                    Seen::Script(script) => Some(script.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    impl WebView for RecordingView {
        fn evaluate_javascript(&self, script: &str) {
            self.seen.lock().unwrap().push(Seen::Script(script.to_string()));
        }

        fn show_toast(&self, message: &str) {
            self.seen.lock().unwrap().push(Seen::Toast(message.to_string()));
        }

        fn set_full_screen(&self, enable: bool) {
            self.seen.lock().unwrap().push(Seen::FullScreen(enable));
        }

        fn is_screen(&self) -> bool {
            self.screen
        }
    }
}
