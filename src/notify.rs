// SPDX-License-Identifier: GPL-3.0-only

//! User-visible notifications
//!
//! Decoded payloads are surfaced through a [`Notifier`], normally the
//! desktop notification daemon via notify-rust. All notifications are
//! delivered from one dedicated dispatcher thread: the frame loop hands a
//! message over a bounded channel and returns immediately, so a slow or
//! absent notification daemon never stalls frame processing. Dispatch is
//! fire-and-forget with no ordering guarantee relative to frames.

use crate::constants::notify as defaults;
use std::sync::mpsc::{SyncSender, TrySendError, sync_channel};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Errors from a notification backend
#[derive(Debug, Clone)]
pub struct NotifyError(pub String);

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Notification failed: {}", self.0)
    }
}

impl std::error::Error for NotifyError {}

/// Notification backend interface
///
/// Implementations run on the dispatcher thread only.
pub trait Notifier: Send {
    fn notify(&mut self, summary: &str, body: &str, timeout: Duration) -> Result<(), NotifyError>;
}

/// Desktop notification backend via notify-rust
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&mut self, summary: &str, body: &str, timeout: Duration) -> Result<(), NotifyError> {
        notify_rust::Notification::new()
            .summary(summary)
            .body(body)
            .appname("qrview")
            .timeout(notify_rust::Timeout::Milliseconds(timeout.as_millis() as u32))
            .show()
            .map(|_| ())
            .map_err(|e| NotifyError(e.to_string()))
    }
}

/// Logging-only backend for headless runs (`--no-notify`)
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, summary: &str, body: &str, _timeout: Duration) -> Result<(), NotifyError> {
        info!(summary, body, "Decoded payload");
        Ok(())
    }
}

/// One queued notification
struct Message {
    summary: String,
    body: String,
}

/// Owns the notifier thread and the channel into it
///
/// Dropping the dispatcher closes the channel and joins the thread; any
/// queued messages are still delivered first.
pub struct NotifyDispatcher {
    tx: Option<SyncSender<Message>>,
    handle: Option<JoinHandle<()>>,
    timeout: Duration,
}

impl NotifyDispatcher {
    /// Spawn the dispatcher thread around a notification backend
    pub fn spawn(mut notifier: Box<dyn Notifier>, timeout: Duration) -> Self {
        let (tx, rx) = sync_channel::<Message>(defaults::CHANNEL_CAPACITY);

        let handle = std::thread::spawn(move || {
            debug!("Notification dispatcher started");
            while let Ok(message) = rx.recv() {
                if let Err(e) = notifier.notify(&message.summary, &message.body, timeout) {
                    warn!(error = %e, "Failed to show notification");
                }
            }
            debug!("Notification dispatcher exiting");
        });

        Self {
            tx: Some(tx),
            handle: Some(handle),
            timeout,
        }
    }

    /// Spawn with the default on-screen timeout
    pub fn spawn_default(notifier: Box<dyn Notifier>) -> Self {
        Self::spawn(notifier, defaults::TIMEOUT)
    }

    /// Queue a notification without blocking.
    ///
    /// A full channel drops the message; the next frame will usually carry
    /// the same payload again.
    pub fn dispatch(&self, summary: String, body: String) {
        let Some(tx) = self.tx.as_ref() else {
            return;
        };
        match tx.try_send(Message { summary, body }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!("Notification channel full, dropping message");
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("Notification dispatcher is gone");
            }
        }
    }

    /// Configured on-screen timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Close the channel and wait for queued messages to drain
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        drop(self.tx.take());
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("Notification dispatcher panicked");
        }
    }
}

impl Drop for NotifyDispatcher {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::thread::ThreadId;

    /// Records every delivery with the thread it arrived on
    pub(crate) struct RecordingNotifier {
        pub log: Arc<Mutex<Vec<(String, String, ThreadId)>>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(
            &mut self,
            summary: &str,
            body: &str,
            _timeout: Duration,
        ) -> Result<(), NotifyError> {
            self.log.lock().unwrap().push((
                summary.to_string(),
                body.to_string(),
                std::thread::current().id(),
            ));
            Ok(())
        }
    }

    #[test]
    fn dispatch_delivers_off_the_calling_thread() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = NotifyDispatcher::spawn(
            Box::new(RecordingNotifier { log: log.clone() }),
            Duration::from_millis(10),
        );

        dispatcher.dispatch("QR code".into(), "[HELLO]".into());
        dispatcher.shutdown();

        let entries = log.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "QR code");
        assert_eq!(entries[0].1, "[HELLO]");
        assert_ne!(entries[0].2, std::thread::current().id());
    }

    #[test]
    fn dropping_the_dispatcher_drains_queued_messages() {
        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let dispatcher = NotifyDispatcher::spawn(
                Box::new(RecordingNotifier { log: log.clone() }),
                Duration::from_millis(10),
            );
            dispatcher.dispatch("a".into(), "1".into());
            dispatcher.dispatch("b".into(), "2".into());
        }
        assert_eq!(log.lock().unwrap().len(), 2);
    }
}
