use futures::StreamExt;
use quipubase_core::SseEvent;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::transport::EventStream;

/// Handle to a running event subscription.
///
/// The reader runs on a spawned task and invokes the callback once per event.
/// Dropping the handle does not stop the reader; call [`Subscription::close`].
pub struct Subscription {
    collection_id: String,
    shutdown: Arc<Notify>,
    // Set by `close`; held by the reader while a callback runs
    closed: Arc<Mutex<bool>>,
    handle: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn spawn<T, F>(
        collection_id: String,
        mut events: EventStream<T>,
        mut callback: F,
    ) -> Self
    where
        T: Send + 'static,
        F: FnMut(SseEvent<T>) + Send + 'static,
    {
        let shutdown = Arc::new(Notify::new());
        let signal = shutdown.clone();
        let closed = Arc::new(Mutex::new(false));
        let gate = closed.clone();
        let id = collection_id.clone();

        let handle = tokio::spawn(async move {
            info!("Subscribed to events of collection {}", id);

            loop {
                tokio::select! {
                    biased;

                    _ = signal.notified() => {
                        info!("Subscription to collection {} closed", id);
                        break;
                    }
                    next = events.next() => match next {
                        Some(Ok(event)) => {
                            let closed = gate.lock().unwrap_or_else(PoisonError::into_inner);
                            if *closed {
                                info!("Subscription to collection {} closed", id);
                                break;
                            }
                            callback(event);
                        }
                        Some(Err(e)) => {
                            error!("Event stream for collection {} failed: {}", id, e);
                            break;
                        }
                        None => {
                            info!("Event stream for collection {} ended", id);
                            break;
                        }
                    }
                }
            }
        });

        Self {
            collection_id,
            shutdown,
            closed,
            handle,
        }
    }

    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    /// Stop the reader. Takes effect immediately, even while a chunk read is pending.
    ///
    /// Waits for a callback that is already running to return; once `close`
    /// returns, the callback is never invoked again. Calling it from inside the
    /// callback deadlocks.
    pub fn close(&self) {
        *self.closed.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.shutdown.notify_one();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait until the reader task has exited
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            error!(
                "Subscription task for collection {} panicked: {}",
                self.collection_id, e
            );
        }
    }
}
