//! Progress channel shared between the work routine and its observer.
//!
//! The channel has rendezvous semantics: a send returns only once the
//! observer has taken the value. It is built on a Tokio `mpsc` channel of
//! capacity one, where the producer re-acquires the single slot after each
//! send and thereby waits for the receiver to drain it.

use super::types::{Percent, ProgressError};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, Mutex as AsyncMutex};

/// Channel carrying progress values from a task to its observer.
#[derive(Debug)]
pub(crate) struct ProgressChannel {
    /// `None` once the channel has been closed.
    tx: Mutex<Option<mpsc::Sender<Percent>>>,
    rx: AsyncMutex<mpsc::Receiver<Percent>>,
}

impl ProgressChannel {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            tx: Mutex::new(Some(tx)),
            rx: AsyncMutex::new(rx),
        }
    }

    /// A channel that is closed from the start.
    pub(crate) fn closed() -> Self {
        let channel = Self::new();
        channel.close();
        channel
    }

    /// Send a value and wait until the observer has received it.
    pub(crate) async fn send(&self, percent: Percent) -> Result<(), ProgressError> {
        let tx = self.sender().ok_or(ProgressError::ChannelClosed)?;
        tx.send(percent)
            .await
            .map_err(|_| ProgressError::ChannelClosed)?;
        // The slot frees up only when the receiver has taken `percent`.
        let _permit = tx
            .reserve()
            .await
            .map_err(|_| ProgressError::ChannelClosed)?;
        Ok(())
    }

    /// Close the channel. Returns `false` if it was already closed.
    pub(crate) fn close(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    fn sender(&self) -> Option<mpsc::Sender<Percent>> {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_closed(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

/// Observer-side handle to a task's progress channel.
///
/// Handles are cheap to clone. Two handles compare equal when they refer
/// to the same underlying channel.
#[derive(Clone)]
pub struct ProgressReceiver {
    channel: Arc<ProgressChannel>,
}

impl ProgressReceiver {
    pub(crate) const fn new(channel: Arc<ProgressChannel>) -> Self {
        Self { channel }
    }

    /// Receive the next progress value.
    ///
    /// Returns `None` once the channel is closed and drained. On a channel
    /// that is never closed this waits until the next value arrives.
    pub async fn recv(&self) -> Option<Percent> {
        self.channel.rx.lock().await.recv().await
    }

    /// Whether the producer side has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }
}

impl PartialEq for ProgressReceiver {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.channel, &other.channel)
    }
}

impl Eq for ProgressReceiver {}

impl fmt::Debug for ProgressReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReceiver")
            .field("channel", &Arc::as_ptr(&self.channel))
            .field("closed", &self.is_closed())
            .finish()
    }
}
