// SPDX-License-Identifier: MPL-2.0

//! Hand a single value from an OS callback thread to a waiting thread.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
    mpsc::{Receiver, SyncSender, sync_channel},
};

use super::CaptureError;

/// Create a connected publisher/waiter pair.
pub fn one_shot<T: Send>() -> (Publisher<T>, Waiter<T>) {
    let (sender, receiver) = sync_channel(1);
    let publisher = Publisher {
        sender,
        published: Arc::new(AtomicBool::new(false)),
    };
    (publisher, Waiter { receiver })
}

pub struct Publisher<T> {
    sender: SyncSender<T>,
    published: Arc<AtomicBool>,
}

impl<T> Publisher<T> {
    /// Whether a value has already been handed over.
    pub fn is_published(&self) -> bool {
        self.published.load(Ordering::Acquire)
    }

    /// Publish `value` unless something was published before.
    /// Returns whether this call delivered it.
    pub fn publish(&self, value: T) -> bool {
        if self.published.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.sender.try_send(value).is_ok()
    }
}

pub struct Waiter<T> {
    receiver: Receiver<T>,
}

impl<T> Waiter<T> {
    /// Block until the value arrives. Fails once every publisher is gone
    /// without having published.
    pub fn wait(self) -> Result<T, CaptureError> {
        self.receiver.recv().map_err(|_| CaptureError::NoFrame)
    }
}
