//! Outbound FIFO from the control thread to the remote runtime's execution
//! context.
//!
//! Pushing never blocks and never drops. If the consumer falls behind the
//! channel simply grows; a warning is logged each time the backlog crosses
//! the configured threshold.

use std::cell::{Cell, RefCell};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

/// Producer half, owned by the control thread.
pub struct DeliverySender<T> {
    tx: RefCell<Option<Sender<T>>>,
    backlog_warning: usize,
    warned: Cell<bool>,
    pushed: Cell<u64>,
}

/// Consumer half, handed to whichever context runs the remote runtime.
pub struct DeliveryReceiver<T> {
    rx: Receiver<T>,
}

pub fn delivery_queue<T>(backlog_warning: usize) -> (DeliverySender<T>, DeliveryReceiver<T>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (
        DeliverySender {
            tx: RefCell::new(Some(tx)),
            backlog_warning,
            warned: Cell::new(false),
            pushed: Cell::new(0),
        },
        DeliveryReceiver { rx },
    )
}

impl<T> DeliverySender<T> {
    /// Fire-and-forget enqueue. Items pushed after [`close`](Self::close) or
    /// after the receiver is gone are discarded with a debug log.
    pub fn push(&self, item: T) {
        let tx = self.tx.borrow();
        let Some(tx) = tx.as_ref() else {
            log::debug!("delivery: push after close ignored");
            return;
        };
        if tx.send(item).is_err() {
            log::debug!("delivery: receiver dropped; item discarded");
            return;
        }
        self.pushed.set(self.pushed.get() + 1);

        let len = tx.len();
        if len > self.backlog_warning && !self.warned.get() {
            self.warned.set(true);
            log::warn!(
                "delivery: consumer is {len} items behind (warning threshold {})",
                self.backlog_warning
            );
        } else if len <= self.backlog_warning {
            self.warned.set(false);
        }
    }

    pub fn backlog(&self) -> usize {
        self.tx.borrow().as_ref().map_or(0, Sender::len)
    }

    /// Total items ever pushed.
    pub fn pushed(&self) -> u64 {
        self.pushed.get()
    }

    /// Disconnects the channel; items already queued remain receivable.
    pub fn close(&self) {
        self.tx.borrow_mut().take();
    }
}

impl<T> DeliveryReceiver<T> {
    pub fn try_recv(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Blocks until an item is available, the timeout passes, or the sender
    /// is closed with nothing left to read.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Takes everything currently queued, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
