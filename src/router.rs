//! Response routing: correlates incoming frames with pending subscribers.
//!
//! An explicit table keyed by response code, owned by the connection task.
//! One-shot waiters form a FIFO per code and resolve in issue order; a single
//! persistent subscriber per code carries the continuous inventory stream.
//! There is no timeout here — a caller that stops waiting simply drops its
//! receiver, and the dead entry is skipped at dispatch and purged at the next
//! subscription for that code.

use std::collections::{HashMap, VecDeque};

use log::debug;
use tokio::sync::{mpsc, oneshot};

use crate::frame::Frame;

#[derive(Debug, Default)]
pub(crate) struct ResponseRouter {
    one_shot: HashMap<u8, VecDeque<oneshot::Sender<Frame>>>,
    persistent: HashMap<u8, mpsc::UnboundedSender<Frame>>,
}

impl ResponseRouter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a one-shot waiter for `code`, queued in issue order behind
    /// any outstanding waiters for the same code. Waiters whose receiver was
    /// already dropped are purged here.
    pub(crate) fn register(&mut self, code: u8, waiter: oneshot::Sender<Frame>) {
        let queue = self.one_shot.entry(code).or_default();
        queue.retain(|pending| !pending.is_closed());
        queue.push_back(waiter);
    }

    /// Register the persistent subscriber for `code`, replacing any previous one.
    pub(crate) fn subscribe_persistent(&mut self, code: u8) -> mpsc::UnboundedReceiver<Frame> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.persistent.insert(code, tx);
        rx
    }

    /// Deliver a frame to the subscribers registered under its response code:
    /// the persistent subscriber, if live, and the first live one-shot waiter,
    /// which is removed on delivery. Returns whether anyone received it.
    pub(crate) fn dispatch(&mut self, frame: Frame) -> bool {
        let code = frame.response_code();
        let mut delivered = false;

        let mut stream_gone = false;
        if let Some(stream) = self.persistent.get(&code) {
            if stream.send(frame.clone()).is_ok() {
                delivered = true;
            } else {
                stream_gone = true;
            }
        }
        if stream_gone {
            self.persistent.remove(&code);
        }

        if let Some(queue) = self.one_shot.get_mut(&code) {
            while let Some(waiter) = queue.pop_front() {
                if waiter.send(frame.clone()).is_ok() {
                    delivered = true;
                    break;
                }
                // abandoned waiter: skip to the next in line
            }
            if queue.is_empty() {
                self.one_shot.remove(&code);
            }
        }

        if !delivered {
            debug!("no subscriber for response code 0x{:02X}", code);
        }
        delivered
    }

    /// Drop every subscriber, one-shot and persistent. Pending receivers
    /// observe the cancellation as a closed channel.
    pub(crate) fn cancel_all(&mut self) {
        self.one_shot.clear();
        self.persistent.clear();
    }
}
