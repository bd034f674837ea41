//! Reply callbacks.
//!
//! Every inbound event carries a [`ReplyCallback`] that answers in the
//! place the event came from. Replies are fire-and-forget: delivery
//! failures are the platform's concern and never surface to the caller.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::message::ReplyPayload;

/// Sends replies back to the origin of an event.
pub trait ReplyCallback: Send + Sync {
    /// Sends `payload`. Ephemeral replies are only visible to the invoking
    /// user on platforms that support it.
    fn reply(&self, payload: ReplyPayload, ephemeral: bool);

    /// Acknowledges a structured interaction before the handler runs.
    fn acknowledge(&self, _ephemeral: bool) {}
}

/// Shared handle to a reply callback.
pub type BoxedReplyCallback = Arc<dyn ReplyCallback>;

/// A single reply captured by [`BufferedReply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentReply {
    pub payload: ReplyPayload,
    pub ephemeral: bool,
}

/// A reply callback that keeps everything it is asked to send.
///
/// Useful in tests and for platforms that flush replies in batches.
#[derive(Debug, Default)]
pub struct BufferedReply {
    sent: Mutex<Vec<SentReply>>,
    acknowledged: Mutex<Option<bool>>,
}

impl BufferedReply {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Everything sent so far, in order.
    pub fn sent(&self) -> Vec<SentReply> {
        self.sent.lock().clone()
    }

    /// Removes and returns everything sent so far.
    pub fn drain(&self) -> Vec<SentReply> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// `Some(ephemeral)` once the interaction has been acknowledged.
    pub fn acknowledged(&self) -> Option<bool> {
        *self.acknowledged.lock()
    }
}

impl ReplyCallback for BufferedReply {
    fn reply(&self, payload: ReplyPayload, ephemeral: bool) {
        self.sent.lock().push(SentReply { payload, ephemeral });
    }

    fn acknowledge(&self, ephemeral: bool) {
        *self.acknowledged.lock() = Some(ephemeral);
    }
}

/// A reply callback that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReply;

impl ReplyCallback for NoopReply {
    fn reply(&self, _payload: ReplyPayload, _ephemeral: bool) {}
}
