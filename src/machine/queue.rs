//! Event queue owned by a machine instance.
//!
//! Firing only sends into an unbounded channel. The receiving half belongs
//! to whichever single consumer currently executes transitions, which keeps
//! "one transition at a time" a property of ownership rather than of locks.

use crate::core::Payload;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

pub(crate) struct QueuedEvent<E> {
    pub(crate) event: E,
    pub(crate) payload: Payload,
}

/// Producer half. Cheap to share between threads.
pub(crate) struct EventSender<E> {
    normal: mpsc::UnboundedSender<QueuedEvent<E>>,
    priority: mpsc::UnboundedSender<QueuedEvent<E>>,
    pending: Arc<AtomicUsize>,
}

/// Consumer half. Priority events are always taken first.
pub(crate) struct EventReceiver<E> {
    normal: mpsc::UnboundedReceiver<QueuedEvent<E>>,
    priority: mpsc::UnboundedReceiver<QueuedEvent<E>>,
    pending: Arc<AtomicUsize>,
}

pub(crate) fn event_queue<E>() -> (EventSender<E>, EventReceiver<E>) {
    let (normal_tx, normal_rx) = mpsc::unbounded_channel();
    let (priority_tx, priority_rx) = mpsc::unbounded_channel();
    let pending = Arc::new(AtomicUsize::new(0));
    (
        EventSender {
            normal: normal_tx,
            priority: priority_tx,
            pending: Arc::clone(&pending),
        },
        EventReceiver {
            normal: normal_rx,
            priority: priority_rx,
            pending,
        },
    )
}

impl<E> EventSender<E> {
    /// Enqueue behind every normal event. Returns false once the consumer
    /// half is gone.
    pub(crate) fn send(&self, event: E, payload: Payload) -> bool {
        self.enqueue(&self.normal, QueuedEvent { event, payload })
    }

    /// Enqueue ahead of every normal event.
    pub(crate) fn send_priority(&self, event: E, payload: Payload) -> bool {
        self.enqueue(&self.priority, QueuedEvent { event, payload })
    }

    fn enqueue(
        &self,
        channel: &mpsc::UnboundedSender<QueuedEvent<E>>,
        queued: QueuedEvent<E>,
    ) -> bool {
        // Counted before the send so a consumer never sees an item it has
        // not been told about.
        self.pending.fetch_add(1, Ordering::SeqCst);
        if channel.send(queued).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return false;
        }
        true
    }

    /// Events sent but not yet taken by the consumer.
    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

impl<E> EventReceiver<E> {
    /// Take the next event without waiting.
    pub(crate) fn try_next(&mut self) -> Option<QueuedEvent<E>> {
        let queued = self
            .priority
            .try_recv()
            .ok()
            .or_else(|| self.normal.try_recv().ok());
        if queued.is_some() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
        queued
    }

    /// Wait for the next event.
    pub(crate) async fn next(&mut self) -> Option<QueuedEvent<E>> {
        let queued = tokio::select! {
            biased;
            Some(queued) = self.priority.recv() => Some(queued),
            Some(queued) = self.normal.recv() => Some(queued),
            else => None,
        };
        if queued.is_some() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
        queued
    }

    /// Drop every queued event. Returns how many were dropped.
    pub(crate) fn discard(&mut self) -> usize {
        let mut dropped = 0;
        while self.try_next().is_some() {
            dropped += 1;
        }
        dropped
    }
}
