// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process publish/subscribe event bus.
//!
//! Each subscriber owns a bounded queue and a dedicated dispatch task.
//! `publish` only enqueues; it never awaits a handler. History is a
//! best-effort ring buffer for diagnostics, not a durability mechanism —
//! nothing here is written to disk or replayed on startup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::warn;
use vaultflow_core::config::BusConfig;
use vaultflow_core::{Event, EventType, IdGen, UuidIdGen};

/// Implemented by anything that wants to receive dispatched events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: Event);
}

/// Whether a subscriber's dispatch loop awaits its handler before popping
/// the next event (`Synchronous`) or fires the handler on its own task
/// without waiting (`Asynchronous`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    Synchronous,
    Asynchronous,
}

/// One entry retained in the bus's diagnostic history ring buffer.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub seq: u64,
    pub event: Event,
}

/// Result of [`EventBus::shutdown`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ShutdownReport {
    pub drained: usize,
    pub cancelled: usize,
}

struct BoundedQueue {
    capacity: usize,
    items: Mutex<VecDeque<Event>>,
    notify: Notify,
    closed: AtomicBool,
}

impl BoundedQueue {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Push an event, dropping the oldest undelivered one if the queue is
    /// already at capacity. Returns whether a drop occurred.
    fn push(&self, event: Event) -> bool {
        let mut items = self.items.lock();
        let dropped = if items.len() >= self.capacity {
            items.pop_front();
            true
        } else {
            false
        };
        items.push_back(event);
        drop(items);
        self.notify.notify_waiters();
        dropped
    }

    fn len(&self) -> usize {
        self.items.lock().len()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Pop the next event, or `None` once the queue is closed and drained.
    /// Polls on a short timeout rather than relying solely on `Notify` so
    /// a missed wakeup never hangs the dispatch loop.
    async fn pop(&self) -> Option<Event> {
        loop {
            {
                let mut items = self.items.lock();
                if let Some(event) = items.pop_front() {
                    return Some(event);
                }
                if self.closed.load(Ordering::SeqCst) {
                    return None;
                }
            }
            let _ = tokio::time::timeout(Duration::from_millis(50), self.notify.notified()).await;
        }
    }
}

struct Subscriber {
    event_types: Option<HashSet<EventType>>,
    queue: Arc<BoundedQueue>,
    join: Mutex<Option<JoinHandle<()>>>,
    last_overflow: Mutex<Option<DateTime<Utc>>>,
}

impl Subscriber {
    fn matches(&self, event_type: EventType) -> bool {
        match &self.event_types {
            Some(set) => set.contains(&event_type),
            None => true,
        }
    }
}

/// The in-process pub/sub broker described in the component design.
pub struct EventBus {
    source: String,
    subscribers: RwLock<HashMap<String, Arc<Subscriber>>>,
    history: Mutex<VecDeque<HistoryEntry>>,
    history_size: usize,
    queue_capacity: usize,
    next_seq: AtomicU64,
}

impl EventBus {
    pub fn new(source: impl Into<String>, config: &BusConfig) -> Self {
        Self {
            source: source.into(),
            subscribers: RwLock::new(HashMap::new()),
            history: Mutex::new(VecDeque::new()),
            history_size: config.history_size,
            queue_capacity: config.subscriber_queue,
            next_seq: AtomicU64::new(1),
        }
    }

    /// Register a handler against a set of event types (`None` subscribes
    /// to everything). Returns the subscriber id, usable with
    /// [`EventBus::unsubscribe`].
    pub fn subscribe(
        &self,
        event_types: Option<Vec<EventType>>,
        mode: DispatchMode,
        handler: Arc<dyn EventHandler>,
    ) -> String {
        let id = UuidIdGen.next();
        let queue = Arc::new(BoundedQueue::new(self.queue_capacity));
        let loop_queue = queue.clone();

        let join = tokio::spawn(async move {
            while let Some(event) = loop_queue.pop().await {
                match mode {
                    DispatchMode::Synchronous => handler.handle(event).await,
                    DispatchMode::Asynchronous => {
                        let handler = handler.clone();
                        tokio::spawn(async move { handler.handle(event).await });
                    }
                }
            }
        });

        let subscriber = Arc::new(Subscriber {
            event_types: event_types.map(|types| types.into_iter().collect()),
            queue,
            join: Mutex::new(Some(join)),
            last_overflow: Mutex::new(None),
        });

        self.subscribers.write().insert(id.clone(), subscriber);
        id
    }

    /// Stop dispatching to a subscriber and abort its task.
    pub fn unsubscribe(&self, id: &str) {
        if let Some(subscriber) = self.subscribers.write().remove(id) {
            subscriber.queue.close();
            if let Some(join) = subscriber.join.lock().take() {
                join.abort();
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Enqueue `event` for every matching subscriber. Never awaits a
    /// handler. Returns the number of subscribers the event matched.
    pub fn publish(&self, event: Event) -> usize {
        {
            let mut history = self.history.lock();
            let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
            history.push_back(HistoryEntry {
                seq,
                event: event.clone(),
            });
            if history.len() > self.history_size {
                history.pop_front();
            }
        }

        let mut matched = 0;
        let overflowed: Vec<Arc<Subscriber>> = {
            let subscribers = self.subscribers.read();
            let mut overflowed = Vec::new();
            for subscriber in subscribers.values() {
                if subscriber.matches(event.event_type) {
                    matched += 1;
                    if subscriber.queue.push(event.clone()) {
                        overflowed.push(subscriber.clone());
                    }
                }
            }
            overflowed
        };

        for subscriber in overflowed {
            self.record_overflow(&subscriber);
        }

        matched
    }

    fn record_overflow(&self, subscriber: &Subscriber) {
        let now = Utc::now();
        let mut last = subscriber.last_overflow.lock();
        let should_emit = match *last {
            Some(prev) => now - prev >= chrono::Duration::minutes(1),
            None => true,
        };
        if !should_emit {
            return;
        }
        *last = Some(now);
        drop(last);

        warn!(source = %self.source, "subscriber queue overflowed, dropping oldest event");
        let overflow_event = Event::new(EventType::BusOverflow, self.source.clone());
        let mut history = self.history.lock();
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        history.push_back(HistoryEntry {
            seq,
            event: overflow_event,
        });
        if history.len() > self.history_size {
            history.pop_front();
        }
    }

    /// Return history entries with `seq > since`, most recent last,
    /// bounded by `limit`.
    pub fn history(&self, since: u64, limit: usize) -> Vec<HistoryEntry> {
        let history = self.history.lock();
        history
            .iter()
            .filter(|entry| entry.seq > since)
            .rev()
            .take(limit)
            .rev()
            .cloned()
            .collect()
    }

    /// Close every subscriber queue, wait up to `deadline` for in-flight
    /// handlers to finish, then cancel and count whatever remains.
    pub async fn shutdown(&self, deadline: Duration) -> ShutdownReport {
        let subscribers: Vec<Arc<Subscriber>> =
            self.subscribers.write().drain().map(|(_, s)| s).collect();

        for subscriber in &subscribers {
            subscriber.queue.close();
        }

        let mut report = ShutdownReport::default();
        for subscriber in subscribers {
            let join = subscriber.join.lock().take();
            if let Some(join) = join {
                let abort_handle = join.abort_handle();
                match tokio::time::timeout(deadline, join).await {
                    Ok(Ok(())) => report.drained += 1,
                    Ok(Err(_)) => report.drained += 1,
                    Err(_) => {
                        abort_handle.abort();
                        report.cancelled += subscriber.queue.len();
                    }
                }
            }
        }
        report
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
