// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use parking_lot::Mutex as PlMutex;
use std::sync::Arc as StdArc;
use vaultflow_core::config::BusConfig;

struct RecordingHandler {
    received: StdArc<PlMutex<Vec<Event>>>,
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle(&self, event: Event) {
        self.received.lock().push(event);
    }
}

fn bus(history_size: usize, queue: usize) -> EventBus {
    EventBus::new(
        "test",
        &BusConfig {
            history_size,
            subscriber_queue: queue,
        },
    )
}

#[tokio::test]
async fn delivers_matching_event_types_only() {
    let bus = bus(100, 16);
    let received = StdArc::new(PlMutex::new(Vec::new()));
    bus.subscribe(
        Some(vec![EventType::PlanCreated]),
        DispatchMode::Synchronous,
        StdArc::new(RecordingHandler {
            received: received.clone(),
        }),
    );

    bus.publish(Event::new(EventType::PlanCreated, "source"));
    bus.publish(Event::new(EventType::ActionGenerated, "source"));

    tokio::time::sleep(Duration::from_millis(50)).await;
    let received = received.lock();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].event_type, EventType::PlanCreated);
}

#[tokio::test]
async fn wildcard_subscriber_receives_everything() {
    let bus = bus(100, 16);
    let received = StdArc::new(PlMutex::new(Vec::new()));
    bus.subscribe(
        None,
        DispatchMode::Synchronous,
        StdArc::new(RecordingHandler {
            received: received.clone(),
        }),
    );

    bus.publish(Event::new(EventType::PlanCreated, "source"));
    bus.publish(Event::new(EventType::ActionGenerated, "source"));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(received.lock().len(), 2);
}

#[tokio::test]
async fn history_retains_last_n_and_respects_since() {
    let bus = bus(2, 16);
    bus.publish(Event::new(EventType::PlanCreated, "a"));
    bus.publish(Event::new(EventType::PlanCreated, "b"));
    bus.publish(Event::new(EventType::PlanCreated, "c"));

    let all = bus.history(0, 10);
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].event.source, "b");
    assert_eq!(all[1].event.source, "c");

    let since_first = bus.history(all[0].seq, 10);
    assert_eq!(since_first.len(), 1);
    assert_eq!(since_first[0].event.source, "c");
}

#[tokio::test]
async fn overflow_drops_oldest_and_emits_bus_overflow() {
    let bus = bus(1000, 2);
    let received = StdArc::new(PlMutex::new(Vec::new()));
    // Slow handler so the queue backs up behind it.
    struct Slow(StdArc<PlMutex<Vec<Event>>>);
    #[async_trait]
    impl EventHandler for Slow {
        async fn handle(&self, event: Event) {
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.0.lock().push(event);
        }
    }
    bus.subscribe(
        Some(vec![EventType::PlanCreated]),
        DispatchMode::Synchronous,
        StdArc::new(Slow(received.clone())),
    );

    for i in 0..5 {
        bus.publish(Event::new(EventType::PlanCreated, format!("ev{i}")));
    }

    let history = bus.history(0, 100);
    let overflow_count = history
        .iter()
        .filter(|h| h.event.event_type == EventType::BusOverflow)
        .count();
    assert_eq!(overflow_count, 1, "overflow should be de-duplicated per minute");
}

#[tokio::test]
async fn unsubscribe_stops_delivery() {
    let bus = bus(100, 16);
    let received = StdArc::new(PlMutex::new(Vec::new()));
    let id = bus.subscribe(
        None,
        DispatchMode::Synchronous,
        StdArc::new(RecordingHandler {
            received: received.clone(),
        }),
    );
    bus.unsubscribe(&id);
    bus.publish(Event::new(EventType::PlanCreated, "source"));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(received.lock().is_empty());
    assert_eq!(bus.subscriber_count(), 0);
}

#[tokio::test]
async fn shutdown_drains_within_deadline() {
    let bus = bus(100, 16);
    let received = StdArc::new(PlMutex::new(Vec::new()));
    bus.subscribe(
        None,
        DispatchMode::Synchronous,
        StdArc::new(RecordingHandler {
            received: received.clone(),
        }),
    );
    bus.publish(Event::new(EventType::PlanCreated, "source"));

    let report = bus.shutdown(Duration::from_secs(1)).await;
    assert_eq!(report.drained, 1);
    assert_eq!(report.cancelled, 0);
    assert_eq!(received.lock().len(), 1);
}
