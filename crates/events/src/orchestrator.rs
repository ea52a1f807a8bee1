//! Typed event orchestration.
//!
//! An explicit, ordered handler registry replaces reflection-style publish:
//! every event is a variant of [`DomainEvent`](crate::DomainEvent), every
//! handler declares which kinds it consumes, and dispatch order is
//! registration order. Handler failures are logged and swallowed — side
//! effects are best-effort/at-least-once, the core mutation they follow is
//! exactly-once and already committed.

use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::bus::{EventBus, Subscription};
use crate::event::{DomainEvent, EventKind};
use crate::in_memory_bus::InMemoryEventBus;

/// A side-effect consumer of domain events (ledger posting, loyalty accrual,
/// notifications, ...). Must be idempotent: delivery is at-least-once.
pub trait EventHandler: Send + Sync {
    /// Stable handler name, used in logs.
    fn name(&self) -> &str;

    /// Which event kinds this handler consumes. Defaults to all.
    fn handles(&self, kind: EventKind) -> bool {
        let _ = kind;
        true
    }

    fn handle(&self, event: &DomainEvent) -> anyhow::Result<()>;
}

/// Ordered list of handlers. Dispatch never fails: a failing handler is
/// logged and skipped, later handlers still run.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Deliver `event` to every interested handler in registration order.
    /// Returns the number of successful deliveries.
    pub fn dispatch(&self, event: &DomainEvent) -> usize {
        let mut delivered = 0;
        for handler in &self.handlers {
            if !handler.handles(event.kind()) {
                continue;
            }
            match handler.handle(event) {
                Ok(()) => delivered += 1,
                Err(error) => {
                    warn!(
                        handler = handler.name(),
                        event = event.event_type(),
                        %error,
                        "event handler failed; side effect skipped"
                    );
                }
            }
        }
        delivered
    }
}

/// Handle to control and join a background dispatch worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn new(shutdown: mpsc::Sender<()>, join: thread::JoinHandle<()>) -> Self {
        Self {
            shutdown,
            join: Some(join),
        }
    }

    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Couples the event queue with the handler registry.
///
/// Processors call [`publish`](Self::publish) after their transaction commits;
/// delivery to handlers happens when the queue is drained, either from a
/// background worker ([`spawn_worker`](Self::spawn_worker)) or synchronously
/// via [`run_pending`](Self::run_pending) (tests, single-threaded embedding).
/// Exactly one of the two drives dispatch; external consumers can attach
/// their own subscriptions via [`subscribe`](Self::subscribe).
pub struct EventOrchestrator {
    bus: Arc<InMemoryEventBus<DomainEvent>>,
    registry: Arc<HandlerRegistry>,
    inbox: Mutex<Option<Subscription<DomainEvent>>>,
}

impl EventOrchestrator {
    pub fn new(registry: HandlerRegistry) -> Self {
        let bus = Arc::new(InMemoryEventBus::new());
        let inbox = bus.subscribe();
        Self {
            bus,
            registry: Arc::new(registry),
            inbox: Mutex::new(Some(inbox)),
        }
    }

    /// Subscribe an external consumer to the raw event stream.
    pub fn subscribe(&self) -> Subscription<DomainEvent> {
        self.bus.subscribe()
    }

    /// Queue an event for fan-out. Never fails the caller.
    pub fn publish(&self, event: DomainEvent) {
        debug!(event = event.event_type(), "publishing domain event");
        if self.bus.publish(event).is_err() {
            warn!("event bus unavailable; event dropped");
        }
    }

    pub fn publish_all(&self, events: impl IntoIterator<Item = DomainEvent>) {
        for event in events {
            self.publish(event);
        }
    }

    /// Drain queued events and dispatch them to handlers synchronously.
    /// Returns the number of events processed. No-op once a worker owns the
    /// queue.
    pub fn run_pending(&self) -> usize {
        let inbox = match self.inbox.lock() {
            Ok(guard) => guard,
            Err(_) => return 0,
        };
        let Some(sub) = inbox.as_ref() else {
            return 0;
        };
        let mut processed = 0;
        while let Ok(event) = sub.try_recv() {
            self.registry.dispatch(&event);
            processed += 1;
        }
        processed
    }

    /// Move dispatch to a background thread with graceful shutdown.
    ///
    /// Panics if the queue was already handed to a worker.
    pub fn spawn_worker(&self, name: &'static str) -> WorkerHandle {
        let sub = self
            .inbox
            .lock()
            .ok()
            .and_then(|mut guard| guard.take())
            .expect("dispatch queue already owned by a worker");
        let registry = Arc::clone(&self.registry);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || dispatch_loop(sub, shutdown_rx, &registry))
            .expect("failed to spawn event dispatch worker thread");

        WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        }
    }
}

fn dispatch_loop(
    sub: Subscription<DomainEvent>,
    shutdown_rx: mpsc::Receiver<()>,
    registry: &HandlerRegistry,
) {
    let tick = Duration::from_millis(50);
    loop {
        if shutdown_rx.try_recv().is_ok() {
            // Drain whatever is already queued before stopping.
            while let Ok(event) = sub.try_recv() {
                registry.dispatch(&event);
            }
            return;
        }
        match sub.recv_timeout(tick) {
            Ok(event) => {
                registry.dispatch(&event);
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kirana_core::ProductId;

    use crate::event::LowStock;

    fn low_stock_event(current_stock: i64) -> DomainEvent {
        DomainEvent::LowStock(LowStock {
            product_id: ProductId::new(),
            product_name: "Atta 5kg".to_string(),
            sku: "ATTA-5".to_string(),
            current_stock,
            threshold: 10,
            occurred_at: Utc::now(),
        })
    }

    struct Recording {
        name: &'static str,
        only: Option<EventKind>,
        seen: Mutex<Vec<DomainEvent>>,
    }

    impl Recording {
        fn new(name: &'static str, only: Option<EventKind>) -> Arc<Self> {
            Arc::new(Self {
                name,
                only,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn count(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    impl EventHandler for Recording {
        fn name(&self) -> &str {
            self.name
        }

        fn handles(&self, kind: EventKind) -> bool {
            self.only.map(|k| k == kind).unwrap_or(true)
        }

        fn handle(&self, event: &DomainEvent) -> anyhow::Result<()> {
            self.seen.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct AlwaysFails;

    impl EventHandler for AlwaysFails {
        fn name(&self) -> &str {
            "always-fails"
        }

        fn handle(&self, _event: &DomainEvent) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("downstream unavailable"))
        }
    }

    #[test]
    fn dispatch_delivers_in_registration_order_and_isolates_failures() {
        let recorder = Recording::new("recorder", None);
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(AlwaysFails));
        registry.register(recorder.clone());

        let delivered = registry.dispatch(&low_stock_event(8));
        // Failing handler is skipped, the recorder still runs.
        assert_eq!(delivered, 1);
        assert_eq!(recorder.count(), 1);
    }

    #[test]
    fn handlers_only_see_kinds_they_declare() {
        let low_stock_only = Recording::new("low-stock-only", Some(EventKind::LowStock));
        let expiry_only = Recording::new("expiry-only", Some(EventKind::ExpirySoon));
        let mut registry = HandlerRegistry::new();
        registry.register(low_stock_only.clone());
        registry.register(expiry_only.clone());

        registry.dispatch(&low_stock_event(5));

        assert_eq!(low_stock_only.count(), 1);
        assert_eq!(expiry_only.count(), 0);
    }

    #[test]
    fn run_pending_drains_the_queue_once() {
        let recorder = Recording::new("recorder", None);
        let mut registry = HandlerRegistry::new();
        registry.register(recorder.clone());
        let orchestrator = EventOrchestrator::new(registry);

        orchestrator.publish(low_stock_event(8));
        orchestrator.publish(low_stock_event(5));

        assert_eq!(orchestrator.run_pending(), 2);
        assert_eq!(orchestrator.run_pending(), 0);
        assert_eq!(recorder.count(), 2);
    }

    #[test]
    fn worker_delivers_then_shuts_down_gracefully() {
        let recorder = Recording::new("recorder", None);
        let mut registry = HandlerRegistry::new();
        registry.register(recorder.clone());
        let orchestrator = EventOrchestrator::new(registry);

        let worker = orchestrator.spawn_worker("event-dispatch-test");
        orchestrator.publish(low_stock_event(8));
        orchestrator.publish(low_stock_event(5));
        worker.shutdown();

        assert_eq!(recorder.count(), 2);
        // Queue is owned by the (now stopped) worker.
        assert_eq!(orchestrator.run_pending(), 0);
    }

    #[test]
    fn external_subscribers_see_the_raw_stream() {
        let orchestrator = EventOrchestrator::new(HandlerRegistry::new());
        let sub = orchestrator.subscribe();

        orchestrator.publish(low_stock_event(3));
        let received = sub.try_recv().unwrap();
        assert_eq!(received.kind(), EventKind::LowStock);
    }
}
