//! Change notifications and the single-threaded event loop.
//!
//! Requests run as tokio tasks, but their results are never applied from the
//! task. Each completion is posted to the [`EventLoop`] queue and handled by its
//! owner on the thread that drains the queue, so all state mutation stays
//! serialized.

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use tokio::sync::mpsc;

use crate::service::ServiceEvent;

/// Typed change-notification fan-out.
///
/// Every subscriber receives its own copy of each event, in emission order.
/// Subscribers whose receiver was dropped are forgotten on the next emit.
#[derive(Debug)]
pub struct Emitter<E> {
    subscribers: Vec<mpsc::UnboundedSender<E>>,
}

impl<E> Default for Emitter<E> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<E: Clone> Emitter<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<E> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn emit(&mut self, event: E) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn clear(&mut self) {
        self.subscribers.clear();
    }
}

/// Take everything currently queued on `rx` without waiting.
pub fn drain<E>(rx: &mut mpsc::UnboundedReceiver<E>) -> Vec<E> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Which component issued the request a delivery answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    StateManager,
    WeatherViewModel,
}

#[derive(Debug, Clone)]
pub struct Delivery {
    pub origin: Origin,
    pub event: ServiceEvent,
}

/// Posting side of the event loop, bound to one origin.
#[derive(Debug, Clone)]
pub struct EventSender {
    origin: Origin,
    tx: mpsc::UnboundedSender<Delivery>,
    in_flight: Arc<AtomicUsize>,
}

/// Returned by [`EventSender::spawn`] when there is no runtime to run the request on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Weather service not initialized")]
pub struct NoRuntime;

impl EventSender {
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Enqueue an event immediately.
    pub fn post(&self, event: ServiceEvent) {
        let delivery = Delivery {
            origin: self.origin,
            event,
        };
        if self.tx.send(delivery).is_err() {
            tracing::debug!("Event loop closed; dropping {:?} event", self.origin);
        }
    }

    /// Run `request` on the current tokio runtime and enqueue its result.
    ///
    /// The request counts as in flight until its event is queued.
    pub fn spawn<F>(&self, request: F) -> Result<(), NoRuntime>
    where
        F: Future<Output = ServiceEvent> + Send + 'static,
    {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| NoRuntime)?;

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let sender = self.clone();
        handle.spawn(async move {
            let event = request.await;
            sender.post(event);
            sender.in_flight.fetch_sub(1, Ordering::SeqCst);
        });

        Ok(())
    }
}

/// The queue every asynchronous completion is delivered through.
#[derive(Debug)]
pub struct EventLoop {
    tx: mpsc::UnboundedSender<Delivery>,
    rx: mpsc::UnboundedReceiver<Delivery>,
    in_flight: Arc<AtomicUsize>,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn sender(&self, origin: Origin) -> EventSender {
        EventSender {
            origin,
            tx: self.tx.clone(),
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    /// Wait for the next delivery.
    pub async fn next(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }

    pub fn try_next(&mut self) -> Option<Delivery> {
        self.rx.try_recv().ok()
    }

    /// Number of spawned requests whose result has not been queued yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// True when nothing is queued and nothing is running.
    pub fn is_idle(&self) -> bool {
        self.in_flight() == 0 && self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ErrorPayload, WeatherPayload};

    fn loaded(msg: &str) -> ServiceEvent {
        ServiceEvent::DataLoaded(WeatherPayload::Error(ErrorPayload::new(msg)))
    }

    #[test]
    fn emitter_fans_out_in_order() {
        let mut emitter = Emitter::new();
        let mut a = emitter.subscribe();
        let mut b = emitter.subscribe();

        emitter.emit(1);
        emitter.emit(2);

        assert_eq!(drain(&mut a), vec![1, 2]);
        assert_eq!(drain(&mut b), vec![1, 2]);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut emitter = Emitter::new();
        let a = emitter.subscribe();
        let mut b = emitter.subscribe();
        drop(a);

        emitter.emit("x");

        assert_eq!(emitter.subscriber_count(), 1);
        assert_eq!(drain(&mut b), vec!["x"]);
    }

    #[test]
    fn posted_events_carry_origin() {
        let mut event_loop = EventLoop::new();
        let sender = event_loop.sender(Origin::StateManager);

        sender.post(loaded("a"));

        let delivery = event_loop.try_next().unwrap();
        assert_eq!(delivery.origin, Origin::StateManager);
        assert!(event_loop.is_idle());
    }

    #[test]
    fn spawn_without_runtime_fails() {
        let event_loop = EventLoop::new();
        let sender = event_loop.sender(Origin::WeatherViewModel);

        let result = sender.spawn(async { loaded("never") });

        assert_eq!(result, Err(NoRuntime));
        assert_eq!(event_loop.in_flight(), 0);
    }

    #[tokio::test]
    async fn spawned_request_is_delivered_and_tracked() {
        let mut event_loop = EventLoop::new();
        let sender = event_loop.sender(Origin::WeatherViewModel);

        sender.spawn(async { loaded("done") }).unwrap();

        let delivery = event_loop.next().await.unwrap();
        assert_eq!(delivery.origin, Origin::WeatherViewModel);
        assert!(matches!(
            delivery.event,
            ServiceEvent::DataLoaded(WeatherPayload::Error(ref e)) if e.error == "done"
        ));

        // The counter drops right after the post.
        tokio::task::yield_now().await;
        while event_loop.in_flight() > 0 {
            tokio::task::yield_now().await;
        }
        assert!(event_loop.is_idle());
    }
}
