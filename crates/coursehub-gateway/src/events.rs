//! Domain event bus.
//!
//! Emitters enqueue [`DomainEvent`]s without waiting; a single dispatcher
//! task drains the queue and hands each event to every subscriber in order.
//! Subscribers are fixed when the bus is built.

use crate::error::GatewayError;
use crate::notify::{Notifier, Target};
use crate::Result;
use async_trait::async_trait;
use coursehub_core::DomainEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Reacts to domain events.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Subscriber name for logs.
    fn name(&self) -> &'static str;

    /// Handle one event.
    async fn on_event(&self, event: &DomainEvent) -> Result<()>;
}

/// Fire-and-forget handle for raising domain events.
#[derive(Clone)]
pub struct Emitter {
    tx: mpsc::UnboundedSender<DomainEvent>,
}

impl Emitter {
    /// Queue an event for the subscribers.
    ///
    /// With `suppress` set the event is dropped here and has no effect at
    /// all. Returns whether the event was queued.
    pub fn emit(&self, event: DomainEvent, suppress: bool) -> bool {
        if suppress {
            debug!("Suppressed {} event", event.name());
            return false;
        }

        let name = event.name();
        match self.tx.send(event) {
            Ok(()) => true,
            Err(_) => {
                warn!("Event bus is closed, dropping {} event", name);
                false
            }
        }
    }
}

/// Drains the queue and fans events out to subscribers.
pub struct EventDispatcher {
    rx: mpsc::UnboundedReceiver<DomainEvent>,
    subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl EventDispatcher {
    /// Run until every emitter has been dropped.
    pub async fn run(mut self) {
        info!(
            "Event dispatcher started with {} subscriber(s)",
            self.subscribers.len()
        );
        while let Some(event) = self.rx.recv().await {
            self.dispatch(&event).await;
        }
        info!("Event dispatcher stopped");
    }

    /// Deliver one event to every subscriber. A failing subscriber does not
    /// stop the others.
    pub async fn dispatch(&self, event: &DomainEvent) {
        debug!("Dispatching {} event", event.name());
        for subscriber in &self.subscribers {
            if let Err(e) = subscriber.on_event(event).await {
                error!(
                    "Subscriber {} failed on {} event: {}",
                    subscriber.name(),
                    event.name(),
                    e
                );
            }
        }
    }
}

/// Build an event bus over an explicit subscriber list.
pub fn event_bus(subscribers: Vec<Arc<dyn EventSubscriber>>) -> (Emitter, EventDispatcher) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Emitter { tx }, EventDispatcher { rx, subscribers })
}

/// Stores and pushes the per-user notifications an event produces.
pub struct NotificationSubscriber {
    notifier: Notifier,
}

impl NotificationSubscriber {
    pub fn new(notifier: Notifier) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl EventSubscriber for NotificationSubscriber {
    fn name(&self) -> &'static str {
        "notifications"
    }

    async fn on_event(&self, event: &DomainEvent) -> Result<()> {
        let mut failed = 0usize;
        for (recipient, payload) in event.notifications() {
            if let Err(e) = self
                .notifier
                .notify(&Target::User(recipient.clone()), payload, false)
                .await
            {
                warn!("Could not notify {} of {}: {}", recipient, event.name(), e);
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(GatewayError::Internal(format!(
                "{} notification(s) not delivered",
                failed
            )));
        }
        Ok(())
    }
}

/// Posts an event's chat announcement into its course room.
pub struct AnnouncementSubscriber {
    notifier: Notifier,
}

impl AnnouncementSubscriber {
    pub fn new(notifier: Notifier) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl EventSubscriber for AnnouncementSubscriber {
    fn name(&self) -> &'static str {
        "announcements"
    }

    async fn on_event(&self, event: &DomainEvent) -> Result<()> {
        if let Some(announcement) = event.announcement()? {
            self.notifier.announce(&announcement).await?;
        }
        Ok(())
    }
}

/// Subscribers wired up by default.
pub fn default_subscribers(notifier: &Notifier) -> Vec<Arc<dyn EventSubscriber>> {
    vec![
        Arc::new(NotificationSubscriber::new(notifier.clone())),
        Arc::new(AnnouncementSubscriber::new(notifier.clone())),
    ]
}
