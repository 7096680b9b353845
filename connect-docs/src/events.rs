//! In-process event bus.
//!
//! Fan-out of [`ConsoleEvent`]s over a tokio broadcast channel. Every
//! subscriber gets its own receiver buffering up to `capacity` events; a
//! subscriber that falls further behind sees `RecvError::Lagged` and loses
//! the oldest events. Nothing is replayed to late subscribers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

connect_core::wire_enum! {
    /// Severity of a user-facing notification.
    pub enum NotificationLevel {
        Info => "info",
        Success => "success",
        Warning => "warning",
        Error => "error",
    }
}

/// Events delivered to console listeners.
///
/// Serialized as `{"type": "document_approved", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ConsoleEvent {
    Notification {
        level: NotificationLevel,
        title: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
    DocumentApproved {
        document_id: String,
        document_name: String,
        approver_id: String,
        /// True once the whole workflow has completed
        workflow_completed: bool,
        timestamp: DateTime<Utc>,
    },
    DocumentRejected {
        document_id: String,
        document_name: String,
        approver_id: String,
        comments: String,
        timestamp: DateTime<Utc>,
    },
    OnboardingStatusUpdate {
        partner_id: String,
        partner_name: String,
        document_id: String,
        status: String,
        workflow: Option<String>,
        timestamp: DateTime<Utc>,
    },
    ContactCreated {
        contact_id: Uuid,
        name: String,
        email: String,
        timestamp: DateTime<Utc>,
    },
    TaskAssigned {
        task_id: Uuid,
        title: String,
        assignee: String,
        due: Option<DateTime<Utc>>,
        timestamp: DateTime<Utc>,
    },
}

impl ConsoleEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            ConsoleEvent::Notification { .. } => "notification",
            ConsoleEvent::DocumentApproved { .. } => "document_approved",
            ConsoleEvent::DocumentRejected { .. } => "document_rejected",
            ConsoleEvent::OnboardingStatusUpdate { .. } => "onboarding_status_update",
            ConsoleEvent::ContactCreated { .. } => "contact_created",
            ConsoleEvent::TaskAssigned { .. } => "task_assigned",
        }
    }

    pub fn notification(level: NotificationLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        ConsoleEvent::Notification {
            level,
            title: title.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Bus counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventStats {
    pub events_sent: u64,
    /// Published while nobody was subscribed
    pub events_unheard: u64,
    pub subscribers: usize,
}

#[derive(Default)]
struct AtomicEventStats {
    events_sent: AtomicU64,
    events_unheard: AtomicU64,
}

/// Cloneable handle to a broadcast channel of console events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<ConsoleEvent>>,
    capacity: usize,
    stats: Arc<AtomicEventStats>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus {
    /// `capacity` is clamped to at least 1 (tokio panics on 0).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            capacity,
            stats: Arc::new(AtomicEventStats::default()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ConsoleEvent>> {
        self.sender.subscribe()
    }

    /// Publish to all current subscribers. Returns how many received it.
    pub fn publish(&self, event: ConsoleEvent) -> usize {
        let name = event.name();
        let count = self.sender.send(Arc::new(event)).unwrap_or(0);
        self.stats.events_sent.fetch_add(1, Ordering::Relaxed);
        if count == 0 {
            self.stats.events_unheard.fetch_add(1, Ordering::Relaxed);
        }
        log::debug!("event {name} delivered to {count} subscriber(s)");
        count
    }

    /// Publish after `delay` on the tokio runtime, simulating a server
    /// round-trip. Must be called from within a runtime.
    pub fn publish_after(&self, event: ConsoleEvent, delay: Duration) -> JoinHandle<usize> {
        let bus = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            bus.publish(event)
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> EventStats {
        EventStats {
            events_sent: self.stats.events_sent.load(Ordering::Relaxed),
            events_unheard: self.stats.events_unheard.load(Ordering::Relaxed),
            subscribers: self.subscriber_count(),
        }
    }
}
