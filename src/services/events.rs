use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// One-way notifications for external collaborators. Delivery is best
/// effort (at most once) and carries no ordering guarantee across task
/// identities.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SchedulerEvent {
    #[serde(rename_all = "camelCase")]
    OrderScheduled {
        order_id: String,
        task_id: String,
        start_at: String,
        end_at: String,
    },
    #[serde(rename_all = "camelCase")]
    TaskProgressUpdated {
        order_id: String,
        actual_hours: f64,
        status: String,
    },
    #[serde(rename_all = "camelCase")]
    ConflictResolved {
        task_id: String,
        order_id: String,
        start_at: String,
        end_at: String,
    },
    #[serde(rename_all = "camelCase")]
    ConflictUnresolved {
        first_task_id: String,
        second_task_id: String,
    },
    #[serde(rename_all = "camelCase")]
    ScheduleOptimized { considered: usize, merged: usize },
    #[serde(rename_all = "camelCase")]
    DailyWorkloadAssessed {
        date: String,
        recommendation: String,
        advice: String,
    },
}

/// Outbound end of the notification queue. Emitting never blocks and never
/// fails the operation that produced the event.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: UnboundedSender<SchedulerEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, UnboundedReceiver<SchedulerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// A sink with no consumer, for callers that do not care about
    /// notifications.
    pub fn disconnected() -> Self {
        let (sink, _rx) = Self::channel();
        sink
    }

    pub fn emit(&self, event: SchedulerEvent) {
        if self.tx.send(event).is_err() {
            debug!(target: "scheduler::events", "no event consumer attached, notification dropped");
        }
    }
}
