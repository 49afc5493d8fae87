//! Queue event notifications. The store emits an event after every mutation
//! so a UI bridge can mirror queue state; the default sink drops them.

use serde_json::Value;

/// Sink for queue lifecycle events (`item.created`, `item.updated`,
/// `item.deleted`). Implementations must not block.
pub trait QueueNotifier: Send + Sync {
    fn send_event(&self, event: &str, payload: Value);
}

/// Discards all events. Used in tests and when no UI bridge is attached.
pub struct NoopNotifier;

impl QueueNotifier for NoopNotifier {
    fn send_event(&self, _event: &str, _payload: Value) {}
}

/// Logs events at debug level. Handy when diagnosing queue flow without a
/// real bridge.
pub struct LogNotifier;

impl QueueNotifier for LogNotifier {
    fn send_event(&self, event: &str, payload: Value) {
        tracing::debug!(category = "queue", action = event, payload = %payload, "Queue event");
    }
}
