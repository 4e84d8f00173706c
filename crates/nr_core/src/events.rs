use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

pub const PROCESS_STARTED: &str = "process:started";
pub const PROCESS_FAKE_NEWS_COMPLETE: &str = "process:fake_news_complete";
pub const PROCESS_PLATFORM_COMPLETE: &str = "process:platform_complete";
pub const PROCESS_COMPLETED: &str = "process:completed";
pub const PROCESS_ERROR: &str = "process:error";
pub const AGENT_STATUS: &str = "agent:status";
pub const DISTRIBUTION_STARTED: &str = "distribution:started";
pub const DISTRIBUTION_COMPLETED: &str = "distribution:completed";
pub const DISTRIBUTION_FAILED: &str = "distribution:failed";

/// A named event pushed to one user's live channel.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub event: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(event: &str, data: Value) -> Self {
        Self {
            event: event.to_string(),
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Fire-and-forget delivery of events to a user.
pub trait EventSink: Send + Sync {
    fn emit(&self, user_id: Uuid, event: Event);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _user_id: Uuid, _event: Event) {}
}
