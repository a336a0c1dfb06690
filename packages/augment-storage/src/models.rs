use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

pub const STATUS_PENDING: &str = "PENDING";
pub const STATUS_FAILED: &str = "FAILED";
pub const STATUS_DONE: &str = "DONE";
pub const STATUS_DEAD: &str = "DEAD";

#[derive(Debug, sqlx::FromRow)]
pub struct ReindexOutboxEntry {
	pub outbox_id: Uuid,
	pub tenant_id: String,
	pub correlation_id: Option<String>,
	pub payload: Value,
	pub headers: Value,
	pub status: String,
	pub attempts: i32,
	pub last_error: Option<String>,
	pub available_at: OffsetDateTime,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

/// A reindex message waiting to be written to the outbox.
#[derive(Clone, Debug)]
pub struct NewReindexJob {
	pub tenant_id: String,
	pub correlation_id: Option<String>,
	pub payload: Value,
	pub headers: Value,
	pub delay_ms: i64,
}

/// Outcome of a failed attempt, as decided by the consumer.
#[derive(Clone, Debug)]
pub struct FailedAttempt {
	pub attempts: i32,
	pub last_error: String,
	pub available_at: OffsetDateTime,
	pub dead: bool,
}
