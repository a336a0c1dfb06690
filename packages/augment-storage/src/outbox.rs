use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
	Error, Result,
	db::Db,
	models::{
		FailedAttempt, NewReindexJob, ReindexOutboxEntry, STATUS_DEAD, STATUS_DONE, STATUS_FAILED,
		STATUS_PENDING,
	},
};

pub async fn enqueue(db: &Db, job: &NewReindexJob) -> Result<Uuid> {
	if job.tenant_id.trim().is_empty() {
		return Err(Error::InvalidArgument("Reindex job tenant_id must be non-empty.".to_string()));
	}
	if job.delay_ms < 0 {
		return Err(Error::InvalidArgument("Reindex job delay_ms must be zero or greater.".to_string()));
	}

	let outbox_id = Uuid::new_v4();
	let now = OffsetDateTime::now_utc();
	let available_at = now + Duration::milliseconds(job.delay_ms);

	sqlx::query(
		"\
INSERT INTO reindex_outbox (
	outbox_id,
	tenant_id,
	correlation_id,
	payload,
	headers,
	status,
	available_at,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)",
	)
	.bind(outbox_id)
	.bind(job.tenant_id.as_str())
	.bind(job.correlation_id.as_deref())
	.bind(&job.payload)
	.bind(&job.headers)
	.bind(STATUS_PENDING)
	.bind(available_at)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(outbox_id)
}

/// Claims the oldest available job and leases it for `lease_seconds`.
pub async fn fetch_next_job(
	db: &Db,
	now: OffsetDateTime,
	lease_seconds: i64,
) -> Result<Option<ReindexOutboxEntry>> {
	let mut tx = db.pool.begin().await?;
	let row = sqlx::query_as::<_, ReindexOutboxEntry>(
		"\
SELECT
	outbox_id,
	tenant_id,
	correlation_id,
	payload,
	headers,
	status,
	attempts,
	last_error,
	available_at,
	created_at,
	updated_at
FROM reindex_outbox
WHERE status IN ('PENDING','FAILED') AND available_at <= $1
ORDER BY available_at ASC
LIMIT 1
FOR UPDATE SKIP LOCKED",
	)
	.bind(now)
	.fetch_optional(&mut *tx)
	.await?;
	let job = if let Some(mut job) = row {
		let lease_until = now + Duration::seconds(lease_seconds);

		sqlx::query(
			"UPDATE reindex_outbox SET available_at = $1, updated_at = $2 WHERE outbox_id = $3",
		)
		.bind(lease_until)
		.bind(now)
		.bind(job.outbox_id)
		.execute(&mut *tx)
		.await?;

		job.available_at = lease_until;
		job.updated_at = now;

		Some(job)
	} else {
		None
	};

	tx.commit().await?;

	Ok(job)
}

pub async fn mark_done(db: &Db, outbox_id: Uuid) -> Result<()> {
	let now = OffsetDateTime::now_utc();
	let result =
		sqlx::query("UPDATE reindex_outbox SET status = $1, updated_at = $2 WHERE outbox_id = $3")
			.bind(STATUS_DONE)
			.bind(now)
			.bind(outbox_id)
			.execute(&db.pool)
			.await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound(format!("Reindex outbox job {outbox_id} does not exist.")));
	}

	Ok(())
}

pub async fn mark_failed(db: &Db, outbox_id: Uuid, failure: &FailedAttempt) -> Result<()> {
	let now = OffsetDateTime::now_utc();
	let status = if failure.dead { STATUS_DEAD } else { STATUS_FAILED };
	let result = sqlx::query(
		"\
UPDATE reindex_outbox
SET status = $1,
	attempts = $2,
	last_error = $3,
	available_at = $4,
	updated_at = $5
WHERE outbox_id = $6",
	)
	.bind(status)
	.bind(failure.attempts)
	.bind(failure.last_error.as_str())
	.bind(failure.available_at)
	.bind(now)
	.bind(outbox_id)
	.execute(&db.pool)
	.await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound(format!("Reindex outbox job {outbox_id} does not exist.")));
	}

	Ok(())
}

pub async fn get_job(db: &Db, outbox_id: Uuid) -> Result<Option<ReindexOutboxEntry>> {
	let row = sqlx::query_as::<_, ReindexOutboxEntry>(
		"\
SELECT
	outbox_id,
	tenant_id,
	correlation_id,
	payload,
	headers,
	status,
	attempts,
	last_error,
	available_at,
	created_at,
	updated_at
FROM reindex_outbox
WHERE outbox_id = $1",
	)
	.bind(outbox_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}
