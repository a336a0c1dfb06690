use std::{collections::BTreeMap, time::Duration as StdDuration};

use color_eyre::{Result, eyre};
use time::{Duration, OffsetDateTime};
use tokio::time as tokio_time;

use augment_domain::message::{RecordChangedMessages, RequestContext};
use augment_service::{AugmentService, ReindexOutput};
use augment_storage::{
	db::Db,
	models::{FailedAttempt, ReindexOutboxEntry},
	outbox,
};

const BASE_BACKOFF_MS: i64 = 500;
const MAX_BACKOFF_MS: i64 = 30_000;
const MAX_OUTBOX_ERROR_CHARS: usize = 1_024;

pub struct WorkerState {
	pub db: Db,
	pub settings: augment_config::Worker,
	pub service: AugmentService,
}

pub async fn run_worker(state: WorkerState) -> Result<()> {
	tracing::info!(
		poll_interval_ms = state.settings.poll_interval_ms,
		max_attempts = state.settings.max_attempts,
		"Reindex worker started."
	);

	loop {
		match process_outbox_once(&state).await {
			Ok(true) => continue,
			Ok(false) => {},
			Err(err) => {
				tracing::error!(error = %err, "Reindex outbox processing failed.");
			},
		}

		tokio_time::sleep(StdDuration::from_millis(state.settings.poll_interval_ms)).await;
	}
}

/// Claims and runs at most one job. Returns whether a job was claimed.
pub async fn process_outbox_once(state: &WorkerState) -> Result<bool> {
	let now = OffsetDateTime::now_utc();
	let Some(job) =
		outbox::fetch_next_job(&state.db, now, state.settings.claim_lease_seconds).await?
	else {
		return Ok(false);
	};

	match handle_job(&state.service, &job).await {
		Ok(output) => {
			outbox::mark_done(&state.db, job.outbox_id).await?;

			tracing::info!(
				outbox_id = %job.outbox_id,
				tenant = %job.tenant_id,
				records = output.records.len(),
				propagated = output.propagation.records,
				"Reindex job done."
			);
		},
		Err(err) => {
			let failure = failed_attempt(
				job.attempts,
				state.settings.max_attempts,
				&err,
				OffsetDateTime::now_utc(),
			);

			outbox::mark_failed(&state.db, job.outbox_id, &failure).await?;

			tracing::error!(
				error = %err,
				outbox_id = %job.outbox_id,
				attempts = failure.attempts,
				dead = failure.dead,
				"Outbox job failed."
			);
		},
	}

	Ok(true)
}

async fn handle_job(service: &AugmentService, job: &ReindexOutboxEntry) -> Result<ReindexOutput> {
	let message = decode_message(job)?;
	let ctx = RequestContext::from_attributes(&message.attributes).unwrap_or_else(|| {
		RequestContext::new(job.tenant_id.clone(), job.correlation_id.clone().unwrap_or_default())
	});

	Ok(service.reindex(&ctx, &message).await?)
}

/// Payload of a job, with the stored headers filling attributes the payload lacks.
fn decode_message(job: &ReindexOutboxEntry) -> Result<RecordChangedMessages> {
	let mut message: RecordChangedMessages = serde_json::from_value(job.payload.clone())
		.map_err(|err| eyre::eyre!("Failed to decode reindex payload: {err}."))?;
	let headers: BTreeMap<String, String> = if job.headers.is_null() {
		BTreeMap::new()
	} else {
		serde_json::from_value(job.headers.clone())
			.map_err(|err| eyre::eyre!("Failed to decode reindex headers: {err}."))?
	};

	for (key, value) in headers {
		message.attributes.entry(key).or_insert(value);
	}

	if message.data.is_empty() {
		return Err(eyre::eyre!("Reindex payload lists no records."));
	}

	Ok(message)
}

fn failed_attempt(
	attempts: i32,
	max_attempts: i32,
	err: &color_eyre::Report,
	now: OffsetDateTime,
) -> FailedAttempt {
	let next_attempts = attempts.saturating_add(1);

	FailedAttempt {
		attempts: next_attempts,
		last_error: sanitize_outbox_error(&err.to_string()),
		available_at: now + backoff_for_attempt(next_attempts),
		dead: next_attempts >= max_attempts,
	}
}

fn sanitize_outbox_error(text: &str) -> String {
	let mut parts = Vec::new();
	let mut redact_next = false;

	for raw in text.split_whitespace() {
		let mut word = raw.to_string();

		if redact_next {
			word = "[REDACTED]".to_string();
			redact_next = false;
		}
		if raw.eq_ignore_ascii_case("bearer") {
			redact_next = true;
		}

		let lowered = raw.to_ascii_lowercase();

		for key in ["api_key", "apikey", "password", "secret", "token"] {
			if lowered.contains(key) && (lowered.contains('=') || lowered.contains(':')) {
				let sep = if raw.contains('=') { '=' } else { ':' };
				let prefix = raw.split(sep).next().unwrap_or(raw);

				word = format!("{prefix}{sep}[REDACTED]");

				break;
			}
		}

		parts.push(word);
	}

	let mut out = parts.join(" ");

	if out.chars().count() > MAX_OUTBOX_ERROR_CHARS {
		out = out.chars().take(MAX_OUTBOX_ERROR_CHARS).collect();
		out.push_str("...");
	}

	out
}

fn backoff_for_attempt(attempt: i32) -> Duration {
	let attempts = attempt.max(1) as u32;
	let exp = attempts.saturating_sub(1).min(6);
	let base = BASE_BACKOFF_MS.saturating_mul(1 << exp);

	Duration::milliseconds(base.min(MAX_BACKOFF_MS))
}
