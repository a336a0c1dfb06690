use axum::{
	Json, Router,
	extract::State,
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use augment_domain::{
	message::{CORRELATION_ID, DATA_PARTITION_ID, RecordChangedMessages, RequestContext},
	query::SearchRecord,
	schema::{Schema, SchemaItem},
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/records/changed", post(records_changed))
		.route("/v1/augment/preview", post(preview))
		.route("/v1/augment/schema", post(extended_schema))
		.with_state(state)
}

#[derive(Debug, Serialize)]
pub struct ChangeAccepted {
	pub records: usize,
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
	pub record: SearchRecord,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
	pub id: String,
	pub kind: String,
	pub extended: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct SchemaResponse {
	pub kind: String,
	pub items: Vec<SchemaItem>,
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn records_changed(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(mut payload): Json<RecordChangedMessages>,
) -> Result<(StatusCode, Json<ChangeAccepted>), ApiError> {
	for (name, value) in header_attributes(&headers) {
		payload.attributes.entry(name).or_insert(value);
	}

	let ctx = RequestContext::from_attributes(&payload.attributes)
		.map(with_correlation)
		.ok_or_else(missing_partition)?;

	state.service.submit_change(&ctx, &payload).await?;

	tracing::info!(
		tenant = %ctx.tenant,
		records = payload.data.len(),
		"Change event accepted."
	);

	Ok((StatusCode::ACCEPTED, Json(ChangeAccepted { records: payload.data.len() })))
}

async fn preview(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<PreviewRequest>,
) -> Result<Json<PreviewResponse>, ApiError> {
	let ctx = request_context(&headers)?;
	let extended = state.service.extended_properties(&ctx, &payload.record).await;

	Ok(Json(PreviewResponse { id: payload.record.id, kind: payload.record.kind, extended }))
}

async fn extended_schema(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<Schema>,
) -> Result<Json<SchemaResponse>, ApiError> {
	let ctx = request_context(&headers)?;
	let items = state.service.extended_schema(&ctx, &payload).await;

	Ok(Json(SchemaResponse { kind: payload.kind, items }))
}

fn header_attributes(headers: &HeaderMap) -> Vec<(String, String)> {
	[DATA_PARTITION_ID, CORRELATION_ID]
		.into_iter()
		.filter_map(|name| {
			let value = headers.get(name)?.to_str().ok()?.trim();

			(!value.is_empty()).then(|| (name.to_string(), value.to_string()))
		})
		.collect()
}

fn request_context(headers: &HeaderMap) -> Result<RequestContext, ApiError> {
	let attributes = header_attributes(headers).into_iter().collect();

	RequestContext::from_attributes(&attributes).map(with_correlation).ok_or_else(missing_partition)
}

fn with_correlation(mut ctx: RequestContext) -> RequestContext {
	if ctx.correlation_id.is_empty() {
		ctx.correlation_id = Uuid::new_v4().to_string();
	}

	ctx
}

fn missing_partition() -> ApiError {
	json_error(
		StatusCode::BAD_REQUEST,
		"invalid_request",
		format!("The {DATA_PARTITION_ID} header is required."),
	)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}
impl From<augment_service::Error> for ApiError {
	fn from(err: augment_service::Error) -> Self {
		match err {
			augment_service::Error::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message),
			augment_service::Error::Search { message }
			| augment_service::Error::Lookup { message } =>
				json_error(StatusCode::BAD_GATEWAY, "upstream_error", message),
			augment_service::Error::Queue { message } =>
				json_error(StatusCode::SERVICE_UNAVAILABLE, "queue_unavailable", message),
			augment_service::Error::Storage { message }
			| augment_service::Error::Serialization { message } => {
				tracing::error!(error = %message, "Request failed.");

				json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Internal error.")
			},
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError::new(status, code, message)
}
