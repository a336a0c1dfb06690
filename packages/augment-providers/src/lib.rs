pub mod records;
pub mod schema;
pub mod search;

use color_eyre::{Result, eyre};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName};
use serde_json::{Map, Value};

use augment_domain::message::{CORRELATION_ID, DATA_PARTITION_ID, RequestContext};

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(eyre::eyre!("Default header values must be strings."));
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

/// Auth headers plus the partition and correlation headers of `ctx`.
pub fn request_headers(cfg: &augment_config::ProviderConfig, ctx: &RequestContext) -> Result<HeaderMap> {
	let mut headers = auth_headers(&cfg.api_key, &cfg.default_headers)?;

	headers.insert(HeaderName::from_static(DATA_PARTITION_ID), ctx.tenant.parse()?);

	if !ctx.correlation_id.is_empty() {
		headers.insert(HeaderName::from_static(CORRELATION_ID), ctx.correlation_id.parse()?);
	}

	Ok(headers)
}
