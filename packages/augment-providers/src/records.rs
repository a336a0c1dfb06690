use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use augment_config::ProviderConfig;
use augment_domain::{message::RequestContext, query::SearchRecord};

#[derive(Debug, Deserialize)]
struct RecordsResponse {
	#[serde(default)]
	records: Vec<SearchRecord>,
}

/// Reads the stored data of `ids`. Ids unknown to storage are left out of the result.
pub async fn fetch_records(
	cfg: &ProviderConfig,
	ctx: &RequestContext,
	ids: &[String],
) -> Result<Vec<SearchRecord>> {
	if ids.is_empty() {
		return Ok(Vec::new());
	}

	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({ "records": ids });
	let res = client
		.post(url)
		.headers(crate::request_headers(cfg, ctx)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_records_response(json)
}

fn parse_records_response(json: Value) -> Result<Vec<SearchRecord>> {
	let response: RecordsResponse = serde_json::from_value(json)
		.map_err(|err| eyre::eyre!("Records response has an unexpected shape: {err}."))?;

	Ok(response.records)
}
