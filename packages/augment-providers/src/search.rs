use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

use augment_config::ProviderConfig;
use augment_domain::{
	message::RequestContext,
	query::{SearchRequest, SearchResponse},
};

const CURSOR_SUFFIX: &str = "_with_cursor";

pub async fn query(
	cfg: &ProviderConfig,
	ctx: &RequestContext,
	request: &SearchRequest,
) -> Result<SearchResponse> {
	let url = format!("{}{}", cfg.api_base, cfg.path);

	post(cfg, ctx, url, request.to_body()).await
}

pub async fn query_with_cursor(
	cfg: &ProviderConfig,
	ctx: &RequestContext,
	request: &SearchRequest,
) -> Result<SearchResponse> {
	let url = format!("{}{}{CURSOR_SUFFIX}", cfg.api_base, cfg.path);
	let mut body = request.to_body();

	// The cursor endpoint pages by cursor only.
	if let Some(body) = body.as_object_mut() {
		body.remove("offset");
	}

	post(cfg, ctx, url, body).await
}

async fn post(
	cfg: &ProviderConfig,
	ctx: &RequestContext,
	url: String,
	body: Value,
) -> Result<SearchResponse> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let res = client
		.post(url)
		.headers(crate::request_headers(cfg, ctx)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_search_response(json)
}

fn parse_search_response(json: Value) -> Result<SearchResponse> {
	if !json.get("results").is_some_and(Value::is_array) {
		return Err(eyre::eyre!("Search response is missing results array."));
	}

	serde_json::from_value(json)
		.map_err(|err| eyre::eyre!("Search response has an unexpected shape: {err}."))
}
