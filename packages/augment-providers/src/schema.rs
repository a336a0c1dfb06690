use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::{Client, StatusCode};
use serde_json::Value;

use augment_config::ProviderConfig;
use augment_domain::{message::RequestContext, schema::Schema};

/// Loads the flattened schema of a concrete kind. A kind without a schema yields `None`.
pub async fn fetch_schema(
	cfg: &ProviderConfig,
	ctx: &RequestContext,
	kind: &str,
) -> Result<Option<Schema>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}/{kind}", cfg.api_base, cfg.path);
	let res = client.get(url).headers(crate::request_headers(cfg, ctx)?).send().await?;

	if res.status() == StatusCode::NOT_FOUND {
		return Ok(None);
	}

	let json: Value = res.error_for_status()?.json().await?;

	parse_schema_response(kind, json).map(Some)
}

fn parse_schema_response(kind: &str, json: Value) -> Result<Schema> {
	let mut schema: Schema = serde_json::from_value(json)
		.map_err(|err| eyre::eyre!("Schema response for {kind} has an unexpected shape: {err}."))?;

	if schema.kind.is_empty() {
		schema.kind = kind.to_string();
	}

	Ok(schema)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_nested_schema_items() {
		let json = serde_json::json!({
			"kind": "osdu:wks:master-data--Well:1.0.0",
			"schema": [
				{ "path": "FacilityName", "kind": "string" },
				{
					"path": "NameAliases",
					"kind": "nested",
					"properties": [{ "path": "AliasName", "kind": "string" }]
				}
			]
		});
		let schema = parse_schema_response("osdu:wks:master-data--Well:1.0.0", json)
			.expect("Response must parse.");

		assert_eq!(schema.schema.len(), 2);
		assert_eq!(
			schema.schema[1].properties.as_ref().map(|properties| properties[0].path.as_str()),
			Some("AliasName")
		);
	}

	#[test]
	fn fills_in_missing_kind() {
		let schema = parse_schema_response("a:b:c:1.0.0", serde_json::json!({ "kind": "", "schema": [] }))
			.expect("Response must parse.");

		assert_eq!(schema.kind, "a:b:c:1.0.0");
	}
}
