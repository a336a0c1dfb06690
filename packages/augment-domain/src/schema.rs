use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
	ASSOCIATED_IDENTITIES,
	configuration::{PropertyConfiguration, PropertyConfigurations, PropertyPath},
	path::{self, ARRAY_SYMBOL, NESTED_DELIMITER},
};

const NESTED_KIND: &str = "nested";
const STRING_KIND: &str = "string";
const STRING_ARRAY_KIND: &str = "[]string";

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SchemaItem {
	pub path: String,
	pub kind: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub properties: Option<Vec<SchemaItem>>,
}
impl SchemaItem {
	pub fn new(path: impl Into<String>, kind: impl Into<String>) -> Self {
		Self { path: path.into(), kind: kind.into(), properties: None }
	}
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Schema {
	pub kind: String,
	#[serde(default)]
	pub schema: Vec<SchemaItem>,
}

/// Projects the declared fields of the record's own schema and of its related kinds' schemas
/// through `configurations`.
///
/// `related` is keyed by the related kind exactly as the configuration names it.
pub fn extend(
	original: &Schema,
	related: &HashMap<String, Schema>,
	configurations: &PropertyConfigurations,
) -> Vec<SchemaItem> {
	let mut items = Vec::new();

	for configuration in &configurations.configurations {
		let related_match = configuration.paths.iter().find_map(|path| {
			let spec = path.related.as_ref()?;

			related.get(&spec.kind).map(|schema| (schema, path))
		});
		let matched = related_match.or_else(|| {
			configuration
				.paths
				.iter()
				.find(|path| path.related.is_none())
				.map(|path| (original, path))
		});

		if let Some((schema, path)) = matched {
			items.extend(configuration_items(schema, configuration, path));
		}
	}

	if configurations.has_child_to_parent() {
		items.push(SchemaItem::new(ASSOCIATED_IDENTITIES, STRING_ARRAY_KIND));
	}

	items
}

fn configuration_items(
	schema: &Schema,
	configuration: &PropertyConfiguration,
	path: &PropertyPath,
) -> Vec<SchemaItem> {
	let value_path = path::strip_data_prefix(&path.value.value_path);
	let mut items = if value_path.contains(ARRAY_SYMBOL) {
		nested_items(&schema.schema, configuration, value_path)
	} else {
		flat_items(&schema.schema, configuration, value_path)
	};

	if items.is_empty() {
		let kind =
			if configuration.policy.is_first_match() { STRING_KIND } else { STRING_ARRAY_KIND };

		items.push(SchemaItem::new(configuration.name.clone(), kind));
	}

	items
}

fn flat_items(
	schema_items: &[SchemaItem],
	configuration: &PropertyConfiguration,
	value_path: &str,
) -> Vec<SchemaItem> {
	schema_items
		.iter()
		.filter(|item| path::is_path_matched(&item.path, value_path))
		.map(|item| SchemaItem {
			path: format!("{}{}", configuration.name, &item.path[value_path.len()..]),
			kind: if configuration.policy.is_first_match() {
				item.kind.clone()
			} else {
				array_kind(&item.kind)
			},
			properties: None,
		})
		.collect()
}

fn nested_items(
	schema_items: &[SchemaItem],
	configuration: &PropertyConfiguration,
	value_path: &str,
) -> Vec<SchemaItem> {
	let Some((prefix, suffix)) = value_path.split_once(NESTED_DELIMITER) else {
		return flat_items(schema_items, configuration, value_path);
	};
	let Some(item) = schema_items.iter().find(|item| item.path == prefix) else {
		return Vec::new();
	};

	match (&item.properties, item.kind.as_str()) {
		(Some(properties), NESTED_KIND) => nested_items(properties, configuration, suffix),
		_ => Vec::new(),
	}
}

fn array_kind(kind: &str) -> String {
	if kind.starts_with(ARRAY_SYMBOL) { kind.to_string() } else { format!("{ARRAY_SYMBOL}{kind}") }
}
