use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::configuration::RelatedCondition;

pub const ARRAY_SYMBOL: &str = "[]";
pub const NESTED_DELIMITER: &str = "[].";

const PROPERTY_DELIMITER: char = '.';
const DATA_PREFIX: &str = "data.";

type Filter<'a> = Option<(&'a str, &'a [String])>;

pub fn strip_data_prefix(path: &str) -> &str {
	path.strip_prefix(DATA_PREFIX).unwrap_or(path)
}

/// True when `path` equals `parent` or lies underneath it. `FacilityNameAlias` does not match
/// `FacilityName`.
pub fn is_path_matched(path: &str, parent: &str) -> bool {
	if path.is_empty() {
		return false;
	}

	path == parent
		|| path
			.strip_prefix(parent)
			.is_some_and(|rest| rest.starts_with(PROPERTY_DELIMITER))
}

/// Flattens nested maps into dot-joined keys. Lists are kept as leaf values.
pub fn flatten(data: &Map<String, Value>) -> Map<String, Value> {
	let mut out = Map::new();

	flatten_into(data, "", &mut out);

	out
}

/// Returns the values at `path`, de-duplicated and sorted by their string form.
pub fn extract(
	data: &Map<String, Value>,
	path: &str,
	condition: Option<&RelatedCondition>,
	first_match_only: bool,
) -> Vec<Value> {
	let properties = extract_properties(data, path, condition, first_match_only);
	let mut values = Vec::new();

	for value in properties.into_values() {
		match value {
			Value::Array(items) => values.extend(items),
			other => values.push(other),
		}
	}

	sort_unique(values)
}

/// Same traversal as [`extract`], but keeps the source path of every value so callers can rename
/// it. Non-array paths under `ExtractAllMatches` always yield lists.
pub fn extract_properties(
	data: &Map<String, Value>,
	path: &str,
	condition: Option<&RelatedCondition>,
	first_match_only: bool,
) -> Map<String, Value> {
	let path = strip_data_prefix(path);
	let filter = condition
		.map(|condition| (strip_data_prefix(&condition.path), condition.matches.as_slice()));

	if data.is_empty() || path.is_empty() {
		return Map::new();
	}
	if path.contains(ARRAY_SYMBOL) {
		return nested_values(data, path, filter, first_match_only);
	}

	let values = flat_values(data, path, filter);

	if first_match_only {
		return values;
	}

	values
		.into_iter()
		.map(|(key, value)| match value {
			Value::Array(_) => (key, value),
			other => (key, Value::Array(vec![other])),
		})
		.collect()
}

/// Renames extracted keys from `value_path` to `name`, preserving any trailing sub-path.
pub fn rename_properties(
	name: &str,
	value_path: &str,
	values: Map<String, Value>,
) -> Map<String, Value> {
	let name = strip_data_prefix(name);
	let value_path = strip_data_prefix(value_path);

	if name.is_empty() || value_path.is_empty() {
		return Map::new();
	}

	values
		.into_iter()
		.filter(|(key, _)| is_path_matched(key, value_path))
		.map(|(key, value)| (format!("{name}{}", &key[value_path.len()..]), value))
		.collect()
}

/// Merges `from` into `to`. Colliding keys become the sorted union of both sides.
pub fn combine(to: &mut Map<String, Value>, from: Map<String, Value>) {
	for (key, value) in from {
		let Some(existing) = to.remove(&key) else {
			to.insert(key, value);

			continue;
		};
		let mut values = Vec::new();

		for side in [existing, value] {
			match side {
				Value::Array(items) => values.extend(items),
				other => values.push(other),
			}
		}

		to.insert(key, Value::Array(sort_unique(values)));
	}
}

/// Property paths that differ between two versions of a record's data, sorted.
pub fn changed_properties(
	previous: &Map<String, Value>,
	current: &Map<String, Value>,
) -> Vec<String> {
	let mut changed = BTreeSet::new();

	collect_changes(previous, current, "", &mut changed);

	changed.into_iter().collect()
}

pub fn value_string(value: &Value) -> String {
	match value {
		Value::String(text) => text.clone(),
		other => other.to_string(),
	}
}

pub fn sort_unique(values: Vec<Value>) -> Vec<Value> {
	let mut keyed =
		values.into_iter().map(|value| (value_string(&value), value)).collect::<Vec<_>>();

	keyed.sort_by(|left, right| {
		left.0.cmp(&right.0).then_with(|| left.1.to_string().cmp(&right.1.to_string()))
	});
	keyed.dedup_by(|left, right| left.1 == right.1);

	keyed.into_iter().map(|(_, value)| value).collect()
}

fn flatten_into(data: &Map<String, Value>, prefix: &str, out: &mut Map<String, Value>) {
	for (key, value) in data {
		let path = format!("{prefix}{key}");

		match value {
			Value::Object(inner) if !inner.is_empty() => {
				flatten_into(inner, &format!("{path}{PROPERTY_DELIMITER}"), out);
			},
			other => {
				out.insert(path, other.clone());
			},
		}
	}
}

fn flat_values(data: &Map<String, Value>, path: &str, filter: Filter<'_>) -> Map<String, Value> {
	let flattened = flatten(data);

	if let Some((condition_path, matches)) = filter {
		let matched = flattened
			.get(condition_path)
			.is_some_and(|value| condition_matches(value, matches));

		if !matched {
			return Map::new();
		}
	}

	flattened
		.into_iter()
		.filter(|(key, value)| !value.is_null() && is_path_matched(key, path))
		.collect()
}

fn nested_values(
	data: &Map<String, Value>,
	path: &str,
	filter: Filter<'_>,
	first_match_only: bool,
) -> Map<String, Value> {
	let Some((prefix, suffix)) = path.split_once(NESTED_DELIMITER) else {
		return flat_values(data, path, filter);
	};
	let inner_filter = match filter {
		Some((condition_path, matches)) => match condition_path.split_once(NESTED_DELIMITER) {
			Some((_, condition_suffix)) => Some((condition_suffix, matches)),
			None => return Map::new(),
		},
		None => None,
	};
	let Some(elements) = lookup(data, prefix).and_then(Value::as_array) else {
		return Map::new();
	};
	let mut out = Map::new();

	for element in elements {
		let Some(element) = element.as_object() else {
			continue;
		};
		let values = nested_values(element, suffix, inner_filter, first_match_only);

		if values.is_empty() {
			continue;
		}

		for (key, value) in values {
			let key = format!("{prefix}{NESTED_DELIMITER}{key}");

			if first_match_only {
				out.insert(key, value);

				continue;
			}

			let slot = out.entry(key).or_insert_with(|| Value::Array(Vec::new()));

			if let Value::Array(items) = slot {
				match value {
					Value::Array(values) => items.extend(values),
					other => items.push(other),
				}
			}
		}

		if first_match_only {
			break;
		}
	}

	if !first_match_only {
		for value in out.values_mut() {
			if let Value::Array(items) = value {
				*items = sort_unique(std::mem::take(items));
			}
		}
	}

	out
}

fn lookup<'a>(data: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
	if let Some(value) = data.get(path) {
		return Some(value);
	}

	let mut segments = path.split(PROPERTY_DELIMITER);
	let mut current = data.get(segments.next()?)?;

	for segment in segments {
		current = current.as_object()?.get(segment)?;
	}

	Some(current)
}

fn condition_matches(value: &Value, matches: &[String]) -> bool {
	match value {
		Value::Array(items) => items.iter().any(|item| condition_matches(item, matches)),
		Value::Null => false,
		other => {
			let text = value_string(other);

			matches.iter().any(|candidate| candidate == &text)
		},
	}
}

fn collect_changes(
	previous: &Map<String, Value>,
	current: &Map<String, Value>,
	prefix: &str,
	changed: &mut BTreeSet<String>,
) {
	let keys = previous.keys().chain(current.keys()).collect::<BTreeSet<_>>();

	for key in keys {
		let path = format!("{prefix}{key}");

		match (previous.get(key), current.get(key)) {
			(Some(left), Some(right)) if left == right => {},
			(Some(Value::Object(left)), Some(Value::Object(right))) => {
				collect_changes(left, right, &format!("{path}{PROPERTY_DELIMITER}"), changed);
			},
			(Some(Value::Array(left)), Some(Value::Array(right))) => {
				if left.len() != right.len() {
					changed.insert(format!("{path}{ARRAY_SYMBOL}"));

					continue;
				}

				for (left, right) in left.iter().zip(right) {
					match (left, right) {
						(Value::Object(left), Value::Object(right)) => collect_changes(
							left,
							right,
							&format!("{path}{NESTED_DELIMITER}"),
							changed,
						),
						(left, right) if left != right => {
							changed.insert(path.clone());
						},
						_ => {},
					}
				}
			},
			(None, Some(Value::Null)) | (Some(Value::Null), None) => {},
			_ => {
				changed.insert(path);
			},
		}
	}
}
