use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{configuration::Direction, kind};

/// Typed search filter. Renders to the search service's query syntax.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum QueryFilter {
	/// `id: "a"` or `id: ("a" OR "b")`. Trailing id separators are dropped.
	Ids(Vec<String>),
	FieldEquals { field: String, value: String },
	FieldAnyOf { field: String, values: Vec<String> },
	/// Configuration documents with a path whose related kind is `kind`, optionally restricted to
	/// one direction.
	RelatedKind { direction: Option<Direction>, kind: String },
	Or(Vec<QueryFilter>),
}
impl QueryFilter {
	pub fn render(&self) -> String {
		match self {
			Self::Ids(ids) if ids.len() == 1 => {
				format!("id: {}", quote(kind::strip_id_postfix(&ids[0])))
			},
			Self::Ids(ids) => format!("id: ({})", any_of(ids)),
			Self::FieldEquals { field, value } => format!("{field}: {}", quote(value)),
			Self::FieldAnyOf { field, values } => format!("{field}:({})", any_of(values)),
			Self::RelatedKind { direction: Some(direction), kind } => format!(
				"nested(data.Configurations, nested(data.Configurations.Paths, (RelatedObjectsSpec.RelationshipDirection: {} AND RelatedObjectsSpec.RelatedObjectKind:{})))",
				direction.as_str(),
				quote(kind)
			),
			Self::RelatedKind { direction: None, kind } => format!(
				"nested(data.Configurations, nested(data.Configurations.Paths, (RelatedObjectsSpec.RelatedObjectKind:{})))",
				quote(kind)
			),
			Self::Or(filters) => {
				filters.iter().map(Self::render).collect::<Vec<_>>().join(" OR ")
			},
		}
	}
}
impl fmt::Display for QueryFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.render())
	}
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
	Asc,
	Desc,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SortQuery {
	pub field: String,
	pub order: SortOrder,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SearchRequest {
	/// Kind expressions; wildcards allowed. A leading `-` excludes a kind.
	pub kinds: Vec<String>,
	pub query: Option<QueryFilter>,
	pub returned_fields: Vec<String>,
	pub sort: Option<SortQuery>,
	pub limit: u32,
	pub offset: u32,
	pub cursor: Option<String>,
}
impl SearchRequest {
	pub fn new(kinds: Vec<String>, query: Option<QueryFilter>) -> Self {
		Self { kinds, query, ..Default::default() }
	}

	pub fn for_kind(kind: impl Into<String>, query: QueryFilter) -> Self {
		Self::new(vec![kind.into()], Some(query))
	}

	pub fn returning(mut self, fields: &[&str]) -> Self {
		self.returned_fields = fields.iter().map(|field| field.to_string()).collect();

		self
	}

	pub fn sorted_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
		self.sort = Some(SortQuery { field: field.into(), order });

		self
	}

	/// Request body in the search service's JSON shape.
	pub fn to_body(&self) -> Value {
		let mut body = Map::new();
		let kind = match self.kinds.as_slice() {
			[single] => Value::String(single.clone()),
			kinds => Value::Array(kinds.iter().cloned().map(Value::String).collect()),
		};

		body.insert("kind".to_string(), kind);
		body.insert("limit".to_string(), Value::from(self.limit));

		if let Some(query) = &self.query {
			body.insert("query".to_string(), Value::String(query.render()));
		}
		if !self.returned_fields.is_empty() {
			body.insert("returnedFields".to_string(), serde_json::json!(self.returned_fields));
		}
		if let Some(sort) = &self.sort {
			body.insert(
				"sort".to_string(),
				serde_json::json!({ "field": [sort.field], "order": [sort.order] }),
			);
		}
		if self.offset > 0 {
			body.insert("offset".to_string(), Value::from(self.offset));
		}
		if let Some(cursor) = &self.cursor {
			body.insert("cursor".to_string(), Value::String(cursor.clone()));
		}

		Value::Object(body)
	}
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SearchRecord {
	pub id: String,
	pub kind: String,
	#[serde(default)]
	pub data: Map<String, Value>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
	#[serde(default)]
	pub results: Vec<SearchRecord>,
	#[serde(default)]
	pub cursor: Option<String>,
	#[serde(default)]
	pub total_count: u64,
}

fn quote(value: &str) -> String {
	format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn any_of(values: &[String]) -> String {
	values
		.iter()
		.map(|value| quote(kind::strip_id_postfix(value)))
		.collect::<Vec<_>>()
		.join(" OR ")
}
