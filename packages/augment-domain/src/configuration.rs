use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
	kind,
	path::{self, ARRAY_SYMBOL, NESTED_DELIMITER},
};

const RELATED_OBJECTS_SPEC: &str = "RelatedObjectsSpec";
const VALUE_EXTRACTION: &str = "ValueExtraction";

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Direction {
	ChildToParent,
	ParentToChildren,
}
impl Direction {
	pub fn parse(raw: &str) -> Option<Self> {
		let raw = raw.trim();

		if raw.eq_ignore_ascii_case("ChildToParent") {
			Some(Self::ChildToParent)
		} else if raw.eq_ignore_ascii_case("ParentToChildren") {
			Some(Self::ParentToChildren)
		} else {
			None
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::ChildToParent => "ChildToParent",
			Self::ParentToChildren => "ParentToChildren",
		}
	}
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Policy {
	ExtractFirstMatch,
	ExtractAllMatches,
}
impl Policy {
	pub fn parse(raw: &str) -> Option<Self> {
		let raw = raw.trim();

		if raw.eq_ignore_ascii_case("ExtractFirstMatch") {
			Some(Self::ExtractFirstMatch)
		} else if raw.eq_ignore_ascii_case("ExtractAllMatches") {
			Some(Self::ExtractAllMatches)
		} else {
			None
		}
	}

	pub fn is_first_match(self) -> bool {
		matches!(self, Self::ExtractFirstMatch)
	}
}

/// Filters array elements before extraction. The condition path addresses a sibling of the
/// filtered path inside the same array element.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RelatedCondition {
	pub path: String,
	pub matches: Vec<String>,
}
impl RelatedCondition {
	fn for_property(
		property: &str,
		condition_path: Option<&str>,
		matches: &[String],
	) -> Option<Self> {
		let condition_path = path::strip_data_prefix(condition_path?.trim());

		if property.is_empty() || condition_path.is_empty() || matches.is_empty() {
			return None;
		}

		for candidate in [property, condition_path] {
			if !candidate.find(NESTED_DELIMITER).is_some_and(|index| index > 0)
				|| candidate.ends_with(ARRAY_SYMBOL)
			{
				return None;
			}
		}

		let property_parts = property.split(NESTED_DELIMITER).collect::<Vec<_>>();
		let condition_parts = condition_path.split(NESTED_DELIMITER).collect::<Vec<_>>();

		if property_parts.len() != condition_parts.len() || property_parts.len() < 2 {
			return None;
		}

		let depth = property_parts.len() - 1;

		if property_parts[..depth] != condition_parts[..depth] {
			return None;
		}

		Some(Self { path: condition_path.to_string(), matches: matches.to_vec() })
	}
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValueExtraction {
	pub value_path: String,
	pub condition: Option<RelatedCondition>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RelatedObjectsSpec {
	pub direction: Direction,
	/// Kind-with-major (or concrete kind) of the related records.
	pub kind: String,
	/// Path of the related id in the child record, without the `data.` prefix.
	pub id_path: String,
	pub condition: Option<RelatedCondition>,
}
impl RelatedObjectsSpec {
	/// Search field holding the parent id on a child record.
	pub fn id_field(&self) -> String {
		format!("data.{}", self.id_path)
	}
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PropertyPath {
	pub related: Option<RelatedObjectsSpec>,
	pub value: ValueExtraction,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PropertyConfiguration {
	/// Target property name, without the `data.` prefix.
	pub name: String,
	pub policy: Policy,
	pub paths: Vec<PropertyPath>,
}

/// Configuration document for one kind, reduced to its valid entries.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PropertyConfigurations {
	pub code: String,
	pub name: Option<String>,
	pub configurations: Vec<PropertyConfiguration>,
}
impl PropertyConfigurations {
	pub fn related_kinds(&self) -> BTreeSet<String> {
		self.related_paths().map(|(_, related)| related.kind.clone()).collect()
	}

	pub fn has_child_to_parent(&self) -> bool {
		self.related_paths().any(|(_, related)| related.direction == Direction::ChildToParent)
	}

	/// True when a ChildToParent path of this configuration points at `parent_kind`.
	pub fn references_parent(&self, parent_kind: &str) -> bool {
		self.related_paths().any(|(_, related)| {
			related.direction == Direction::ChildToParent
				&& kind::has_same_major_kind(&related.kind, parent_kind)
		})
	}

	/// ParentToChildren relationships in which `child_kind` is the child, merged per parent id path.
	pub fn parent_child_specs(&self, child_kind: &str) -> Vec<ParentChildRelationshipSpec> {
		let Some(child_kind_with_major) = kind::kind_with_major(child_kind) else {
			return Vec::new();
		};
		let specs = self
			.configurations
			.iter()
			.flat_map(|configuration| configuration.paths.iter())
			.filter_map(|path| {
				let related = path.related.as_ref()?;

				(related.direction == Direction::ParentToChildren
					&& kind::has_same_major_kind(&related.kind, &child_kind_with_major))
				.then(|| ParentChildRelationshipSpec {
					parent_kind: self.code.clone(),
					child_kind: child_kind_with_major.clone(),
					parent_object_id_path: related.id_path.clone(),
					child_value_paths: vec![path.value.value_path.clone()],
				})
			});

		ParentChildRelationshipSpec::merge(Vec::new(), specs)
	}

	/// True when this configuration extends a property of `parent_kind` that overlaps one of
	/// `updated_properties`.
	pub fn extends_changed_parent(&self, parent_kind: &str, updated_properties: &[String]) -> bool {
		self.related_paths().any(|(path, related)| {
			kind::has_same_major_kind(&related.kind, parent_kind)
				&& updated_properties
					.iter()
					.any(|property| paths_overlap(property, &path.value.value_path))
		})
	}

	fn related_paths(&self) -> impl Iterator<Item = (&PropertyPath, &RelatedObjectsSpec)> {
		self.configurations
			.iter()
			.flat_map(|configuration| configuration.paths.iter())
			.filter_map(|path| path.related.as_ref().map(|related| (path, related)))
	}
}

/// A parent kind whose configuration pulls values out of a child kind.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ParentChildRelationshipSpec {
	pub parent_kind: String,
	pub child_kind: String,
	pub parent_object_id_path: String,
	pub child_value_paths: Vec<String>,
}
impl ParentChildRelationshipSpec {
	/// Merges specs equal on parent kind, child kind and id path by unioning their value paths.
	pub fn merge(mut merged: Vec<Self>, specs: impl IntoIterator<Item = Self>) -> Vec<Self> {
		for spec in specs {
			let existing = merged.iter_mut().find(|candidate| {
				candidate.parent_kind == spec.parent_kind
					&& candidate.child_kind == spec.child_kind
					&& candidate.parent_object_id_path == spec.parent_object_id_path
			});

			match existing {
				Some(existing) => {
					for value_path in spec.child_value_paths {
						if !existing.child_value_paths.contains(&value_path) {
							existing.child_value_paths.push(value_path);
						}
					}
				},
				None => merged.push(spec),
			}
		}

		merged
	}

	/// Search field holding the parent id on a child record.
	pub fn parent_id_field(&self) -> String {
		format!("data.{}", self.parent_object_id_path)
	}

	/// True when one of the updated child properties feeds the parent's extended values.
	pub fn is_affected_by(&self, updated_properties: &[String]) -> bool {
		updated_properties.iter().any(|property| {
			self.child_value_paths.iter().any(|value_path| paths_overlap(property, value_path))
		})
	}
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfigurationRejection {
	InvalidCode { code: String },
	NoValidConfiguration,
}
impl fmt::Display for ConfigurationRejection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::InvalidCode { code } => write!(
				f,
				"The code '{code}' is invalid. It must be a kind with major version ending with '.'."
			),
			Self::NoValidConfiguration => write!(f, "It does not have any valid configuration."),
		}
	}
}

#[derive(Clone, Debug)]
pub struct ValidatedConfigurations {
	pub configurations: PropertyConfigurations,
	/// Number of configuration entries dropped as invalid.
	pub skipped: usize,
}

/// Configuration document as stored, before validity filtering.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PropertyConfigurationsDocument {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub code: Option<String>,
	#[serde(default)]
	pub configurations: Vec<RawPropertyConfiguration>,
}
impl PropertyConfigurationsDocument {
	pub fn from_data(data: &Map<String, Value>) -> serde_json::Result<Self> {
		serde_json::from_value(Value::Object(data.clone()))
	}

	pub fn validate(self) -> Result<ValidatedConfigurations, Vec<ConfigurationRejection>> {
		let code = self.code.unwrap_or_default().trim().to_string();
		let total = self.configurations.len();
		let configurations = self
			.configurations
			.into_iter()
			.filter_map(RawPropertyConfiguration::validate)
			.collect::<Vec<_>>();
		let mut rejections = Vec::new();

		if !kind::is_kind_with_major(&code) {
			rejections.push(ConfigurationRejection::InvalidCode { code: code.clone() });
		}
		if configurations.is_empty() {
			rejections.push(ConfigurationRejection::NoValidConfiguration);
		}
		if !rejections.is_empty() {
			return Err(rejections);
		}

		Ok(ValidatedConfigurations {
			skipped: total - configurations.len(),
			configurations: PropertyConfigurations { code, name: self.name, configurations },
		})
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawPropertyConfiguration {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub policy: Option<String>,
	#[serde(default)]
	pub use_case: Option<String>,
	#[serde(default)]
	pub paths: Vec<RawPropertyPath>,
}
impl RawPropertyConfiguration {
	fn validate(self) -> Option<PropertyConfiguration> {
		let name = path::strip_data_prefix(self.name.as_deref()?.trim()).to_string();
		let policy = Policy::parse(self.policy.as_deref()?)?;
		let paths = self.paths.into_iter().filter_map(RawPropertyPath::validate).collect::<Vec<_>>();

		if name.is_empty() || paths.is_empty() {
			return None;
		}

		Some(PropertyConfiguration { name, policy, paths })
	}
}

/// Accepts both the nested document shape and the flattened dotted keys returned by search.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct RawPropertyPath {
	pub related: Option<RawRelatedObjectsSpec>,
	pub value: Option<RawValueExtraction>,
}
impl RawPropertyPath {
	fn validate(self) -> Option<PropertyPath> {
		let value = self.value?.validate()?;
		let related = match self.related {
			Some(related) => Some(related.validate()?),
			None => None,
		};

		Some(PropertyPath { related, value })
	}
}
impl From<Map<String, Value>> for RawPropertyPath {
	fn from(node: Map<String, Value>) -> Self {
		let related = RawRelatedObjectsSpec {
			direction: section_text(&node, RELATED_OBJECTS_SPEC, "RelationshipDirection"),
			kind: section_text(&node, RELATED_OBJECTS_SPEC, "RelatedObjectKind"),
			id_path: section_text(&node, RELATED_OBJECTS_SPEC, "RelatedObjectID"),
			condition_property: section_text(
				&node,
				RELATED_OBJECTS_SPEC,
				"RelatedConditionProperty",
			),
			condition_matches: section_list(&node, RELATED_OBJECTS_SPEC, "RelatedConditionMatches"),
		};
		let value = RawValueExtraction {
			value_path: section_text(&node, VALUE_EXTRACTION, "ValuePath"),
			condition_property: section_text(&node, VALUE_EXTRACTION, "RelatedConditionProperty"),
			condition_matches: section_list(&node, VALUE_EXTRACTION, "RelatedConditionMatches"),
		};

		Self {
			related: (!related.is_empty()).then_some(related),
			value: (!value.is_empty()).then_some(value),
		}
	}
}

#[derive(Clone, Debug, Default)]
pub struct RawRelatedObjectsSpec {
	pub direction: Option<String>,
	pub kind: Option<String>,
	pub id_path: Option<String>,
	pub condition_property: Option<String>,
	pub condition_matches: Option<Vec<String>>,
}
impl RawRelatedObjectsSpec {
	fn is_empty(&self) -> bool {
		self.direction.is_none()
			&& self.kind.is_none()
			&& self.id_path.is_none()
			&& self.condition_property.is_none()
			&& self.condition_matches.is_none()
	}

	fn validate(self) -> Option<RelatedObjectsSpec> {
		let direction = Direction::parse(self.direction.as_deref()?)?;
		let kind = self.kind?.trim().to_string();
		let id_path = path::strip_data_prefix(self.id_path.as_deref()?.trim()).to_string();

		if kind.is_empty() || id_path.is_empty() {
			return None;
		}

		let condition = RelatedCondition::for_property(
			&id_path,
			self.condition_property.as_deref(),
			self.condition_matches.as_deref().unwrap_or_default(),
		);

		Some(RelatedObjectsSpec { direction, kind, id_path, condition })
	}
}

#[derive(Clone, Debug, Default)]
pub struct RawValueExtraction {
	pub value_path: Option<String>,
	pub condition_property: Option<String>,
	pub condition_matches: Option<Vec<String>>,
}
impl RawValueExtraction {
	fn is_empty(&self) -> bool {
		self.value_path.is_none()
			&& self.condition_property.is_none()
			&& self.condition_matches.is_none()
	}

	fn validate(self) -> Option<ValueExtraction> {
		let value_path = path::strip_data_prefix(self.value_path.as_deref()?.trim()).to_string();

		if value_path.is_empty() {
			return None;
		}

		let condition = RelatedCondition::for_property(
			&value_path,
			self.condition_property.as_deref(),
			self.condition_matches.as_deref().unwrap_or_default(),
		);

		Some(ValueExtraction { value_path, condition })
	}
}

fn paths_overlap(left: &str, right: &str) -> bool {
	path::is_path_matched(left, right) || path::is_path_matched(right, left)
}

fn section_value<'a>(
	node: &'a Map<String, Value>,
	section: &str,
	field: &str,
) -> Option<&'a Value> {
	node.get(section)
		.and_then(Value::as_object)
		.and_then(|inner| inner.get(field))
		.or_else(|| node.get(&format!("{section}.{field}")))
		.filter(|value| !value.is_null())
}

fn section_text(node: &Map<String, Value>, section: &str, field: &str) -> Option<String> {
	section_value(node, section, field).map(path::value_string)
}

fn section_list(node: &Map<String, Value>, section: &str, field: &str) -> Option<Vec<String>> {
	section_value(node, section, field)
		.and_then(Value::as_array)
		.map(|items| items.iter().filter(|item| !item.is_null()).map(path::value_string).collect())
}
