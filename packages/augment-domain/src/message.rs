use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{kind, path};

pub const DATA_PARTITION_ID: &str = "data-partition-id";
pub const CORRELATION_ID: &str = "correlation-id";
pub const ANCESTRY_KINDS: &str = "ancestry_kinds";

const ANCESTRY_KINDS_DELIMITER: char = ',';

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
	Create,
	Update,
	#[serde(alias = "purge")]
	Delete,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RecordInfo {
	pub id: String,
	pub kind: String,
	pub op: OperationType,
}
impl RecordInfo {
	pub fn new(kind: impl Into<String>, id: impl Into<String>, op: OperationType) -> Self {
		Self { id: id.into(), kind: kind.into(), op }
	}
}

/// Change-event payload. `data` may arrive as a list or as a JSON-encoded string of that list.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct RecordChangedMessages {
	#[serde(default, deserialize_with = "record_infos")]
	pub data: Vec<RecordInfo>,
	#[serde(default)]
	pub attributes: BTreeMap<String, String>,
}
impl RecordChangedMessages {
	pub fn ancestry(&self) -> AncestryTrail {
		self.attributes.get(ANCESTRY_KINDS).map(|raw| AncestryTrail::parse(raw)).unwrap_or_default()
	}

	/// Upserted and deleted ids grouped by kind.
	pub fn kind_ids(&self) -> (BTreeMap<String, Vec<String>>, BTreeMap<String, Vec<String>>) {
		let mut upserted = BTreeMap::<String, Vec<String>>::new();
		let mut deleted = BTreeMap::<String, Vec<String>>::new();

		for record in &self.data {
			let target = match record.op {
				OperationType::Create | OperationType::Update => &mut upserted,
				OperationType::Delete => &mut deleted,
			};
			let ids = target.entry(record.kind.clone()).or_default();

			if !ids.contains(&record.id) {
				ids.push(record.id.clone());
			}
		}

		(upserted, deleted)
	}
}

/// Tenant and correlation identity carried by every outgoing call and emitted message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RequestContext {
	pub tenant: String,
	pub correlation_id: String,
}
impl RequestContext {
	pub fn new(tenant: impl Into<String>, correlation_id: impl Into<String>) -> Self {
		Self { tenant: tenant.into(), correlation_id: correlation_id.into() }
	}

	/// Reads the context from message attributes. The partition id is required.
	pub fn from_attributes(attributes: &BTreeMap<String, String>) -> Option<Self> {
		let tenant = attributes.get(DATA_PARTITION_ID).map(|tenant| tenant.trim())?;

		if tenant.is_empty() {
			return None;
		}

		let correlation_id = attributes.get(CORRELATION_ID).cloned().unwrap_or_default();

		Some(Self::new(tenant, correlation_id))
	}

	/// Message attributes for a follow-up message reached through `ancestry`.
	pub fn attributes(&self, ancestry: &AncestryTrail) -> BTreeMap<String, String> {
		let mut attributes = BTreeMap::new();

		attributes.insert(DATA_PARTITION_ID.to_string(), self.tenant.clone());
		attributes.insert(CORRELATION_ID.to_string(), self.correlation_id.clone());

		if !ancestry.is_empty() {
			attributes.insert(ANCESTRY_KINDS.to_string(), ancestry.to_string());
		}

		attributes
	}

	/// Cache key scoped to this tenant.
	pub fn key(&self, key: &str) -> String {
		format!("{}|{key}", self.tenant)
	}
}

/// Kinds already visited within one propagation chain. A kind is recorded at most once.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AncestryTrail {
	kinds: Vec<String>,
}
impl AncestryTrail {
	pub fn parse(raw: &str) -> Self {
		let mut trail = Self::default();

		for kind in raw.split(ANCESTRY_KINDS_DELIMITER).map(str::trim).filter(|kind| !kind.is_empty())
		{
			trail.push(kind);
		}

		trail
	}

	pub fn kinds(&self) -> &[String] {
		&self.kinds
	}

	pub fn is_empty(&self) -> bool {
		self.kinds.is_empty()
	}

	pub fn contains(&self, kind: &str) -> bool {
		self.kinds.iter().any(|visited| visited == kind)
	}

	/// True when any visited kind shares the major version of `kind`.
	pub fn covers_major(&self, kind: &str) -> bool {
		self.kinds.iter().any(|visited| kind::has_same_major_kind(visited, kind))
	}

	/// Trail extended by `kind`.
	pub fn with(&self, kind: &str) -> Self {
		let mut trail = self.clone();

		trail.push(kind);

		trail
	}

	fn push(&mut self, kind: &str) {
		if !self.contains(kind) {
			self.kinds.push(kind.to_string());
		}
	}
}
impl fmt::Display for AncestryTrail {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.kinds.join(","))
	}
}

/// What changed on a record since its previous indexing.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RecordChangeInfo {
	pub record: RecordInfo,
	#[serde(default)]
	pub updated_properties: Vec<String>,
}
impl RecordChangeInfo {
	pub fn created(kind: &str, id: &str) -> Self {
		Self { record: RecordInfo::new(kind, id, OperationType::Create), updated_properties: Vec::new() }
	}

	pub fn deleted(kind: &str, id: &str) -> Self {
		Self { record: RecordInfo::new(kind, id, OperationType::Delete), updated_properties: Vec::new() }
	}

	/// Change info for a record whose data moved from `previous` to `current`. A create that is
	/// still pending stays a create, and pending updated properties are kept.
	pub fn observe(
		kind: &str,
		id: &str,
		previous: Option<&Map<String, Value>>,
		current: &Map<String, Value>,
		pending: Option<&RecordChangeInfo>,
	) -> Self {
		let Some(previous) = previous.filter(|previous| !previous.is_empty()) else {
			return Self::created(kind, id);
		};

		if pending.is_some_and(|pending| pending.record.op == OperationType::Create) {
			return Self::created(kind, id);
		}

		let mut updated_properties = path::changed_properties(previous, current);

		if let Some(pending) = pending {
			for property in &pending.updated_properties {
				if !updated_properties.contains(property) {
					updated_properties.push(property.clone());
				}
			}

			updated_properties.sort();
		}

		Self { record: RecordInfo::new(kind, id, OperationType::Update), updated_properties }
	}

	pub fn is_update(&self) -> bool {
		self.record.op == OperationType::Update
	}
}

fn record_infos<'de, D>(deserializer: D) -> Result<Vec<RecordInfo>, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Encoded {
		List(Vec<RecordInfo>),
		Text(String),
	}

	match Encoded::deserialize(deserializer)? {
		Encoded::List(records) => Ok(records),
		Encoded::Text(text) => serde_json::from_str(&text).map_err(serde::de::Error::custom),
	}
}
