use std::{
	cmp::Ordering,
	collections::{BTreeMap, BTreeSet},
	sync::Mutex,
};

use serde_json::{Map, Value};

use augment_domain::{
	configuration::{Direction, PropertyConfigurationsDocument},
	kind, path,
	query::{QueryFilter, SearchRecord, SearchRequest, SearchResponse, SortOrder},
	schema::Schema,
};

use crate::{Error, Result};

const ID_FIELD: &str = "id";
const KIND_FIELD: &str = "kind";
const VERSION_FIELD: &str = "version";

struct IndexedRecord {
	record: SearchRecord,
	version: u64,
}

#[derive(Default)]
struct State {
	records: Vec<IndexedRecord>,
	schemas: BTreeMap<String, Schema>,
	requests: Vec<SearchRequest>,
	failing_kinds: BTreeSet<String>,
	next_version: u64,
}

/// In-memory stand-in for the search, record and schema services.
///
/// Every put bumps the record's `version`, so sorting by version favors the latest write.
#[derive(Default)]
pub struct RecordIndex {
	state: Mutex<State>,
}
impl RecordIndex {
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts or replaces a record.
	pub fn put(&self, id: &str, record_kind: &str, data: Value) {
		let data = match data {
			Value::Object(data) => data,
			_ => Map::new(),
		};
		let mut state = self.lock();

		state.next_version += 1;

		let version = state.next_version;
		let record = SearchRecord { id: id.to_string(), kind: record_kind.to_string(), data };

		state.records.retain(|indexed| indexed.record.id != id);
		state.records.push(IndexedRecord { record, version });
	}

	pub fn remove(&self, id: &str) {
		self.lock().records.retain(|indexed| indexed.record.id != id);
	}

	pub fn get(&self, id: &str) -> Option<SearchRecord> {
		self.lock()
			.records
			.iter()
			.find(|indexed| same_id(&indexed.record.id, id))
			.map(|indexed| indexed.record.clone())
	}

	pub fn put_schema(&self, schema: Schema) {
		self.lock().schemas.insert(schema.kind.clone(), schema);
	}

	/// Makes every request naming the kind expression `kind_expression` fail until recovered.
	pub fn fail_kind(&self, kind_expression: &str) {
		self.lock().failing_kinds.insert(kind_expression.to_string());
	}

	pub fn recover_kind(&self, kind_expression: &str) {
		self.lock().failing_kinds.remove(kind_expression);
	}

	/// Every search request served so far, in order.
	pub fn requests(&self) -> Vec<SearchRequest> {
		self.lock().requests.clone()
	}

	pub fn request_count(&self) -> usize {
		self.lock().requests.len()
	}

	pub fn clear_requests(&self) {
		self.lock().requests.clear();
	}

	/// Offset-paged search.
	pub fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
		let hits = self.matching(request)?;
		let total_count = hits.len() as u64;
		let results = page(hits, request.offset as usize, request.limit);

		Ok(SearchResponse { results, cursor: None, total_count })
	}

	/// Cursor-paged search. The cursor is the offset of the next page and is only returned while
	/// more hits remain.
	pub fn search_with_cursor(&self, request: &SearchRequest) -> Result<SearchResponse> {
		let start = match &request.cursor {
			Some(cursor) => cursor
				.parse::<usize>()
				.map_err(|_| Error::Message(format!("Unknown cursor {cursor:?}.")))?,
			None => 0,
		};
		let hits = self.matching(request)?;
		let total_count = hits.len() as u64;
		let results = page(hits, start, request.limit);
		let next = start + results.len();
		let cursor = (next < total_count as usize).then(|| next.to_string());

		Ok(SearchResponse { results, cursor, total_count })
	}

	/// Stored records for `ids`, in index order. Unknown ids are skipped.
	pub fn lookup(&self, ids: &[String]) -> Vec<SearchRecord> {
		self.lock()
			.records
			.iter()
			.filter(|indexed| ids.iter().any(|id| same_id(&indexed.record.id, id)))
			.map(|indexed| indexed.record.clone())
			.collect()
	}

	pub fn schema(&self, record_kind: &str) -> Option<Schema> {
		self.lock().schemas.get(record_kind).cloned()
	}

	fn matching(&self, request: &SearchRequest) -> Result<Vec<SearchRecord>> {
		let mut state = self.lock();

		state.requests.push(request.clone());

		if let Some(failing) =
			request.kinds.iter().find(|expression| state.failing_kinds.contains(*expression))
		{
			return Err(Error::Message(format!("Search over {failing} is unavailable.")));
		}

		let mut hits = state
			.records
			.iter()
			.filter(|indexed| kind_selected(&request.kinds, &indexed.record.kind))
			.filter(|indexed| {
				request.query.as_ref().is_none_or(|query| matches_filter(&indexed.record, query))
			})
			.collect::<Vec<_>>();

		if let Some(sort) = &request.sort {
			hits.sort_by(|left, right| {
				let ordering = if sort.field == VERSION_FIELD {
					left.version.cmp(&right.version)
				} else {
					field_values(&left.record, &sort.field).cmp(&field_values(&right.record, &sort.field))
				};

				match sort.order {
					SortOrder::Asc => ordering,
					SortOrder::Desc => ordering.reverse(),
				}
			});
		} else {
			hits.sort_by(|left, right| compare_ids(&left.record, &right.record));
		}

		Ok(hits.into_iter().map(|indexed| indexed.record.clone()).collect())
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(|err| err.into_inner())
	}
}

fn page(hits: Vec<SearchRecord>, start: usize, limit: u32) -> Vec<SearchRecord> {
	let limit = if limit == 0 { usize::MAX } else { limit as usize };

	hits.into_iter().skip(start).take(limit).collect()
}

fn compare_ids(left: &SearchRecord, right: &SearchRecord) -> Ordering {
	left.id.cmp(&right.id)
}

fn same_id(left: &str, right: &str) -> bool {
	kind::strip_id_postfix(left) == kind::strip_id_postfix(right)
}

fn kind_selected(expressions: &[String], record_kind: &str) -> bool {
	let (excluded, included): (Vec<_>, Vec<_>) =
		expressions.iter().partition(|expression| expression.starts_with('-'));

	if excluded
		.iter()
		.any(|expression| kind::kind_matches(&expression[1..], record_kind))
	{
		return false;
	}

	included.iter().any(|expression| kind::kind_matches(expression, record_kind))
}

fn matches_filter(record: &SearchRecord, filter: &QueryFilter) -> bool {
	match filter {
		QueryFilter::Ids(ids) => ids.iter().any(|id| same_id(&record.id, id)),
		QueryFilter::FieldEquals { field, value } => {
			let expected = kind::strip_id_postfix(value);

			field_values(record, field).iter().any(|candidate| candidate == expected)
		},
		QueryFilter::FieldAnyOf { field, values } => {
			let candidates = field_values(record, field);

			values
				.iter()
				.any(|value| candidates.iter().any(|candidate| candidate == kind::strip_id_postfix(value)))
		},
		QueryFilter::RelatedKind { direction, kind: related_kind } =>
			references_kind(record, *direction, related_kind),
		QueryFilter::Or(filters) => filters.iter().any(|filter| matches_filter(record, filter)),
	}
}

fn field_values(record: &SearchRecord, field: &str) -> Vec<String> {
	match field {
		ID_FIELD => vec![kind::strip_id_postfix(&record.id).to_string()],
		KIND_FIELD => vec![record.kind.clone()],
		_ => path::extract(&record.data, field, None, false)
			.iter()
			.map(path::value_string)
			.map(|value| kind::strip_id_postfix(&value).to_string())
			.collect(),
	}
}

fn references_kind(record: &SearchRecord, direction: Option<Direction>, related_kind: &str) -> bool {
	let Ok(document) = PropertyConfigurationsDocument::from_data(&record.data) else {
		return false;
	};
	let Ok(validated) = document.validate() else {
		return false;
	};

	validated
		.configurations
		.configurations
		.iter()
		.flat_map(|configuration| configuration.paths.iter())
		.filter_map(|property_path| property_path.related.as_ref())
		.any(|related| {
			direction.is_none_or(|direction| direction == related.direction)
				&& kind::has_same_major_kind(&related.kind, related_kind)
		})
}
