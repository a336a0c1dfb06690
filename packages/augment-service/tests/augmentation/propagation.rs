use std::collections::{BTreeMap, BTreeSet};

use serde_json::json;

use augment_domain::message::{ANCESTRY_KINDS, AncestryTrail, OperationType};

use super::{WELL_CODE, WELL_KIND, WELLBORE_CODE, WELLBORE_KIND};

const WELL_ID: &str = "opendes:master-data--Well:W1";
const WELLBORE_ID: &str = "opendes:master-data--Wellbore:WB1";

fn ids(kind: &str, record_ids: &[&str]) -> BTreeMap<String, Vec<String>> {
	BTreeMap::from([(kind.to_string(), record_ids.iter().map(|id| id.to_string()).collect())])
}

fn put_uwi_configuration(index: &augment_testkit::RecordIndex) {
	super::put_configuration(
		index,
		"cfg:wellbore",
		WELLBORE_CODE,
		json!([{
			"Name": "WellUWI",
			"Policy": "ExtractFirstMatch",
			"Paths": [super::related_path("ChildToParent", WELL_CODE, "data.WellID", "data.UWI")]
		}]),
	);
}

fn put_names_configuration(index: &augment_testkit::RecordIndex) {
	super::put_configuration(
		index,
		"cfg:well",
		WELL_CODE,
		json!([{
			"Name": "WellboreNames",
			"Policy": "ExtractAllMatches",
			"Paths": [super::related_path("ParentToChildren", WELLBORE_CODE, "data.WellID", "data.FacilityName")]
		}]),
	);
}

#[tokio::test]
async fn changed_parent_reindexes_children_in_bounded_batches() {
	let harness = super::harness();

	put_uwi_configuration(&harness.index);
	harness.index.put(WELL_ID, WELL_KIND, json!({ "UWI": "UWI-1" }));

	for n in 0..250 {
		harness.index.put(
			&format!("opendes:master-data--Wellbore:{n:03}"),
			WELLBORE_KIND,
			json!({ "WellID": format!("{WELL_ID}:"), "AssociatedIdentities": [WELL_ID] }),
		);
	}

	let report = harness
		.service
		.plan_propagation(
			&super::ctx(),
			&ids(WELL_KIND, &[WELL_ID]),
			&BTreeMap::new(),
			&AncestryTrail::default(),
		)
		.await;
	let messages = harness.log.messages();
	let sizes = messages.iter().map(|message| message.data.len()).collect::<Vec<_>>();
	let queued = messages
		.iter()
		.flat_map(|message| message.data.iter().map(|record| record.id.clone()))
		.collect::<BTreeSet<_>>();

	assert_eq!(sizes, vec![100, 100, 50]);
	assert_eq!(queued.len(), 250);
	assert_eq!(report.messages, 3);
	assert_eq!(report.records, 250);

	for message in &messages {
		assert_eq!(message.attributes.get(ANCESTRY_KINDS).map(String::as_str), Some(WELL_KIND));
		assert_eq!(message.attributes.get("data-partition-id").map(String::as_str), Some("opendes"));
		assert!(message.data.iter().all(|record| record.op == OperationType::Update));
	}
}

#[tokio::test]
async fn changed_child_reindexes_its_parent() {
	let harness = super::harness();

	put_names_configuration(&harness.index);
	harness.index.put(WELL_ID, WELL_KIND, json!({ "UWI": "UWI-1" }));
	harness.index.put(
		WELLBORE_ID,
		WELLBORE_KIND,
		json!({ "WellID": format!("{WELL_ID}:"), "FacilityName": "WB-A" }),
	);

	let report = harness
		.service
		.plan_propagation(
			&super::ctx(),
			&ids(WELLBORE_KIND, &[WELLBORE_ID]),
			&BTreeMap::new(),
			&AncestryTrail::default(),
		)
		.await;
	let messages = harness.log.messages();

	assert_eq!(report.messages, 1);
	assert_eq!(messages.len(), 1);
	assert_eq!(messages[0].data.len(), 1);
	assert_eq!(messages[0].data[0].id, WELL_ID);
	assert_eq!(messages[0].data[0].kind, WELL_KIND);
	assert_eq!(messages[0].ancestry().kinds(), [WELLBORE_KIND.to_string()]);
}

#[tokio::test]
async fn mutual_parent_relationships_stop_at_the_ancestry_trail() {
	let harness = super::harness();
	let ctx = super::ctx();

	put_names_configuration(&harness.index);
	super::put_configuration(
		&harness.index,
		"cfg:wellbore",
		WELLBORE_CODE,
		json!([{
			"Name": "WellNames",
			"Policy": "ExtractAllMatches",
			"Paths": [super::related_path("ParentToChildren", WELL_CODE, "data.PrimaryWellboreID", "data.FacilityName")]
		}]),
	);
	harness.index.put(WELL_ID, WELL_KIND, json!({ "PrimaryWellboreID": WELLBORE_ID }));
	harness.index.put(
		WELLBORE_ID,
		WELLBORE_KIND,
		json!({ "WellID": format!("{WELL_ID}:"), "FacilityName": "WB-A" }),
	);

	let first = harness
		.service
		.plan_propagation(
			&ctx,
			&ids(WELLBORE_KIND, &[WELLBORE_ID]),
			&BTreeMap::new(),
			&AncestryTrail::default(),
		)
		.await;
	let messages = harness.log.drain();

	assert_eq!(first.messages, 1);
	assert_eq!(messages[0].data[0].id, WELL_ID);

	let (upserted, deleted) = messages[0].kind_ids();
	let second = harness
		.service
		.plan_propagation(&ctx, &upserted, &deleted, &messages[0].ancestry())
		.await;

	assert_eq!(second.messages, 0);
	assert_eq!(second.cyclic_skips, 1);
	assert!(harness.log.messages().is_empty());
}

#[tokio::test]
async fn child_updates_outside_the_parent_values_are_not_propagated() {
	let harness = super::harness();
	let ctx = super::ctx();

	put_names_configuration(&harness.index);
	harness.index.put(WELL_ID, WELL_KIND, json!({ "UWI": "UWI-1" }));
	harness.index.put(
		WELLBORE_ID,
		WELLBORE_KIND,
		json!({ "WellID": format!("{WELL_ID}:"), "FacilityName": "WB-A", "Depth": 1 }),
	);

	let depth_only = super::object(
		json!({ "WellID": format!("{WELL_ID}:"), "FacilityName": "WB-A", "Depth": 2 }),
	);
	let info = harness.service.cache_data_record(&ctx, WELLBORE_ID, WELLBORE_KIND, &depth_only).await;

	assert!(info.is_update());
	assert_eq!(info.updated_properties, vec!["Depth"]);

	let quiet = harness
		.service
		.plan_propagation(
			&ctx,
			&ids(WELLBORE_KIND, &[WELLBORE_ID]),
			&BTreeMap::new(),
			&AncestryTrail::default(),
		)
		.await;

	assert_eq!(quiet.messages, 0);

	let renamed = super::object(
		json!({ "WellID": format!("{WELL_ID}:"), "FacilityName": "WB-Z", "Depth": 2 }),
	);
	let info = harness.service.cache_data_record(&ctx, WELLBORE_ID, WELLBORE_KIND, &renamed).await;

	assert_eq!(info.updated_properties, vec!["Depth", "FacilityName"]);

	let loud = harness
		.service
		.plan_propagation(
			&ctx,
			&ids(WELLBORE_KIND, &[WELLBORE_ID]),
			&BTreeMap::new(),
			&AncestryTrail::default(),
		)
		.await;

	assert_eq!(loud.messages, 1);
	assert_eq!(harness.log.messages()[0].data[0].id, WELL_ID);
}

#[tokio::test]
async fn parent_updates_only_reach_children_reading_the_changed_values() {
	let harness = super::harness();
	let ctx = super::ctx();

	put_uwi_configuration(&harness.index);
	harness.index.put(WELL_ID, WELL_KIND, json!({ "UWI": "UWI-1", "Name": "North" }));
	harness.index.put(
		WELLBORE_ID,
		WELLBORE_KIND,
		json!({ "WellID": format!("{WELL_ID}:"), "AssociatedIdentities": [WELL_ID] }),
	);

	let renamed = super::object(json!({ "UWI": "UWI-1", "Name": "South" }));

	harness.service.cache_data_record(&ctx, WELL_ID, WELL_KIND, &renamed).await;

	let quiet = harness
		.service
		.plan_propagation(
			&ctx,
			&ids(WELL_KIND, &[WELL_ID]),
			&BTreeMap::new(),
			&AncestryTrail::default(),
		)
		.await;

	assert_eq!(quiet.messages, 0);

	let renumbered = super::object(json!({ "UWI": "UWI-2", "Name": "South" }));

	harness.service.cache_data_record(&ctx, WELL_ID, WELL_KIND, &renumbered).await;

	let loud = harness
		.service
		.plan_propagation(
			&ctx,
			&ids(WELL_KIND, &[WELL_ID]),
			&BTreeMap::new(),
			&AncestryTrail::default(),
		)
		.await;

	assert_eq!(loud.messages, 1);
	assert_eq!(harness.log.messages()[0].data[0].id, WELLBORE_ID);
}

#[tokio::test]
async fn deleted_parents_reindex_their_children() {
	let harness = super::harness();

	put_uwi_configuration(&harness.index);
	harness.index.put(
		WELLBORE_ID,
		WELLBORE_KIND,
		json!({ "WellID": format!("{WELL_ID}:"), "AssociatedIdentities": [WELL_ID] }),
	);

	let report = harness
		.service
		.plan_propagation(
			&super::ctx(),
			&BTreeMap::new(),
			&ids(WELL_KIND, &[WELL_ID]),
			&AncestryTrail::default(),
		)
		.await;

	assert_eq!(report.messages, 1);
	assert_eq!(harness.log.messages()[0].data[0].id, WELLBORE_ID);
}

#[tokio::test]
async fn rejected_batches_are_counted_without_aborting() {
	let harness = super::harness();

	put_uwi_configuration(&harness.index);
	harness.index.put(WELL_ID, WELL_KIND, json!({ "UWI": "UWI-1" }));
	harness.index.put(
		WELLBORE_ID,
		WELLBORE_KIND,
		json!({ "WellID": format!("{WELL_ID}:"), "AssociatedIdentities": [WELL_ID] }),
	);
	harness.log.reject(true);

	let report = harness
		.service
		.plan_propagation(
			&super::ctx(),
			&ids(WELL_KIND, &[WELL_ID]),
			&BTreeMap::new(),
			&AncestryTrail::default(),
		)
		.await;

	assert_eq!(report.messages, 0);
	assert_eq!(report.failed_messages, 1);
}

#[tokio::test]
async fn unconfigured_kinds_plan_nothing() {
	let harness = super::harness();

	put_uwi_configuration(&harness.index);

	let report = harness
		.service
		.plan_propagation(
			&super::ctx(),
			&ids("osdu:wks:master-data--Field:1.0.0", &["opendes:field:1"]),
			&BTreeMap::new(),
			&AncestryTrail::default(),
		)
		.await;

	assert_eq!(report.messages, 0);
	assert!(harness.log.messages().is_empty());
}
