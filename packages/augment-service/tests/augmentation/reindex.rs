use serde_json::json;

use augment_domain::message::{ANCESTRY_KINDS, OperationType, RecordChangedMessages, RecordInfo};
use augment_service::Cache;

use super::{WELL_KIND, WELLBORE_KIND};

const WELL_ID: &str = "opendes:master-data--Well:W1";
const WELLBORE_ID: &str = "opendes:master-data--Wellbore:WB1";

fn changed(op: OperationType) -> RecordChangedMessages {
	RecordChangedMessages {
		data: vec![RecordInfo::new(WELLBORE_KIND, WELLBORE_ID, op)],
		attributes: Default::default(),
	}
}

#[tokio::test]
async fn stored_records_gain_their_extended_properties() {
	let harness = super::harness();

	super::put_well_configurations(&harness.index);
	harness.index.put(WELL_ID, WELL_KIND, json!({ "UWI": "UWI-1" }));
	harness.storage.put(
		WELLBORE_ID,
		WELLBORE_KIND,
		json!({ "WellID": format!("{WELL_ID}:"), "FacilityName": "WB-A" }),
	);

	let output = harness
		.service
		.reindex(&super::ctx(), &changed(OperationType::Create))
		.await
		.expect("Reindex failed.");

	assert_eq!(output.records.len(), 1);
	assert_eq!(output.records[0].id, WELLBORE_ID);
	assert_eq!(output.records[0].data.get("FacilityName"), Some(&json!("WB-A")));
	assert_eq!(output.records[0].data.get("WellUWI"), Some(&json!("UWI-1")));
	assert_eq!(output.records[0].data.get("AssociatedIdentities"), Some(&json!([WELL_ID])));
}

#[tokio::test]
async fn new_children_queue_their_parents() {
	let harness = super::harness();

	super::put_well_configurations(&harness.index);
	harness.index.put(WELL_ID, WELL_KIND, json!({ "UWI": "UWI-1" }));
	harness.storage.put(
		WELLBORE_ID,
		WELLBORE_KIND,
		json!({ "WellID": format!("{WELL_ID}:"), "FacilityName": "WB-A" }),
	);

	let output = harness
		.service
		.reindex(&super::ctx(), &changed(OperationType::Create))
		.await
		.expect("Reindex failed.");
	let messages = harness.log.messages();

	assert_eq!(output.propagation.messages, 1);
	assert_eq!(messages[0].data, vec![RecordInfo::new(WELL_KIND, WELL_ID, OperationType::Update)]);
	assert_eq!(messages[0].attributes.get(ANCESTRY_KINDS).map(String::as_str), Some(WELLBORE_KIND));
}

#[tokio::test]
async fn stored_values_win_over_extended_values() {
	let harness = super::harness();

	super::put_well_configurations(&harness.index);
	harness.index.put(WELL_ID, WELL_KIND, json!({ "UWI": "UWI-1" }));
	harness.storage.put(
		WELLBORE_ID,
		WELLBORE_KIND,
		json!({ "WellID": format!("{WELL_ID}:"), "WellUWI": "mine" }),
	);

	let output = harness
		.service
		.reindex(&super::ctx(), &changed(OperationType::Update))
		.await
		.expect("Reindex failed.");

	assert_eq!(output.records[0].data.get("WellUWI"), Some(&json!("mine")));
}

#[tokio::test]
async fn disabled_augmentation_passes_records_through() {
	let mut cfg = super::test_config();

	cfg.augmentation.enabled = false;

	let harness = super::harness_with(cfg);

	super::put_well_configurations(&harness.index);
	harness.index.put(WELL_ID, WELL_KIND, json!({ "UWI": "UWI-1" }));
	harness.storage.put(WELLBORE_ID, WELLBORE_KIND, json!({ "WellID": format!("{WELL_ID}:") }));

	let output = harness
		.service
		.reindex(&super::ctx(), &changed(OperationType::Create))
		.await
		.expect("Reindex failed.");

	assert_eq!(output.records[0].data, super::object(json!({ "WellID": format!("{WELL_ID}:") })));
	assert_eq!(output.propagation.messages, 0);
	assert!(harness.log.messages().is_empty());
}

#[tokio::test]
async fn deletes_evict_cached_record_data() {
	let harness = super::harness();
	let ctx = super::ctx();

	super::put_well_configurations(&harness.index);
	harness.index.put(WELL_ID, WELL_KIND, json!({ "UWI": "UWI-1" }));
	harness.storage.put(
		WELLBORE_ID,
		WELLBORE_KIND,
		json!({ "WellID": format!("{WELL_ID}:"), "FacilityName": "WB-A" }),
	);
	harness.service.reindex(&ctx, &changed(OperationType::Create)).await.expect("Reindex failed.");

	assert!(harness.service.caches.related_data.get(&ctx.key(WELLBORE_ID)).is_some());

	let output = harness
		.service
		.reindex(&ctx, &changed(OperationType::Delete))
		.await
		.expect("Reindex failed.");

	assert!(output.records.is_empty());
	assert!(harness.service.caches.related_data.get(&ctx.key(WELLBORE_ID)).is_none());
	assert!(harness.service.caches.change_info.get(&ctx.key(WELLBORE_ID)).is_none());
}

#[tokio::test]
async fn submitted_changes_are_validated_before_queueing() {
	let harness = super::harness();
	let ctx = super::ctx();
	let empty = RecordChangedMessages::default();
	let versionless = RecordChangedMessages {
		data: vec![RecordInfo::new("osdu:wks:master-data--Wellbore:1.", WELLBORE_ID, OperationType::Create)],
		attributes: Default::default(),
	};

	assert!(matches!(
		harness.service.submit_change(&ctx, &empty).await,
		Err(augment_service::Error::InvalidRequest { .. })
	));
	assert!(matches!(
		harness.service.submit_change(&ctx, &versionless).await,
		Err(augment_service::Error::InvalidRequest { .. })
	));

	harness
		.service
		.submit_change(&ctx, &changed(OperationType::Update))
		.await
		.expect("Submit failed.");

	assert_eq!(harness.log.messages(), vec![changed(OperationType::Update)]);
}
