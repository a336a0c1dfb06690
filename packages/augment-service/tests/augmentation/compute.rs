use serde_json::json;

use augment_domain::query::SearchRecord;

use super::{WELL_KIND, WELLBORE_CODE, WELLBORE_KIND};

const WELL_ID: &str = "opendes:master-data--Well:W1";

fn wellbore(id: &str, name: &str) -> SearchRecord {
	SearchRecord {
		id: id.to_string(),
		kind: WELLBORE_KIND.to_string(),
		data: super::object(json!({ "FacilityName": name, "WellID": format!("{WELL_ID}:") })),
	}
}

#[tokio::test]
async fn child_values_come_from_the_referenced_parent() {
	let harness = super::harness();

	super::put_well_configurations(&harness.index);
	harness.index.put(WELL_ID, WELL_KIND, json!({ "UWI": "UWI-1" }));

	let extended =
		harness.service.extended_properties(&super::ctx(), &wellbore("opendes:wb:1", "WB-A")).await;

	assert_eq!(extended.get("WellUWI"), Some(&json!("UWI-1")));
	assert_eq!(extended.get("AssociatedIdentities"), Some(&json!([WELL_ID])));
}

#[tokio::test]
async fn parent_values_collect_every_child() {
	let harness = super::harness();

	super::put_well_configurations(&harness.index);
	harness.index.put(WELL_ID, WELL_KIND, json!({ "UWI": "UWI-1" }));

	for (id, name) in [("opendes:wb:2", "WB-B"), ("opendes:wb:1", "WB-A")] {
		let record = wellbore(id, name);

		harness.index.put(&record.id, &record.kind, serde_json::Value::Object(record.data));
	}

	let well = SearchRecord {
		id: WELL_ID.to_string(),
		kind: WELL_KIND.to_string(),
		data: super::object(json!({ "UWI": "UWI-1" })),
	};
	let extended = harness.service.extended_properties(&super::ctx(), &well).await;

	assert_eq!(extended.get("WellboreNames"), Some(&json!(["WB-A", "WB-B"])));
	assert!(extended.get("AssociatedIdentities").is_none());
}

#[tokio::test]
async fn first_match_stops_at_the_first_productive_path() {
	let harness = super::harness();
	let paths = json!([
		{ "ValueExtraction": { "ValuePath": "data.PreferredName" } },
		{ "ValueExtraction": { "ValuePath": "data.FacilityName" } }
	]);

	super::put_configuration(
		&harness.index,
		"cfg:wellbore",
		WELLBORE_CODE,
		json!([
			{ "Name": "DisplayName", "Policy": "ExtractFirstMatch", "Paths": paths.clone() },
			{ "Name": "AllNames", "Policy": "ExtractAllMatches", "Paths": paths }
		]),
	);

	let mut record = wellbore("opendes:wb:1", "WB-A");

	record.data.insert("PreferredName".to_string(), json!("Preferred"));

	let both = harness.service.extended_properties(&super::ctx(), &record).await;
	let facility_only =
		harness.service.extended_properties(&super::ctx(), &wellbore("opendes:wb:2", "WB-B")).await;

	assert_eq!(both.get("DisplayName"), Some(&json!("Preferred")));
	assert_eq!(both.get("AllNames"), Some(&json!(["Preferred", "WB-A"])));
	assert_eq!(facility_only.get("DisplayName"), Some(&json!("WB-B")));
	assert_eq!(facility_only.get("AllNames"), Some(&json!(["WB-B"])));
}

#[tokio::test]
async fn existing_properties_are_never_overridden() {
	let harness = super::harness();

	super::put_well_configurations(&harness.index);
	harness.index.put(WELL_ID, WELL_KIND, json!({ "UWI": "UWI-1" }));

	let mut record = wellbore("opendes:wb:1", "WB-A");

	record.data.insert("WellUWI".to_string(), json!("mine"));

	let extended = harness.service.extended_properties(&super::ctx(), &record).await;

	assert!(extended.get("WellUWI").is_none());
}

#[tokio::test]
async fn explicit_empty_values_count_as_present() {
	let harness = super::harness();

	super::put_well_configurations(&harness.index);
	harness.index.put(WELL_ID, WELL_KIND, json!({ "UWI": "UWI-1" }));

	let mut record = wellbore("opendes:wb:1", "WB-A");

	record.data.insert("WellUWI".to_string(), json!([]));

	let extended = harness.service.extended_properties(&super::ctx(), &record).await;

	assert!(extended.get("WellUWI").is_none());
}

#[tokio::test]
async fn null_values_and_flattened_siblings_do_not_block_computation() {
	let harness = super::harness();

	super::put_well_configurations(&harness.index);
	harness.index.put(WELL_ID, WELL_KIND, json!({ "UWI": "UWI-1" }));

	let mut record = wellbore("opendes:wb:1", "WB-A");

	record.data.insert("WellUWI".to_string(), serde_json::Value::Null);
	record.data.insert("WellUWI.Source".to_string(), json!("manual"));

	let extended = harness.service.extended_properties(&super::ctx(), &record).await;

	assert_eq!(extended.get("WellUWI"), Some(&json!("UWI-1")));
}

#[tokio::test]
async fn repeated_computation_is_stable_and_served_from_cache() {
	let harness = super::harness();

	super::put_well_configurations(&harness.index);
	harness.index.put(WELL_ID, WELL_KIND, json!({ "UWI": "UWI-1" }));

	let record = wellbore("opendes:wb:1", "WB-A");
	let first = harness.service.extended_properties(&super::ctx(), &record).await;
	let requests = harness.index.request_count();
	let second = harness.service.extended_properties(&super::ctx(), &record).await;

	assert_eq!(first, second);
	assert_eq!(
		serde_json::to_string(&first).expect("Serialize failed."),
		serde_json::to_string(&second).expect("Serialize failed.")
	);
	assert_eq!(harness.index.request_count(), requests);
}

#[tokio::test]
async fn disabled_augmentation_computes_nothing() {
	let mut cfg = super::test_config();

	cfg.augmentation.enabled = false;

	let harness = super::harness_with(cfg);

	super::put_well_configurations(&harness.index);
	harness.index.put(WELL_ID, WELL_KIND, json!({ "UWI": "UWI-1" }));

	let extended =
		harness.service.extended_properties(&super::ctx(), &wellbore("opendes:wb:1", "WB-A")).await;

	assert!(extended.is_empty());
	assert_eq!(harness.index.request_count(), 0);
}

#[tokio::test]
async fn failed_parent_search_skips_only_that_path() {
	let harness = super::harness();

	super::put_configuration(
		&harness.index,
		"cfg:wellbore",
		WELLBORE_CODE,
		json!([
			{
				"Name": "WellUWI",
				"Policy": "ExtractFirstMatch",
				"Paths": [super::related_path("ChildToParent", super::WELL_CODE, "data.WellID", "data.UWI")]
			},
			{
				"Name": "DisplayName",
				"Policy": "ExtractFirstMatch",
				"Paths": [{ "ValueExtraction": { "ValuePath": "data.FacilityName" } }]
			}
		]),
	);
	harness.index.put(WELL_ID, WELL_KIND, json!({ "UWI": "UWI-1" }));
	harness.index.fail_kind("osdu:wks:master-data--Well:1.*");

	let extended =
		harness.service.extended_properties(&super::ctx(), &wellbore("opendes:wb:1", "WB-A")).await;

	assert!(extended.get("WellUWI").is_none());
	assert_eq!(extended.get("DisplayName"), Some(&json!("WB-A")));
}
