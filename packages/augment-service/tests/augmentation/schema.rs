use serde_json::json;

use augment_domain::schema::{Schema, SchemaItem};

use super::{WELL_CODE, WELL_KIND, WELLBORE_CODE, WELLBORE_KIND};

fn wellbore_schema() -> Schema {
	Schema {
		kind: WELLBORE_KIND.to_string(),
		schema: vec![SchemaItem::new("WellID", "string"), SchemaItem::new("FacilityName", "string")],
	}
}

fn put_wellbore_configuration(index: &augment_testkit::RecordIndex) {
	super::put_configuration(
		index,
		"cfg:wellbore",
		WELLBORE_CODE,
		json!([
			{
				"Name": "WellUWI",
				"Policy": "ExtractFirstMatch",
				"Paths": [super::related_path("ChildToParent", WELL_CODE, "data.WellID", "data.UWI")]
			},
			{
				"Name": "Names",
				"Policy": "ExtractAllMatches",
				"Paths": [{ "ValueExtraction": { "ValuePath": "data.FacilityName" } }]
			}
		]),
	);
}

#[tokio::test]
async fn related_schemas_are_loaded_for_the_latest_concrete_kind() {
	let harness = super::harness();

	put_wellbore_configuration(&harness.index);
	harness.index.put("opendes:well:1", WELL_KIND, json!({ "UWI": "UWI-1" }));
	harness.index.put_schema(Schema {
		kind: WELL_KIND.to_string(),
		schema: vec![SchemaItem::new("UWI", "string"), SchemaItem::new("Name", "string")],
	});

	let items = harness.service.extended_schema(&super::ctx(), &wellbore_schema()).await;

	assert_eq!(items, vec![
		SchemaItem::new("WellUWI", "string"),
		SchemaItem::new("Names", "[]string"),
		SchemaItem::new("AssociatedIdentities", "[]string"),
	]);
}

#[tokio::test]
async fn unresolvable_related_kinds_are_left_out() {
	let harness = super::harness();

	put_wellbore_configuration(&harness.index);

	let items = harness.service.extended_schema(&super::ctx(), &wellbore_schema()).await;

	assert_eq!(items, vec![
		SchemaItem::new("Names", "[]string"),
		SchemaItem::new("AssociatedIdentities", "[]string"),
	]);
}

#[tokio::test]
async fn unconfigured_kinds_have_no_extended_schema() {
	let harness = super::harness();
	let items = harness
		.service
		.extended_schema(
			&super::ctx(),
			&Schema { kind: "osdu:wks:master-data--Field:1.0.0".to_string(), schema: Vec::new() },
		)
		.await;

	assert!(items.is_empty());
}
