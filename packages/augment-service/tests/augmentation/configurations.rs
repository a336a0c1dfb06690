use serde_json::json;

use augment_domain::configuration::{Direction, ParentChildRelationshipSpec, Policy};

use super::{WELL_CODE, WELL_KIND, WELLBORE_CODE, WELLBORE_KIND};

const CONFIGURATION_KINDS: &str = "osdu:wks:reference-data--IndexPropertyPathConfiguration:*";

#[tokio::test]
async fn latest_configuration_version_wins() {
	let harness = super::harness();

	super::put_configuration(
		&harness.index,
		"cfg:wellbore:old",
		WELLBORE_CODE,
		json!([{
			"Name": "OldName",
			"Policy": "ExtractFirstMatch",
			"Paths": [{ "ValueExtraction": { "ValuePath": "data.FacilityName" } }]
		}]),
	);
	super::put_configuration(
		&harness.index,
		"cfg:wellbore:new",
		WELLBORE_CODE,
		json!([{
			"Name": "NewName",
			"Policy": "extractallmatches",
			"Paths": [{ "ValueExtraction": { "ValuePath": "data.FacilityName" } }]
		}]),
	);

	let configurations = harness
		.service
		.resolve_configurations(&super::ctx(), WELLBORE_KIND)
		.await
		.expect("Configuration lookup failed.")
		.expect("Configuration must exist.");

	assert_eq!(configurations.code, WELLBORE_CODE);
	assert_eq!(configurations.configurations.len(), 1);
	assert_eq!(configurations.configurations[0].name, "NewName");
	assert_eq!(configurations.configurations[0].policy, Policy::ExtractAllMatches);
}

#[tokio::test]
async fn missing_configurations_are_cached() {
	let harness = super::harness();
	let ctx = super::ctx();
	let first = harness
		.service
		.resolve_configurations(&ctx, WELLBORE_KIND)
		.await
		.expect("Configuration lookup failed.");

	super::put_well_configurations(&harness.index);

	let second = harness
		.service
		.resolve_configurations(&ctx, "osdu:wks:master-data--Wellbore:1.4.0")
		.await
		.expect("Configuration lookup failed.");

	assert!(first.is_none());
	assert!(second.is_none());
	assert_eq!(harness.index.request_count(), 1);
}

#[tokio::test]
async fn search_failures_are_not_cached() {
	let harness = super::harness();
	let ctx = super::ctx();

	super::put_well_configurations(&harness.index);
	harness.index.fail_kind(CONFIGURATION_KINDS);

	assert!(harness.service.resolve_configurations(&ctx, WELLBORE_KIND).await.is_err());

	harness.index.recover_kind(CONFIGURATION_KINDS);

	let configurations = harness
		.service
		.resolve_configurations(&ctx, WELLBORE_KIND)
		.await
		.expect("Configuration lookup failed.");

	assert!(configurations.is_some());
}

#[tokio::test]
async fn invalid_documents_resolve_to_nothing() {
	let harness = super::harness();

	harness.index.put(
		"cfg:broken",
		super::CONFIGURATION_KIND,
		json!({
			"Code": WELLBORE_CODE,
			"Configurations": [{ "Name": "NoPolicy", "Paths": [] }]
		}),
	);

	let configurations = harness
		.service
		.resolve_configurations(&super::ctx(), WELLBORE_KIND)
		.await
		.expect("Configuration lookup failed.");

	assert!(configurations.is_none());
}

#[tokio::test]
async fn relationship_lookups_follow_both_directions() {
	let harness = super::harness();
	let ctx = super::ctx();

	super::put_well_configurations(&harness.index);

	let specs = harness
		.service
		.parent_child_specs(&ctx, WELLBORE_KIND)
		.await
		.expect("Relationship lookup failed.");
	let children = harness
		.service
		.children_kinds(&ctx, WELL_KIND)
		.await
		.expect("Children kind lookup failed.");

	assert_eq!(specs, vec![ParentChildRelationshipSpec {
		parent_kind: WELL_CODE.to_string(),
		child_kind: WELLBORE_CODE.to_string(),
		parent_object_id_path: "WellID".to_string(),
		child_value_paths: vec!["FacilityName".to_string()],
	}]);
	assert_eq!(children, vec![WELLBORE_CODE.to_string()]);

	let configurations = harness
		.service
		.resolve_configurations(&ctx, WELL_KIND)
		.await
		.expect("Configuration lookup failed.")
		.expect("Configuration must exist.");

	assert_eq!(
		configurations.configurations[0].paths[0].related.as_ref().map(|related| related.direction),
		Some(Direction::ParentToChildren)
	);
}

#[tokio::test]
async fn has_configurations_covers_codes_and_related_kinds() {
	let harness = super::harness();
	let ctx = super::ctx();

	super::put_configuration(
		&harness.index,
		"cfg:wellbore",
		WELLBORE_CODE,
		json!([{
			"Name": "WellUWI",
			"Policy": "ExtractFirstMatch",
			"Paths": [super::related_path("ChildToParent", WELL_CODE, "data.WellID", "data.UWI")]
		}]),
	);

	let augmented = harness.service.has_configurations(&ctx, WELLBORE_KIND).await;
	let referenced = harness.service.has_configurations(&ctx, WELL_KIND).await;
	let unrelated =
		harness.service.has_configurations(&ctx, "osdu:wks:master-data--Field:1.0.0").await;

	assert!(augmented.expect("Probe failed."));
	assert!(referenced.expect("Probe failed."));
	assert!(!unrelated.expect("Probe failed."));
}

#[tokio::test]
async fn concrete_kind_resolution_prefers_the_latest_version() {
	let harness = super::harness();
	let ctx = super::ctx();

	assert_eq!(
		harness.service.resolve_concrete_kind(&ctx, WELL_CODE).await.expect("Kind lookup failed."),
		None
	);

	harness.index.put("opendes:well:1", WELL_KIND, json!({}));
	harness.index.put("opendes:well:2", "osdu:wks:master-data--Well:1.10.0", json!({}));
	harness.index.put("opendes:well:3", "osdu:wks:master-data--Well:1.2.0", json!({}));
	harness.index.put("opendes:well:4", "osdu:wks:master-data--Well:2.0.0", json!({}));

	let resolved =
		harness.service.resolve_concrete_kind(&ctx, WELL_CODE).await.expect("Kind lookup failed.");

	assert_eq!(resolved.as_deref(), Some("osdu:wks:master-data--Well:1.10.0"));
	assert_eq!(
		harness.service.resolve_concrete_kind(&ctx, WELL_KIND).await.expect("Kind lookup failed."),
		Some(WELL_KIND.to_string())
	);
}

#[tokio::test]
async fn concrete_kind_resolution_reads_past_the_first_page() {
	let harness = super::harness();

	for n in 0..60 {
		harness.index.put(&format!("opendes:well:a{n:02}"), WELL_KIND, json!({}));
	}

	harness.index.put("opendes:well:z", "osdu:wks:master-data--Well:1.1.0", json!({}));

	let resolved = harness
		.service
		.resolve_concrete_kind(&super::ctx(), WELL_CODE)
		.await
		.expect("Kind lookup failed.");

	assert_eq!(resolved.as_deref(), Some("osdu:wks:master-data--Well:1.1.0"));
}
