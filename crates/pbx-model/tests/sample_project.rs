use pbx_model::{check, Entity, GroupKind, Model, ObjectId, PhaseKind, SourceTree};
use pbx_plist::parse;
use pbx_test_utils::{ids, DANGLING_CHILD, REPEATED_MEMBERSHIP, SAMPLE_PROJECT};
use pretty_assertions::assert_eq;

fn model(text: &str) -> Model {
    Model::build(&parse(text).unwrap()).unwrap()
}

#[test]
fn entities_are_indexed() {
    let m = model(SAMPLE_PROJECT);
    assert_eq!(m.file_refs().count(), 4);
    assert_eq!(m.build_files().count(), 3);
    assert_eq!(m.groups().count(), 3);
    assert_eq!(m.phases().count(), 2);
    assert_eq!(m.object_count(), 14);

    let app = m.file_ref(ids::FR_APP).unwrap();
    assert_eq!(app.path, "AppDelegate.swift");
    assert_eq!(app.source_tree, SourceTree::Group);
    assert_eq!(app.file_type.as_deref(), Some("sourcecode.swift"));

    let product = m.file_ref(ids::FR_PRODUCT).unwrap();
    assert_eq!(product.source_tree, SourceTree::BuiltProducts);
    assert_eq!(product.file_type.as_deref(), Some("wrapper.application"));

    assert_eq!(m.group(ids::GR_DEMO).unwrap().kind, GroupKind::Plain);
    assert_eq!(m.phase(ids::PH_RESOURCES).unwrap().kind, PhaseKind::Resources);
    assert!(matches!(m.entity(ids::BF_APP), Some(Entity::BuildFile(_))));
    assert!(m.entity(ids::TG_DEMO).is_none());
    assert_eq!(m.isa_of(ids::TG_DEMO), Some("PBXNativeTarget"));
}

#[test]
fn relationships_are_indexed() {
    let m = model(SAMPLE_PROJECT);
    assert_eq!(m.main_group().map(ObjectId::as_str), Some(ids::GR_MAIN));
    assert_eq!(m.parents_of(ids::FR_VIEW), &[ObjectId::from(ids::GR_DEMO)]);
    assert_eq!(m.build_files_for(ids::FR_ASSETS), &[ObjectId::from(ids::BF_ASSETS)]);
    assert_eq!(m.phases_listing(ids::BF_APP), &[ObjectId::from(ids::PH_SOURCES)]);
    assert_eq!(m.files_named("ContentView.swift"), &[ObjectId::from(ids::FR_VIEW)]);

    let users = m.external_refs_to(ids::FR_PRODUCT);
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].holder.as_str(), ids::TG_DEMO);
    assert_eq!(users[0].field, "productReference");
    assert!(m.external_refs_to(ids::FR_APP).is_empty());
}

#[test]
fn paths_resolve_through_groups() {
    let m = model(SAMPLE_PROJECT);
    assert_eq!(m.resolved_path(ids::FR_ASSETS).unwrap().to_string(), "Demo/Assets.xcassets");
    assert_eq!(m.group_location(ids::GR_DEMO).to_string(), "Demo");
    assert_eq!(m.group_location(ids::GR_MAIN).to_string(), ".");
}

#[test]
fn sample_is_clean_and_fixtures_are_not() {
    assert!(check(&model(SAMPLE_PROJECT)).is_clean());

    let dangling = check(&model(DANGLING_CHILD));
    assert_eq!(dangling.dangling_references.len(), 1);
    assert_eq!(dangling.dangling_references[0].target.as_str(), "GONE");
    assert!(dangling.has_blocking());

    let repeated = check(&model(REPEATED_MEMBERSHIP));
    assert_eq!(repeated.duplicate_memberships.len(), 1);
    assert!(repeated.phase_conflicts.is_empty());
}

#[test]
fn report_serializes_to_json() {
    let report = check(&model(DANGLING_CHILD));
    let json = report.to_json().unwrap();
    assert!(json.contains("\"dangling_references\""));
    assert!(json.contains("\"GONE\""));
}
