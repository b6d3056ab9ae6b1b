//! End-to-end behaviour on small hand-written manifests

use pbx_edit::{EditConfig, EditError, LongestPath, Session};
use pbx_model::{DuplicateBasis, SourceTree};
use pbx_test_utils::{init_tracing, REPEATED_MEMBERSHIP, SINGLE_FILE, SINGLE_FILE_IN_SUB};
use pretty_assertions::assert_eq;

fn session(text: &str) -> Session {
    init_tracing();
    Session::from_text(text, EditConfig::new().with_seed(11)).unwrap()
}

#[test]
fn adding_a_file_that_resolves_to_an_existing_one_fails() {
    let mut s = session(SINGLE_FILE_IN_SUB);
    let err = s
        .add_file("Sub/Foo.swift", &SourceTree::Group, "G", "P")
        .unwrap_err();
    match err {
        EditError::AlreadyExists { path, existing } => {
            assert_eq!(path, "Sub/Foo.swift");
            assert_eq!(existing.as_str(), "A");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(s.text(), SINGLE_FILE_IN_SUB);
    assert!(!s.is_dirty());
}

#[test]
fn distinct_target_is_added_then_longest_path_survives_dedupe() {
    let mut s = session(SINGLE_FILE);
    let added = s
        .add_file("Sub/Foo.swift", &SourceTree::Group, "G", "P")
        .unwrap();
    assert_eq!(s.model().files_named("Foo.swift").len(), 2);
    assert_eq!(s.model().phase("P").unwrap().files, vec![added.build_file.clone()]);

    let groups = s.dedupe(&LongestPath).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].basis, DuplicateBasis::FileName);
    assert_eq!(groups[0].kept, added.file_ref);
    assert_eq!(groups[0].removed.len(), 1);
    assert_eq!(groups[0].removed[0].as_str(), "A");

    let model = s.model();
    assert!(model.file_ref("A").is_none());
    assert_eq!(model.files_named("Foo.swift"), &[added.file_ref.clone()]);
    assert_eq!(model.file_ref(&added.file_ref).unwrap().path, "Sub/Foo.swift");
    assert_eq!(model.children_of("G").unwrap(), &[added.file_ref.clone()]);
    assert!(s.check().is_clean());
}

#[test]
fn new_entries_land_in_their_sections() {
    let mut s = session(SINGLE_FILE);
    let added = s
        .add_file("Sub/Foo.swift", &SourceTree::Group, "G", "P")
        .unwrap();
    let text = s.text();
    let bf = format!(
        "/* Begin PBXBuildFile section */\n\t\t{} /* Foo.swift in Sources */ = {{isa = PBXBuildFile; fileRef = {} /* Foo.swift */; }};\n/* End PBXBuildFile section */",
        added.build_file, added.file_ref
    );
    assert!(text.contains(&bf), "{text}");
    let fr = format!(
        "\t\t{} /* Foo.swift */ = {{isa = PBXFileReference; lastKnownFileType = sourcecode.swift; name = Foo.swift; path = Sub/Foo.swift; sourceTree = \"<group>\"; }};\n/* End PBXFileReference section */",
        added.file_ref
    );
    assert!(text.contains(&fr), "{text}");
    assert!(text.contains(&format!(
        "\t\t\tfiles = (\n\t\t\t\t{} /* Foo.swift in Sources */,\n\t\t\t);",
        added.build_file
    )));
}

#[test]
fn repeated_phase_entry_is_reported_and_normalized() {
    let mut s = session(REPEATED_MEMBERSHIP);
    let baseline = s.baseline();
    assert_eq!(baseline.duplicate_memberships.len(), 1);
    assert_eq!(baseline.duplicate_memberships[0].holder.as_str(), "P1");
    assert_eq!(baseline.duplicate_memberships[0].member.as_str(), "b1");
    assert_eq!(baseline.duplicate_memberships[0].count, 2);

    assert_eq!(s.normalize_phase("P1").unwrap(), 1);
    let expected = REPEATED_MEMBERSHIP.replacen(
        "\n\t\t\t\tb1 /* Foo.swift in Sources */,\n\t\t\t);",
        "\n\t\t\t);",
        1,
    );
    assert_eq!(s.text(), expected);
    assert!(s.check().is_clean());
}

#[test]
fn normalizing_a_healthy_phase_changes_nothing() {
    let mut s = session(REPEATED_MEMBERSHIP);
    assert_eq!(s.normalize_phase("P2").unwrap(), 0);
    assert_eq!(s.text(), REPEATED_MEMBERSHIP);
}

#[test]
fn normalize_all_phases_covers_every_phase() {
    let mut s = session(REPEATED_MEMBERSHIP);
    assert_eq!(s.normalize_all_phases().unwrap(), 1);
    assert!(s.check().duplicate_memberships.is_empty());
}

#[test]
fn unknown_phase_is_a_target_error() {
    let mut s = session(REPEATED_MEMBERSHIP);
    let err = s.normalize_phase("P9").unwrap_err();
    assert!(matches!(err, EditError::TargetNotFound { kind: "phase", .. }));
}
