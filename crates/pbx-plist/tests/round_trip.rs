//! Round-trip laws for the reader and writer.
//!
//! - Parsing then serializing an unmodified document reproduces the input
//!   byte-for-byte.
//! - Re-parsing serialized output yields a structurally equal tree.

use pbx_plist::{parse, serialize, Node, Value};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const MANIFEST: &str = r#"// !$*UTF8*$!
{
	archiveVersion = 1;
	classes = {
	};
	objectVersion = 56;
	objects = {

/* Begin PBXBuildFile section */
		BF0000000000000000000001 /* App.swift in Sources */ = {isa = PBXBuildFile; fileRef = FR0000000000000000000001 /* App.swift */; };
/* End PBXBuildFile section */

/* Begin PBXFileReference section */
		FR0000000000000000000001 /* App.swift */ = {isa = PBXFileReference; lastKnownFileType = sourcecode.swift; path = App.swift; sourceTree = "<group>"; };
/* End PBXFileReference section */

/* Begin PBXGroup section */
		GR0000000000000000000001 = {
			isa = PBXGroup;
			children = (
				FR0000000000000000000001 /* App.swift */,
			);
			sourceTree = "<group>";
		};
/* End PBXGroup section */

/* Begin PBXSourcesBuildPhase section */
		PH0000000000000000000001 /* Sources */ = {
			isa = PBXSourcesBuildPhase;
			buildActionMask = 2147483647;
			files = (
				BF0000000000000000000001 /* App.swift in Sources */,
			);
			runOnlyForDeploymentPostprocessing = 0;
		};
/* End PBXSourcesBuildPhase section */

/* Begin XCBuildConfiguration section */
		BC0000000000000000000001 /* Debug */ = {
			isa = XCBuildConfiguration;
			buildSettings = {
				OTHER_SWIFT_FLAGS = "-D DEBUG";
				SWIFT_VERSION = 5.0;
			};
			name = Debug;
		};
/* End XCBuildConfiguration section */
	};
	rootObject = PJ0000000000000000000001 /* Project object */;
}
"#;

#[test]
fn realistic_manifest_is_byte_identical() {
    let doc = parse(MANIFEST).unwrap();
    assert_eq!(serialize(&doc), MANIFEST);
}

#[test]
fn realistic_manifest_structure() {
    let doc = parse(MANIFEST).unwrap();
    let structure = doc.structure();
    let objects = structure.get("objects").unwrap();
    let Node::Object(entries) = objects else {
        panic!("objects is not an object");
    };
    assert_eq!(entries.len(), 5);
    assert_eq!(
        objects
            .get("BC0000000000000000000001")
            .and_then(|c| c.get("buildSettings"))
            .and_then(|s| s.get("OTHER_SWIFT_FLAGS"))
            .and_then(Node::as_str),
        Some("-D DEBUG")
    );
}

#[test]
fn edited_manifest_reparses_equal() {
    let mut doc = parse(MANIFEST).unwrap();
    let objects = doc
        .root_mut()
        .as_object_mut()
        .unwrap()
        .get_mut("objects")
        .unwrap()
        .as_object_mut()
        .unwrap();
    let group = objects
        .get_mut("GR0000000000000000000001")
        .unwrap()
        .as_object_mut()
        .unwrap();
    group.set("name", Value::string("Sources With Space"));
    group
        .get_mut("children")
        .unwrap()
        .as_list_mut()
        .unwrap()
        .push(Value::string("FR0000000000000000000002"));

    let text = serialize(&doc);
    let reparsed = parse(&text).unwrap();
    assert!(reparsed.structurally_eq(&doc));
    assert_eq!(serialize(&reparsed), text);
}

fn trivia() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just(" ".to_string()),
            Just("\t".to_string()),
            Just("\n".to_string()),
            Just(" /* c */".to_string()),
            Just(" // line\n".to_string()),
        ],
        0..3,
    )
    .prop_map(|parts| parts.concat())
}

fn scalar_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Za-z0-9_.][A-Za-z0-9_./]{0,11}",
        "[ A-Za-z\"\\\\<>]{0,8}".prop_map(|s| pbx_plist::quote_if_needed(&s)),
    ]
}

fn value_text() -> impl Strategy<Value = String> {
    let leaf = (scalar_text(), prop::option::of(Just(" /* note */".to_string())))
        .prop_map(|(s, note)| format!("{s}{}", note.unwrap_or_default()));
    leaf.prop_recursive(4, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec((trivia(), inner.clone(), trivia()), 0..4).prop_map(
                |items| {
                    let body: String = items
                        .into_iter()
                        .map(|(a, v, b)| format!("{a}{v}{b},"))
                        .collect();
                    format!("({body})")
                }
            ),
            prop::collection::vec(
                (trivia(), "[a-z][a-zA-Z0-9]{0,6}", trivia(), inner, trivia()),
                0..4
            )
            .prop_map(|fields| {
                let body: String = fields
                    .into_iter()
                    .map(|(a, k, b, v, c)| format!("{a}{k}{b}={b}{v}{c};"))
                    .collect();
                format!("{{{body}}}")
            }),
        ]
    })
}

proptest! {
    #[test]
    fn prop_unmodified_round_trip_is_byte_identical(
        head in trivia(),
        body in value_text(),
        tail in trivia(),
    ) {
        let text = format!("{head}{body}{tail}");
        let doc = parse(&text).unwrap();
        prop_assert_eq!(serialize(&doc), text);
    }

    #[test]
    fn prop_reparse_is_structurally_equal(body in value_text()) {
        let doc = parse(&body).unwrap();
        let again = parse(&serialize(&doc)).unwrap();
        prop_assert!(doc.structurally_eq(&again));
    }

    #[test]
    fn prop_written_scalars_read_back(text in "[a-z/*+<> .]{0,12}") {
        let mut doc = parse("{ k = v; }").unwrap();
        if let Some(root) = doc.root_mut().as_object_mut() {
            root.set("k", Value::string(&text));
        }
        let again = parse(&serialize(&doc)).unwrap();
        prop_assert_eq!(again.root().as_object().and_then(|o| o.get_str("k")), Some(text.as_str()));
    }
}
