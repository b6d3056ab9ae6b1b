//! Testing utilities for the pbx workspace
//!
//! Shared manifest fixtures and a tracing hook for tests.

#![allow(missing_docs)]

use pbx_model::Model;
use pbx_plist::{parse, Document};
use std::sync::Once;

/// Identifiers used by [`SAMPLE_PROJECT`]
pub mod ids {
    pub const BF_APP: &str = "0A1000000000000000000001";
    pub const BF_VIEW: &str = "0A1100000000000000000001";
    pub const BF_ASSETS: &str = "0A1200000000000000000001";
    pub const FR_APP: &str = "0B1000000000000000000001";
    pub const FR_VIEW: &str = "0B1100000000000000000001";
    pub const FR_ASSETS: &str = "0B1200000000000000000001";
    pub const FR_PRODUCT: &str = "0B1300000000000000000001";
    pub const GR_MAIN: &str = "0C1000000000000000000001";
    pub const GR_DEMO: &str = "0C1100000000000000000001";
    pub const GR_PRODUCTS: &str = "0C1200000000000000000001";
    pub const TG_DEMO: &str = "0D1000000000000000000001";
    pub const PROJECT: &str = "0E1000000000000000000001";
    pub const PH_SOURCES: &str = "0F1000000000000000000001";
    pub const PH_RESOURCES: &str = "0F1100000000000000000001";
}

/// A small single-target app project, as Xcode writes it
pub const SAMPLE_PROJECT: &str = r#"// !$*UTF8*$!
{
	archiveVersion = 1;
	classes = {
	};
	objectVersion = 56;
	objects = {

/* Begin PBXBuildFile section */
		0A1000000000000000000001 /* AppDelegate.swift in Sources */ = {isa = PBXBuildFile; fileRef = 0B1000000000000000000001 /* AppDelegate.swift */; };
		0A1100000000000000000001 /* ContentView.swift in Sources */ = {isa = PBXBuildFile; fileRef = 0B1100000000000000000001 /* ContentView.swift */; };
		0A1200000000000000000001 /* Assets.xcassets in Resources */ = {isa = PBXBuildFile; fileRef = 0B1200000000000000000001 /* Assets.xcassets */; };
/* End PBXBuildFile section */

/* Begin PBXFileReference section */
		0B1000000000000000000001 /* AppDelegate.swift */ = {isa = PBXFileReference; lastKnownFileType = sourcecode.swift; path = AppDelegate.swift; sourceTree = "<group>"; };
		0B1100000000000000000001 /* ContentView.swift */ = {isa = PBXFileReference; lastKnownFileType = sourcecode.swift; path = ContentView.swift; sourceTree = "<group>"; };
		0B1200000000000000000001 /* Assets.xcassets */ = {isa = PBXFileReference; lastKnownFileType = folder.assetcatalog; path = Assets.xcassets; sourceTree = "<group>"; };
		0B1300000000000000000001 /* Demo.app */ = {isa = PBXFileReference; explicitFileType = wrapper.application; includeInIndex = 0; path = Demo.app; sourceTree = BUILT_PRODUCTS_DIR; };
/* End PBXFileReference section */

/* Begin PBXGroup section */
		0C1000000000000000000001 = {
			isa = PBXGroup;
			children = (
				0C1100000000000000000001 /* Demo */,
				0C1200000000000000000001 /* Products */,
			);
			sourceTree = "<group>";
		};
		0C1100000000000000000001 /* Demo */ = {
			isa = PBXGroup;
			children = (
				0B1000000000000000000001 /* AppDelegate.swift */,
				0B1100000000000000000001 /* ContentView.swift */,
				0B1200000000000000000001 /* Assets.xcassets */,
			);
			path = Demo;
			sourceTree = "<group>";
		};
		0C1200000000000000000001 /* Products */ = {
			isa = PBXGroup;
			children = (
				0B1300000000000000000001 /* Demo.app */,
			);
			name = Products;
			sourceTree = "<group>";
		};
/* End PBXGroup section */

/* Begin PBXNativeTarget section */
		0D1000000000000000000001 /* Demo */ = {
			isa = PBXNativeTarget;
			buildPhases = (
				0F1000000000000000000001 /* Sources */,
				0F1100000000000000000001 /* Resources */,
			);
			name = Demo;
			productName = Demo;
			productReference = 0B1300000000000000000001 /* Demo.app */;
			productType = "com.apple.product-type.application";
		};
/* End PBXNativeTarget section */

/* Begin PBXProject section */
		0E1000000000000000000001 /* Project object */ = {
			isa = PBXProject;
			compatibilityVersion = "Xcode 14.0";
			mainGroup = 0C1000000000000000000001;
			productRefGroup = 0C1200000000000000000001 /* Products */;
			projectDirPath = "";
			projectRoot = "";
			targets = (
				0D1000000000000000000001 /* Demo */,
			);
		};
/* End PBXProject section */

/* Begin PBXResourcesBuildPhase section */
		0F1100000000000000000001 /* Resources */ = {
			isa = PBXResourcesBuildPhase;
			buildActionMask = 2147483647;
			files = (
				0A1200000000000000000001 /* Assets.xcassets in Resources */,
			);
			runOnlyForDeploymentPostprocessing = 0;
		};
/* End PBXResourcesBuildPhase section */

/* Begin PBXSourcesBuildPhase section */
		0F1000000000000000000001 /* Sources */ = {
			isa = PBXSourcesBuildPhase;
			buildActionMask = 2147483647;
			files = (
				0A1100000000000000000001 /* ContentView.swift in Sources */,
				0A1000000000000000000001 /* AppDelegate.swift in Sources */,
			);
			runOnlyForDeploymentPostprocessing = 0;
		};
/* End PBXSourcesBuildPhase section */
	};
	rootObject = 0E1000000000000000000001 /* Project object */;
}
"#;

/// Group `G` holding `A` (`Foo.swift`), and an empty Sources phase `P`
pub const SINGLE_FILE: &str = "// !$*UTF8*$!
{
	objects = {

/* Begin PBXFileReference section */
		A /* Foo.swift */ = {isa = PBXFileReference; lastKnownFileType = sourcecode.swift; path = Foo.swift; sourceTree = \"<group>\"; };
/* End PBXFileReference section */

/* Begin PBXGroup section */
		G = {
			isa = PBXGroup;
			children = (
				A /* Foo.swift */,
			);
			sourceTree = \"<group>\";
		};
/* End PBXGroup section */

/* Begin PBXSourcesBuildPhase section */
		P /* Sources */ = {
			isa = PBXSourcesBuildPhase;
			files = (
			);
		};
/* End PBXSourcesBuildPhase section */
	};
}
";

/// Like [`SINGLE_FILE`] but `A` is anchored at the project root as
/// `Sub/Foo.swift`
pub const SINGLE_FILE_IN_SUB: &str = "{
	objects = {
		A = {isa = PBXFileReference; path = Sub/Foo.swift; sourceTree = SOURCE_ROOT; };
		G = {isa = PBXGroup; children = (A,); sourceTree = \"<group>\"; };
		P = {isa = PBXSourcesBuildPhase; files = (); };
	};
}
";

/// Phase `P1` lists `b1` twice; `P2` is healthy
pub const REPEATED_MEMBERSHIP: &str = "{
	objects = {
		b1 /* Foo.swift in Sources */ = {isa = PBXBuildFile; fileRef = f1 /* Foo.swift */; };
		b2 /* Bar.swift in Sources */ = {isa = PBXBuildFile; fileRef = f2 /* Bar.swift */; };
		f1 /* Foo.swift */ = {isa = PBXFileReference; path = Foo.swift; sourceTree = \"<group>\"; };
		f2 /* Bar.swift */ = {isa = PBXFileReference; path = Bar.swift; sourceTree = \"<group>\"; };
		g1 = {isa = PBXGroup; children = (f1, f2,); sourceTree = \"<group>\"; };
		P1 = {
			isa = PBXSourcesBuildPhase;
			files = (
				b1 /* Foo.swift in Sources */,
				b2 /* Bar.swift in Sources */,
				b1 /* Foo.swift in Sources */,
			);
		};
		P2 = {
			isa = PBXSourcesBuildPhase;
			files = (
				b2 /* Bar.swift in Sources */,
			);
		};
	};
}
";

/// Group children pointing at an identifier that does not exist
pub const DANGLING_CHILD: &str = "{
	objects = {
		f1 = {isa = PBXFileReference; path = Foo.swift; sourceTree = \"<group>\"; };
		g1 = {isa = PBXGroup; children = (f1, GONE,); sourceTree = \"<group>\"; };
		P1 = {isa = PBXSourcesBuildPhase; files = (); };
	};
}
";

/// Parse a fixture
///
/// # Panics
/// On invalid fixture text.
#[must_use]
pub fn document(text: &str) -> Document {
    parse(text).expect("fixture parses")
}

/// Parse and model a fixture
///
/// # Panics
/// On invalid fixture text.
#[must_use]
pub fn model(text: &str) -> Model {
    Model::build(&document(text)).expect("fixture has an objects table")
}

static TRACING: Once = Once::new();

/// Route `tracing` output to the test harness; `RUST_LOG` filters it
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
