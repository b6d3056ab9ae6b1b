//! Typed entity views
//!
//! Each view copies only the fields the model interprets. Everything else
//! stays in the document tree untouched.

use crate::id::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// `isa` values the model interprets
pub mod isa {
    /// File on disk
    pub const FILE_REFERENCE: &str = "PBXFileReference";
    /// Membership wrapper placing a file in a build phase
    pub const BUILD_FILE: &str = "PBXBuildFile";
    /// Folder in the project navigator
    pub const GROUP: &str = "PBXGroup";
    /// Localized file group
    pub const VARIANT_GROUP: &str = "PBXVariantGroup";
    /// Compile-sources phase
    pub const SOURCES_PHASE: &str = "PBXSourcesBuildPhase";
    /// Project root object
    pub const PROJECT: &str = "PBXProject";
}

/// What a path is relative to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum SourceTree {
    /// `<group>`: relative to the enclosing group
    #[default]
    Group,
    /// `SOURCE_ROOT`: relative to the project directory
    SourceRoot,
    /// `<absolute>`
    Absolute,
    /// `BUILT_PRODUCTS_DIR`
    BuiltProducts,
    /// `SDKROOT`
    Sdk,
    /// `DEVELOPER_DIR`
    DeveloperDir,
    /// Any other named root (build setting)
    Other(String),
}

impl SourceTree {
    /// Manifest spelling
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Group => "<group>",
            Self::SourceRoot => "SOURCE_ROOT",
            Self::Absolute => "<absolute>",
            Self::BuiltProducts => "BUILT_PRODUCTS_DIR",
            Self::Sdk => "SDKROOT",
            Self::DeveloperDir => "DEVELOPER_DIR",
            Self::Other(name) => name,
        }
    }

    /// Parse the manifest spelling
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match text {
            "<group>" => Self::Group,
            "SOURCE_ROOT" => Self::SourceRoot,
            "<absolute>" => Self::Absolute,
            "BUILT_PRODUCTS_DIR" => Self::BuiltProducts,
            "SDKROOT" => Self::Sdk,
            "DEVELOPER_DIR" => Self::DeveloperDir,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Display for SourceTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `PBXFileReference`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReference {
    /// Identifier
    pub id: ObjectId,
    /// Text of the key's annotation, if any (informational only)
    pub display_name: Option<String>,
    /// `name` field, if any
    pub name: Option<String>,
    /// `path` field
    pub path: String,
    /// `sourceTree` field
    pub source_tree: SourceTree,
    /// `lastKnownFileType` or `explicitFileType`
    pub file_type: Option<String>,
}

impl FileReference {
    /// Last component of the path
    #[must_use]
    pub fn file_name(&self) -> &str {
        file_name_of(&self.path)
    }
}

/// `PBXBuildFile`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildFile {
    /// Identifier
    pub id: ObjectId,
    /// `fileRef` target
    pub file_ref: Option<ObjectId>,
    /// `productRef` target (Swift package products)
    pub product_ref: Option<ObjectId>,
}

/// Group flavours that own `children`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GroupKind {
    /// `PBXGroup`
    Plain,
    /// `PBXVariantGroup`: children are localizations of one file
    Variant,
}

/// `PBXGroup` / `PBXVariantGroup`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    /// Identifier
    pub id: ObjectId,
    /// Flavour
    pub kind: GroupKind,
    /// Child identifiers in order
    pub children: Vec<ObjectId>,
    /// `path` field
    pub path: Option<String>,
    /// `name` field
    pub name: Option<String>,
    /// `sourceTree` field
    pub source_tree: SourceTree,
}

impl Group {
    /// Name shown in the navigator: `name`, else `path`
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().or(self.path.as_deref())
    }
}

/// Build phase flavours
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum PhaseKind {
    /// `PBXSourcesBuildPhase`
    Sources,
    /// `PBXResourcesBuildPhase`
    Resources,
    /// `PBXFrameworksBuildPhase`
    Frameworks,
    /// `PBXHeadersBuildPhase`
    Headers,
    /// `PBXCopyFilesBuildPhase`
    CopyFiles,
    /// Any other `*BuildPhase`
    Other(String),
}

impl PhaseKind {
    /// Classify an `isa`; `None` if it is not a build phase
    #[must_use]
    pub fn from_isa(isa: &str) -> Option<Self> {
        Some(match isa {
            "PBXSourcesBuildPhase" => Self::Sources,
            "PBXResourcesBuildPhase" => Self::Resources,
            "PBXFrameworksBuildPhase" => Self::Frameworks,
            "PBXHeadersBuildPhase" => Self::Headers,
            "PBXCopyFilesBuildPhase" => Self::CopyFiles,
            other if other.ends_with("BuildPhase") => Self::Other(other.to_string()),
            _ => return None,
        })
    }

    /// Label used in `... in Sources` annotations
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Sources => "Sources",
            Self::Resources => "Resources",
            Self::Frameworks => "Frameworks",
            Self::Headers => "Headers",
            Self::CopyFiles => "CopyFiles",
            Self::Other(isa) => isa,
        }
    }
}

/// Any `*BuildPhase` with a `files` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildPhase {
    /// Identifier
    pub id: ObjectId,
    /// Flavour
    pub kind: PhaseKind,
    /// BuildFile identifiers in order
    pub files: Vec<ObjectId>,
}

/// Borrowed view of any modeled entity
#[derive(Debug, Clone, Copy)]
pub enum Entity<'a> {
    /// File reference
    FileReference(&'a FileReference),
    /// Build file
    BuildFile(&'a BuildFile),
    /// Group
    Group(&'a Group),
    /// Build phase
    BuildPhase(&'a BuildPhase),
}

impl Entity<'_> {
    /// Identifier of the viewed entity
    #[must_use]
    pub fn id(&self) -> &ObjectId {
        match self {
            Self::FileReference(e) => &e.id,
            Self::BuildFile(e) => &e.id,
            Self::Group(e) => &e.id,
            Self::BuildPhase(e) => &e.id,
        }
    }
}

/// Last `/`-separated component
#[must_use]
pub fn file_name_of(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// `lastKnownFileType` for a new file, from its extension
#[must_use]
pub fn infer_file_type(path: &str) -> &'static str {
    let name = file_name_of(path);
    let ext = name.rsplit_once('.').map_or("", |(_, ext)| ext);
    match ext {
        "swift" => "sourcecode.swift",
        "m" => "sourcecode.c.objc",
        "mm" => "sourcecode.cpp.objcpp",
        "c" => "sourcecode.c.c",
        "cpp" | "cc" | "cxx" => "sourcecode.cpp.cpp",
        "h" => "sourcecode.c.h",
        "hpp" => "sourcecode.cpp.h",
        "metal" => "sourcecode.metal",
        "plist" => "text.plist.xml",
        "strings" => "text.plist.strings",
        "json" => "text.json",
        "md" => "net.daringfireball.markdown",
        "storyboard" => "file.storyboard",
        "xib" => "file.xib",
        "xcassets" => "folder.assetcatalog",
        "xcdatamodeld" => "wrapper.xcdatamodeld",
        "entitlements" => "text.plist.entitlements",
        "framework" => "wrapper.framework",
        "png" => "image.png",
        "jpg" | "jpeg" => "image.jpeg",
        "ttf" | "otf" => "file",
        _ => "text",
    }
}
