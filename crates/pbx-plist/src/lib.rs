//! Project manifest property lists
//!
//! Lossless reader and writer for the ASCII property-list grammar used by
//! Xcode-style project manifests.
//!
//! # Core Concepts
//!
//! - [`Document`]: concrete syntax tree that keeps every byte of trivia
//! - [`Value`], [`Object`], [`List`], [`Scalar`]: editable tree nodes
//! - [`Node`]: trivia-free structural view, used for equality
//! - [`ContentHash`]: Blake3 checksum of the source bytes
//!
//! # Example
//!
//! ```rust
//! use pbx_plist::{parse, serialize};
//!
//! let text = "// !$*UTF8*$!\n{\n\tobjects = {\n\t};\n}\n";
//! let doc = parse(text).unwrap();
//! assert_eq!(serialize(&doc), text);
//! ```

#![warn(unreachable_pub)]

mod error;
mod hash;
mod node;
mod parser;
mod tree;
mod writer;

pub use error::{Position, SyntaxError};
pub use hash::{ContentHash, HashError};
pub use node::Node;
pub use parser::{parse, MAX_DEPTH};
pub use tree::{quote_if_needed, Document, Field, Item, List, Object, Scalar, Value};
pub use writer::{serialize, serialize_value};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
