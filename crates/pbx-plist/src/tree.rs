//! Lossless concrete syntax tree
//!
//! Every token keeps the trivia (whitespace and non-annotation comments)
//! that preceded it, so writing an untouched tree reproduces the input
//! byte-for-byte. Edits go through the methods here, which pick trivia for
//! new elements from their neighbours and fold the comments of removed
//! elements into whatever follows them.

use crate::node::Node;

/// A parsed document: leading trivia, the root value, trailing trivia
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub(crate) head: String,
    pub(crate) root: Value,
    pub(crate) tail: String,
}

impl Document {
    /// Wrap a root value with no surrounding trivia
    #[must_use]
    pub fn new(root: Value) -> Self {
        Self {
            head: String::new(),
            root,
            tail: String::new(),
        }
    }

    /// Root value
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Mutable root value
    #[inline]
    pub fn root_mut(&mut self) -> &mut Value {
        &mut self.root
    }

    /// Trivia before the root (e.g. the `// !$*UTF8*$!` marker)
    #[inline]
    #[must_use]
    pub fn head(&self) -> &str {
        &self.head
    }

    /// Structural view, ignoring trivia and annotations
    #[must_use]
    pub fn structure(&self) -> Node {
        self.root.to_node()
    }

    /// Same entities, same field values, same ordering
    #[must_use]
    pub fn structurally_eq(&self, other: &Self) -> bool {
        self.structure() == other.structure()
    }
}

/// Any value in the grammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Bare or quoted string
    Scalar(Scalar),
    /// `( item, item, )`
    List(List),
    /// `{ key = value; ... }`
    Object(Object),
}

impl Value {
    /// Scalar from plain text, quoted if needed
    #[must_use]
    pub fn string(text: &str) -> Self {
        Self::Scalar(Scalar::new(text))
    }

    /// Scalar text, if this is a scalar
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s.value()),
            _ => None,
        }
    }

    /// Scalar view
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Mutable scalar view
    pub fn as_scalar_mut(&mut self) -> Option<&mut Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// List view
    #[must_use]
    pub fn as_list(&self) -> Option<&List> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    /// Mutable list view
    pub fn as_list_mut(&mut self) -> Option<&mut List> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    /// Object view
    #[must_use]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Mutable object view
    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::List(_) => "list",
            Self::Object(_) => "object",
        }
    }

    /// Structural view of this value
    #[must_use]
    pub fn to_node(&self) -> Node {
        match self {
            Self::Scalar(s) => Node::Scalar(s.value().to_string()),
            Self::List(l) => Node::List(l.items.iter().map(|i| i.value.to_node()).collect()),
            Self::Object(o) => Node::Object(
                o.fields
                    .iter()
                    .map(|f| (f.key.value().to_string(), f.value.to_node()))
                    .collect(),
            ),
        }
    }
}

/// A string token with its optional trailing `/* ... */` annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar {
    pub(crate) raw: String,
    pub(crate) value: String,
    pub(crate) note: Option<Annotation>,
}

impl Scalar {
    /// Build a scalar from plain text, quoting when the bare alphabet
    /// cannot express it
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self {
            raw: quote_if_needed(text),
            value: text.to_string(),
            note: None,
        }
    }

    /// Attach an annotation (`/* text */`)
    #[must_use]
    pub fn with_note(mut self, text: &str) -> Self {
        self.set_note(Some(text));
        self
    }

    /// Unescaped text
    #[inline]
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Text exactly as written, quotes included
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Annotation text, trimmed
    #[must_use]
    pub fn note(&self) -> Option<&str> {
        self.note.as_ref().map(|n| n.body.trim())
    }

    /// Replace the text, keeping the annotation slot
    pub fn set_value(&mut self, text: &str) {
        self.raw = quote_if_needed(text);
        self.value = text.to_string();
    }

    /// Replace or drop the annotation
    pub fn set_note(&mut self, text: Option<&str>) {
        self.note = text.map(|t| Annotation {
            gap: self
                .note
                .as_ref()
                .map_or_else(|| " ".to_string(), |n| n.gap.clone()),
            body: format!(" {t} "),
        });
    }
}

/// Inline `/* ... */` attached to a scalar
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Annotation {
    /// Spaces between the scalar and `/*`
    pub(crate) gap: String,
    /// Text between `/*` and `*/`, untrimmed
    pub(crate) body: String,
}

/// One `key = value;` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub(crate) lead: String,
    pub(crate) key: Scalar,
    pub(crate) before_eq: String,
    pub(crate) after_eq: String,
    pub(crate) value: Value,
    pub(crate) before_semi: String,
}

impl Field {
    /// New field in single-line style (`key = value;`)
    #[must_use]
    pub fn new(key: Scalar, value: Value) -> Self {
        Self {
            lead: String::new(),
            key,
            before_eq: " ".to_string(),
            after_eq: " ".to_string(),
            value,
            before_semi: String::new(),
        }
    }

    /// Key token
    #[inline]
    #[must_use]
    pub fn key(&self) -> &Scalar {
        &self.key
    }

    /// Mutable key token, for updating its annotation
    #[inline]
    pub fn key_mut(&mut self) -> &mut Scalar {
        &mut self.key
    }

    /// Value
    #[inline]
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Mutable value
    #[inline]
    pub fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    /// Trivia before the key
    #[inline]
    #[must_use]
    pub fn lead(&self) -> &str {
        &self.lead
    }

    /// Replace the trivia before the key
    pub fn set_lead(&mut self, lead: impl Into<String>) {
        self.lead = lead.into();
    }
}

/// `{ ... }`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Object {
    pub(crate) fields: Vec<Field>,
    pub(crate) trailing: String,
}

impl Object {
    /// Build a single-line object: `{a = b; c = d; }`
    #[must_use]
    pub fn inline(fields: Vec<(&str, Value)>) -> Self {
        let fields = fields
            .into_iter()
            .enumerate()
            .map(|(i, (key, value))| {
                let mut field = Field::new(Scalar::new(key), value);
                if i > 0 {
                    field.lead = " ".to_string();
                }
                field
            })
            .collect();
        Self {
            fields,
            trailing: " ".to_string(),
        }
    }

    /// Fields in source order
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Mutable fields in source order
    #[inline]
    pub fn fields_mut(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    /// Number of fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// No fields
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Trivia before `}`
    #[inline]
    #[must_use]
    pub fn trailing(&self) -> &str {
        &self.trailing
    }

    /// Replace the trivia before `}`
    pub fn set_trailing(&mut self, trailing: impl Into<String>) {
        self.trailing = trailing.into();
    }

    /// Position of the first field with this key
    #[must_use]
    pub fn position(&self, key: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.key.value == key)
    }

    /// Value of the first field with this key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|f| f.key.value == key).map(|f| &f.value)
    }

    /// Mutable value of the first field with this key
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.fields
            .iter_mut()
            .find(|f| f.key.value == key)
            .map(|f| &mut f.value)
    }

    /// Scalar text of a field
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Set a field's value, appending the field if it is missing
    ///
    /// An existing field keeps its trivia; only the value is swapped.
    pub fn set(&mut self, key: &str, value: Value) {
        if let Some(existing) = self.get_mut(key) {
            *existing = value;
            return;
        }
        let mut field = Field::new(Scalar::new(key), value);
        field.lead = self.sibling_lead();
        self.fields.push(field);
    }

    /// Insert a field at `index`, keeping its own lead
    ///
    /// # Panics
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, field: Field) {
        self.fields.insert(index, field);
    }

    /// Append a field, copying the layout of the current last one
    pub fn push(&mut self, mut field: Field) {
        field.lead = self.sibling_lead();
        self.fields.push(field);
    }

    /// Insert a field right after `index` with that field's indentation
    ///
    /// # Panics
    /// Panics if `index >= len`.
    pub fn insert_after(&mut self, index: usize, mut field: Field) {
        field.lead = indentation_of(&self.fields[index].lead);
        self.fields.insert(index + 1, field);
    }

    /// Remove the field at `index`
    ///
    /// Comments in the removed field's lead (section markers and the like)
    /// are moved onto the next field, or onto the closing trivia.
    pub fn remove_at(&mut self, index: usize) -> Field {
        let removed = self.fields.remove(index);
        let next = self.fields.get_mut(index).map_or(&mut self.trailing, |f| &mut f.lead);
        fold_lead(&removed.lead, next);
        removed
    }

    /// Remove the first field with this key
    pub fn remove(&mut self, key: &str) -> Option<Field> {
        self.position(key).map(|i| self.remove_at(i))
    }

    /// Lead to use for a field appended after the current last one
    pub(crate) fn sibling_lead(&self) -> String {
        match self.fields.last() {
            Some(last) if self.fields.len() > 1 || last.lead.contains('\n') => {
                indentation_of(&last.lead)
            }
            Some(_) => " ".to_string(),
            None => child_lead(&self.trailing),
        }
    }
}

/// One list element with its separator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub(crate) lead: String,
    pub(crate) value: Value,
    pub(crate) before_comma: String,
    pub(crate) comma: bool,
}

impl Item {
    /// Element value
    #[inline]
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// `( ... )`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct List {
    pub(crate) items: Vec<Item>,
    pub(crate) trailing: String,
}

impl List {
    /// Elements in source order
    #[inline]
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Number of elements
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// No elements
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Element values in order
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.items.iter().map(|i| &i.value)
    }

    /// Mutable element values in order; layout is untouched
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.items.iter_mut().map(|i| &mut i.value)
    }

    /// Scalar texts in order, skipping non-scalars
    pub fn strs(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|i| i.value.as_str())
    }

    /// Append a value, copying the layout of the existing elements
    pub fn push(&mut self, value: Value) {
        let lead = match self.items.last() {
            Some(last) => indentation_of(&last.lead),
            None => child_lead(&self.trailing),
        };
        let comma = match self.items.last_mut() {
            Some(last) if !last.comma => {
                last.comma = true;
                false
            }
            _ => true,
        };
        self.items.push(Item {
            lead,
            value,
            before_comma: String::new(),
            comma,
        });
    }

    /// Remove the element at `index`, folding comments forward
    pub fn remove_at(&mut self, index: usize) -> Item {
        let removed = self.items.remove(index);
        if index == self.items.len() && !removed.comma {
            if let Some(last) = self.items.last_mut() {
                last.comma = false;
            }
        }
        let next = self.items.get_mut(index).map_or(&mut self.trailing, |i| &mut i.lead);
        fold_lead(&removed.lead, next);
        removed
    }

    /// Remove every element matching `pred`; returns how many went
    pub fn remove_where(&mut self, mut pred: impl FnMut(&Value) -> bool) -> usize {
        let mut removed = 0;
        let mut i = 0;
        while i < self.items.len() {
            if pred(&self.items[i].value) {
                self.remove_at(i);
                removed += 1;
            } else {
                i += 1;
            }
        }
        removed
    }
}

/// Quote `text` unless every byte is in the bare-string alphabet
///
/// Text holding `//` or `/*` is always quoted, since the reader would take
/// it for the start of a comment.
#[must_use]
pub fn quote_if_needed(text: &str) -> String {
    let bare = !text.is_empty()
        && text.bytes().all(is_bare_byte)
        && !text.contains("//")
        && !text.contains("/*");
    if bare {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Characters written without quotes
#[inline]
#[must_use]
pub(crate) fn is_bare_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'/' | b':' | b'.' | b'-')
}

/// Characters the reader accepts in an unquoted string
///
/// Wider than [`is_bare_byte`]: hand-edited manifests carry `+`, `<` and
/// `>` unquoted, but new text always quotes them.
#[inline]
pub(crate) fn is_token_byte(b: u8) -> bool {
    is_bare_byte(b) || matches!(b, b'+' | b'<' | b'>') || b >= 0x80
}

/// Line break used by the last line of `text`: `\r\n` or `\n`
fn line_break_of(text: &str) -> &'static str {
    match text.rfind('\n') {
        Some(i) if text[..i].ends_with('\r') => "\r\n",
        _ => "\n",
    }
}

/// Line break plus the indentation of the last line of `lead`
fn indentation_of(lead: &str) -> String {
    match lead.rfind('\n') {
        Some(i) => format!("{}{}", line_break_of(lead), &lead[i + 1..]),
        None => lead.to_string(),
    }
}

/// Lead for the first child of a container whose closing trivia is `trailing`
fn child_lead(trailing: &str) -> String {
    match trailing.rfind('\n') {
        Some(i) => format!("{}{}\t", line_break_of(trailing), &trailing[i + 1..]),
        None => String::new(),
    }
}

/// Carry comments from a removed element's lead into `next`
fn fold_lead(removed: &str, next: &mut String) {
    let has_comment = removed.contains("/*") || removed.contains("//");
    if has_comment {
        let kept = removed.trim_end_matches([' ', '\t', '\n', '\r']);
        next.insert_str(0, kept);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse, serialize};
    use pretty_assertions::assert_eq;

    fn list_of(text: &str) -> (Document, String) {
        (parse(text).unwrap(), text.to_string())
    }

    #[test]
    fn quote_if_needed_bare_and_quoted() {
        assert_eq!(quote_if_needed("Foo.swift"), "Foo.swift");
        assert_eq!(quote_if_needed("<group>"), "\"<group>\"");
        assert_eq!(quote_if_needed("My File.swift"), "\"My File.swift\"");
        assert_eq!(quote_if_needed(""), "\"\"");
        assert_eq!(quote_if_needed("a\"b"), "\"a\\\"b\"");
        assert_eq!(quote_if_needed("NSString+Extras.m"), "\"NSString+Extras.m\"");
    }

    #[test]
    fn comment_openers_are_quoted() {
        assert_eq!(quote_if_needed("/abs/Foo.swift"), "/abs/Foo.swift");
        assert_eq!(quote_if_needed("//Shared/Foo.swift"), "\"//Shared/Foo.swift\"");
        assert_eq!(quote_if_needed("a//b"), "\"a//b\"");
        assert_eq!(quote_if_needed("a/*b"), "\"a/*b\"");

        let mut doc = parse("{ path = A.swift; }").unwrap();
        doc.root_mut()
            .as_object_mut()
            .unwrap()
            .set("path", Value::string("//Shared/Foo.swift"));
        let text = serialize(&doc);
        assert_eq!(text, "{ path = \"//Shared/Foo.swift\"; }");
        let reparsed = parse(&text).unwrap();
        assert_eq!(reparsed.root().as_object().unwrap().get_str("path"), Some("//Shared/Foo.swift"));
    }

    #[test]
    fn line_breaks_follow_the_neighbours() {
        assert_eq!(line_break_of("\r\n\t\t"), "\r\n");
        assert_eq!(line_break_of("\n\t\t"), "\n");
        assert_eq!(line_break_of("\t"), "\n");

        let (mut doc, _) = list_of("{\r\n\tfiles = (\r\n\t\tA,\r\n\t);\r\n}");
        let obj = doc.root_mut().as_object_mut().unwrap();
        obj.get_mut("files").unwrap().as_list_mut().unwrap().push(Value::string("B"));
        obj.push(Field::new(Scalar::new("k"), Value::string("v")));
        assert_eq!(
            serialize(&doc),
            "{\r\n\tfiles = (\r\n\t\tA,\r\n\t\tB,\r\n\t);\r\n\tk = v;\r\n}"
        );
    }

    #[test]
    fn push_into_empty_crlf_list() {
        let (mut doc, _) = list_of("{\r\n\tfiles = (\r\n\t);\r\n}");
        doc.root_mut()
            .as_object_mut()
            .unwrap()
            .get_mut("files")
            .unwrap()
            .as_list_mut()
            .unwrap()
            .push(Value::string("X"));
        assert_eq!(serialize(&doc), "{\r\n\tfiles = (\r\n\t\tX,\r\n\t);\r\n}");
    }

    #[test]
    fn push_into_multiline_list_copies_indent() {
        let (mut doc, _) = list_of("{\n\tchildren = (\n\t\tA,\n\t);\n}");
        let list = doc
            .root_mut()
            .as_object_mut()
            .unwrap()
            .get_mut("children")
            .unwrap()
            .as_list_mut()
            .unwrap();
        list.push(Value::Scalar(Scalar::new("B").with_note("B.swift")));
        assert_eq!(
            serialize(&doc),
            "{\n\tchildren = (\n\t\tA,\n\t\tB /* B.swift */,\n\t);\n}"
        );
    }

    #[test]
    fn push_into_empty_multiline_list_indents_one_level() {
        let (mut doc, _) = list_of("{\n\tfiles = (\n\t);\n}");
        let list = doc
            .root_mut()
            .as_object_mut()
            .unwrap()
            .get_mut("files")
            .unwrap()
            .as_list_mut()
            .unwrap();
        list.push(Value::string("X"));
        assert_eq!(serialize(&doc), "{\n\tfiles = (\n\t\tX,\n\t);\n}");
    }

    #[test]
    fn push_after_item_without_comma() {
        let (mut doc, _) = list_of("(a, b)");
        doc.root_mut().as_list_mut().unwrap().push(Value::string("c"));
        assert_eq!(serialize(&doc), "(a, b, c)");
    }

    #[test]
    fn remove_then_push_restores_bytes() {
        let text = "{\n\tfiles = (\n\t\tA,\n\t);\n}";
        let (mut doc, _) = list_of(text);
        let list = doc
            .root_mut()
            .as_object_mut()
            .unwrap()
            .get_mut("files")
            .unwrap()
            .as_list_mut()
            .unwrap();
        list.push(Value::string("B"));
        assert_eq!(list.remove_where(|v| v.as_str() == Some("B")), 1);
        assert_eq!(serialize(&doc), text);
    }

    #[test]
    fn remove_field_moves_section_comment_forward() {
        let text = "{\n/* Begin X section */\n\ta = 1;\n\tb = 2;\n}";
        let (mut doc, _) = list_of(text);
        let obj = doc.root_mut().as_object_mut().unwrap();
        obj.remove("a");
        assert_eq!(serialize(&doc), "{\n/* Begin X section */\n\tb = 2;\n}");
    }

    #[test]
    fn remove_last_field_moves_comment_into_trailing() {
        let text = "{\n\ta = 1;\n/* Begin X section */\n\tb = 2;\n}";
        let (mut doc, _) = list_of(text);
        doc.root_mut().as_object_mut().unwrap().remove("b");
        assert_eq!(serialize(&doc), "{\n\ta = 1;\n/* Begin X section */\n}");
    }

    #[test]
    fn insert_after_copies_neighbour_indent() {
        let (mut doc, _) = list_of("{\n\t\tA = 1;\n\t\tC = 3;\n}");
        let obj = doc.root_mut().as_object_mut().unwrap();
        obj.insert_after(0, Field::new(Scalar::new("B"), Value::string("2")));
        obj.push(Field::new(Scalar::new("D"), Value::string("4")));
        assert_eq!(
            serialize(&doc),
            "{\n\t\tA = 1;\n\t\tB = 2;\n\t\tC = 3;\n\t\tD = 4;\n}"
        );
    }

    #[test]
    fn set_existing_keeps_layout() {
        let (mut doc, _) = list_of("{isa = PBXFileReference; path = Old.swift; }");
        doc.root_mut()
            .as_object_mut()
            .unwrap()
            .set("path", Value::string("New File.swift"));
        assert_eq!(
            serialize(&doc),
            "{isa = PBXFileReference; path = \"New File.swift\"; }"
        );
    }

    #[test]
    fn set_missing_appends_in_line_style() {
        let (mut doc, _) = list_of("{isa = PBXFileReference; path = A.swift; }");
        doc.root_mut()
            .as_object_mut()
            .unwrap()
            .set("name", Value::string("A.swift"));
        assert_eq!(
            serialize(&doc),
            "{isa = PBXFileReference; path = A.swift; name = A.swift; }"
        );
    }

    #[test]
    fn inline_object_layout() {
        let obj = Object::inline(vec![
            ("isa", Value::string("PBXBuildFile")),
            ("fileRef", Value::Scalar(Scalar::new("F1").with_note("a.swift"))),
        ]);
        let doc = Document::new(Value::Object(obj));
        assert_eq!(
            serialize(&doc),
            "{isa = PBXBuildFile; fileRef = F1 /* a.swift */; }"
        );
    }

    #[test]
    fn structural_equality_ignores_trivia() {
        let a = parse("{ a = (x, y); b = \"z\"; }").unwrap();
        let b = parse("{\n\ta = (\n\t\tx /* note */,\n\t\ty,\n\t);\n\tb = z;\n}").unwrap();
        assert!(a.structurally_eq(&b));
    }
}
