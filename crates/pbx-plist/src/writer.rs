//! Serializer
//!
//! Concatenates tokens and their stored trivia. Untouched regions come out
//! byte-identical to the input; new elements carry the trivia the tree's
//! editing methods chose for them.

use crate::tree::{Document, List, Object, Scalar, Value};

/// Render a document back to text
#[must_use]
pub fn serialize(doc: &Document) -> String {
    let mut out = String::with_capacity(doc.head.len() + doc.tail.len() + 4096);
    out.push_str(&doc.head);
    write_value(&mut out, &doc.root);
    out.push_str(&doc.tail);
    out
}

/// Render a single value (no surrounding trivia)
#[must_use]
pub fn serialize_value(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Scalar(s) => write_scalar(out, s),
        Value::List(l) => write_list(out, l),
        Value::Object(o) => write_object(out, o),
    }
}

fn write_scalar(out: &mut String, scalar: &Scalar) {
    out.push_str(&scalar.raw);
    if let Some(note) = &scalar.note {
        out.push_str(&note.gap);
        out.push_str("/*");
        out.push_str(&note.body);
        out.push_str("*/");
    }
}

fn write_object(out: &mut String, object: &Object) {
    out.push('{');
    for field in &object.fields {
        out.push_str(&field.lead);
        write_scalar(out, &field.key);
        out.push_str(&field.before_eq);
        out.push('=');
        out.push_str(&field.after_eq);
        write_value(out, &field.value);
        out.push_str(&field.before_semi);
        out.push(';');
    }
    out.push_str(&object.trailing);
    out.push('}');
}

fn write_list(out: &mut String, list: &List) {
    out.push('(');
    for item in &list.items {
        out.push_str(&item.lead);
        write_value(out, &item.value);
        out.push_str(&item.before_comma);
        if item.comma {
            out.push(',');
        }
    }
    out.push_str(&list.trailing);
    out.push(')');
}
