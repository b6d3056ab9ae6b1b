//! Section-aware placement in the `objects` table
//!
//! Xcode groups objects by `isa` between `/* Begin X section */` and
//! `/* End X section */` comments, sections sorted by name. New entries go
//! to the end of their section; a missing section is created in sorted
//! position. Those markers live in the leading trivia of the first entry of
//! each section (and in the table's closing trivia for the last `End`).

use pbx_plist::{Field, Object, Value};

const BEGIN: &str = "/* Begin ";
const END: &str = "/* End ";
const SUFFIX: &str = " section */";

fn isa_of(field: &Field) -> Option<&str> {
    field.value().as_object().and_then(|o| o.get_str("isa"))
}

/// Section name opened in `lead`, if any
fn opened_section(lead: &str) -> Option<&str> {
    let start = lead.find(BEGIN)? + BEGIN.len();
    let len = lead[start..].find(SUFFIX)?;
    Some(&lead[start..start + len])
}

fn last_line(text: &str) -> &str {
    text.rsplit('\n').next().unwrap_or(text)
}

/// `\r\n` when `text` already uses it
fn line_break(text: &str) -> &'static str {
    if text.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

/// Insert `field` as a new entry of kind `isa`; returns its index
pub(crate) fn insert_entry(objects: &mut Object, isa: &str, field: Field) -> usize {
    if let Some(last) = objects.fields().iter().rposition(|f| isa_of(f) == Some(isa)) {
        objects.insert_after(last, field);
        return last + 1;
    }
    let sectioned = objects
        .fields()
        .iter()
        .any(|f| opened_section(f.lead()).is_some());
    if !sectioned {
        objects.push(field);
        return objects.len() - 1;
    }
    open_section(objects, isa, field)
}

fn open_section(objects: &mut Object, isa: &str, mut field: Field) -> usize {
    let next = objects
        .fields()
        .iter()
        .position(|f| opened_section(f.lead()).is_some_and(|name| name > isa));

    match next {
        Some(index) => {
            let lead = objects.fields()[index].lead().to_string();
            let split = lead.find(BEGIN).unwrap_or(0);
            let (before, rest) = lead.split_at(split);
            let indent = last_line(&lead);
            let nl = line_break(&lead);
            field.set_lead(format!("{before}{BEGIN}{isa}{SUFFIX}{nl}{indent}"));
            objects.fields_mut()[index].set_lead(format!("{nl}{END}{isa}{SUFFIX}{nl}{nl}{rest}"));
            objects.insert(index, field);
            index
        }
        None => {
            let trailing = objects.trailing().to_string();
            let nl = line_break(&trailing);
            let (body, closing) = trailing.rsplit_once('\n').unwrap_or(("", trailing.as_str()));
            let body = body.strip_suffix('\r').unwrap_or(body);
            let indent = objects
                .fields()
                .last()
                .map_or_else(|| format!("{closing}\t"), |f| last_line(f.lead()).to_string());
            field.set_lead(format!("{body}{nl}{nl}{BEGIN}{isa}{SUFFIX}{nl}{indent}"));
            objects.set_trailing(format!("{nl}{END}{isa}{SUFFIX}{nl}{closing}"));
            let index = objects.len();
            objects.insert(index, field);
            index
        }
    }
}

/// Remove the entry keyed `id`, dropping its section if it became empty
pub(crate) fn remove_entry(objects: &mut Object, id: &str) -> Option<Field> {
    let index = objects.position(id)?;
    let isa = isa_of(&objects.fields()[index]).map(str::to_string);
    let removed = objects.remove_at(index);
    if let Some(isa) = isa {
        let still_present = objects.fields().iter().any(|f| isa_of(f) == Some(isa.as_str()));
        if !still_present {
            match objects.fields_mut().get_mut(index) {
                Some(next) => {
                    let mut lead = next.lead().to_string();
                    if drop_empty_section(&mut lead, &isa) {
                        next.set_lead(lead);
                    }
                }
                None => {
                    let mut trailing = objects.trailing().to_string();
                    if drop_empty_section(&mut trailing, &isa) {
                        objects.set_trailing(trailing);
                    }
                }
            }
        }
    }
    Some(removed)
}

/// Cut `<ws>/* Begin X section */<ws>/* End X section */` out of `text`
fn drop_empty_section(text: &mut String, isa: &str) -> bool {
    let begin = format!("{BEGIN}{isa}{SUFFIX}");
    let end = format!("{END}{isa}{SUFFIX}");
    let Some(b) = text.find(&begin) else {
        return false;
    };
    let after_begin = b + begin.len();
    let gap = &text[after_begin..];
    let trimmed = gap.trim_start();
    if !trimmed.starts_with(&end) {
        return false;
    }
    let e = after_begin + (gap.len() - trimmed.len()) + end.len();
    let start = text[..b].trim_end().len();
    text.replace_range(start..e, "");
    true
}

/// Mutable list `key` of the object keyed `id`
pub(crate) fn list_mut<'a>(
    objects: &'a mut Object,
    id: &str,
    key: &str,
) -> Option<&'a mut pbx_plist::List> {
    objects
        .get_mut(id)?
        .as_object_mut()?
        .get_mut(key)?
        .as_list_mut()
}

/// Mutable body of the object keyed `id`
pub(crate) fn object_mut<'a>(objects: &'a mut Object, id: &str) -> Option<&'a mut Object> {
    objects.get_mut(id).and_then(Value::as_object_mut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbx_plist::{parse, serialize, Document, Scalar};
    use pretty_assertions::assert_eq;

    const TABLE: &str = "{\n\tobjects = {\n\n/* Begin PBXBuildFile section */\n\t\tB1 = {isa = PBXBuildFile; fileRef = F1; };\n/* End PBXBuildFile section */\n\n/* Begin PBXGroup section */\n\t\tG1 = {isa = PBXGroup; children = (); };\n/* End PBXGroup section */\n\t};\n}";

    fn objects(doc: &mut Document) -> &mut Object {
        doc.root_mut()
            .as_object_mut()
            .unwrap()
            .get_mut("objects")
            .unwrap()
            .as_object_mut()
            .unwrap()
    }

    fn entry(id: &str, isa: &str) -> Field {
        Field::new(
            Scalar::new(id),
            Value::Object(Object::inline(vec![("isa", Value::string(isa))])),
        )
    }

    #[test]
    fn appends_to_existing_section() {
        let mut doc = parse(TABLE).unwrap();
        let index = insert_entry(objects(&mut doc), "PBXBuildFile", entry("B2", "PBXBuildFile"));
        assert_eq!(index, 1);
        assert!(serialize(&doc).contains(
            "B1 = {isa = PBXBuildFile; fileRef = F1; };\n\t\tB2 = {isa = PBXBuildFile; };\n/* End PBXBuildFile section */"
        ));
    }

    #[test]
    fn creates_section_in_sorted_position() {
        let mut doc = parse(TABLE).unwrap();
        insert_entry(objects(&mut doc), "PBXFileReference", entry("F1", "PBXFileReference"));
        assert!(serialize(&doc).contains(
            "/* End PBXBuildFile section */\n\n/* Begin PBXFileReference section */\n\t\tF1 = {isa = PBXFileReference; };\n/* End PBXFileReference section */\n\n/* Begin PBXGroup section */"
        ));
    }

    #[test]
    fn creates_trailing_section() {
        let mut doc = parse(TABLE).unwrap();
        insert_entry(objects(&mut doc), "PBXVariantGroup", entry("V1", "PBXVariantGroup"));
        assert!(serialize(&doc).ends_with(
            "/* End PBXGroup section */\n\n/* Begin PBXVariantGroup section */\n\t\tV1 = {isa = PBXVariantGroup; };\n/* End PBXVariantGroup section */\n\t};\n}"
        ));
    }

    #[test]
    fn creates_leading_section() {
        let mut doc = parse(TABLE).unwrap();
        insert_entry(objects(&mut doc), "PBXAggregateTarget", entry("A1", "PBXAggregateTarget"));
        assert!(serialize(&doc).starts_with(
            "{\n\tobjects = {\n\n/* Begin PBXAggregateTarget section */\n\t\tA1 = {isa = PBXAggregateTarget; };\n/* End PBXAggregateTarget section */\n\n/* Begin PBXBuildFile section */"
        ));
    }

    #[test]
    fn insert_then_remove_restores_bytes() {
        for isa in ["PBXAggregateTarget", "PBXBuildFile", "PBXFileReference", "PBXVariantGroup"] {
            let mut doc = parse(TABLE).unwrap();
            insert_entry(objects(&mut doc), isa, entry("NEW", isa));
            assert!(remove_entry(objects(&mut doc), "NEW").is_some());
            assert_eq!(serialize(&doc), TABLE, "section {isa}");
        }
    }

    #[test]
    fn crlf_table_keeps_its_line_breaks() {
        let crlf = TABLE.replace('\n', "\r\n");
        for isa in ["PBXAggregateTarget", "PBXBuildFile", "PBXFileReference", "PBXVariantGroup"] {
            let mut doc = parse(&crlf).unwrap();
            insert_entry(objects(&mut doc), isa, entry("NEW", isa));
            let text = serialize(&doc);
            assert_eq!(text.matches('\n').count(), text.matches("\r\n").count(), "section {isa}");
            assert!(text.contains(&format!("\t\tNEW = {{isa = {isa}; }};\r\n")), "section {isa}");

            assert!(remove_entry(objects(&mut doc), "NEW").is_some());
            assert_eq!(serialize(&doc), crlf, "section {isa}");
        }
    }

    #[test]
    fn unsectioned_table_appends() {
        let text = "{ objects = { A = {isa = PBXGroup; children = (); }; }; }";
        let mut doc = parse(text).unwrap();
        insert_entry(objects(&mut doc), "PBXFileReference", entry("F", "PBXFileReference"));
        assert_eq!(
            serialize(&doc),
            "{ objects = { A = {isa = PBXGroup; children = (); }; F = {isa = PBXFileReference; }; }; }"
        );
    }

    #[test]
    fn removing_last_member_drops_markers() {
        let mut doc = parse(TABLE).unwrap();
        remove_entry(objects(&mut doc), "B1");
        assert_eq!(
            serialize(&doc),
            "{\n\tobjects = {\n\n/* Begin PBXGroup section */\n\t\tG1 = {isa = PBXGroup; children = (); };\n/* End PBXGroup section */\n\t};\n}"
        );
    }
}
