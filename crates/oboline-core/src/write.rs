//! OBO serialization.
//!
//! Output is canonical: header tags in a fixed order, stanzas in registry
//! order, tags within a stanza in a fixed order, and relation labels sorted
//! with `is_a` first. Serializing, reparsing and serializing again yields
//! byte-identical text, which is what diff-based ontology review workflows
//! depend on.
//!
//! Builtin stanzas are never written. Resolved references gain a trailing
//! `! name` comment naming their target, which the scanner strips on the
//! way back in.

use std::io;

use crate::model::{Ontology, Stanza, StanzaData, StanzaKind, StanzaReference};
use crate::value::{escape_quoted, escape_value};

impl Ontology {
    /// Serialize to a writer.
    pub fn write_obo<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(self.to_obo_string().as_bytes())
    }

    /// Serialize to a canonical OBO document.
    pub fn to_obo_string(&self) -> String {
        let mut out = String::new();
        self.write_header(&mut out);
        for (_, stanza) in self.user_stanzas() {
            self.write_stanza(&mut out, stanza);
        }
        out
    }

    fn write_header(&self, out: &mut String) {
        out.push_str(&format!(
            "format-version: {}\n",
            escape_value(&self.format_version)
        ));
        if let Some(v) = &self.data_version {
            out.push_str(&format!("data-version: {}\n", escape_value(v)));
        }
        if let Some(v) = &self.date {
            out.push_str(&format!("date: {}\n", escape_value(v)));
        }
        if let Some(v) = &self.saved_by {
            out.push_str(&format!("saved-by: {}\n", escape_value(v)));
        }
        if let Some(v) = &self.auto_generated_by {
            out.push_str(&format!("auto-generated-by: {}\n", escape_value(v)));
        }
        for def in self.subsetdefs() {
            out.push_str(&format!(
                "subsetdef: {} \"{}\"\n",
                escape_value(&def.name),
                escape_quoted(&def.description)
            ));
        }
        for def in self.synonym_typedefs() {
            out.push_str(&format!(
                "synonymtypedef: {} \"{}\" {}\n",
                escape_value(&def.name),
                escape_quoted(&def.description),
                def.scope
            ));
        }
        if let Some(v) = &self.default_namespace {
            out.push_str(&format!("default-namespace: {}\n", escape_value(v)));
        }
        for remark in &self.remarks {
            out.push_str(&format!("remark: {}\n", escape_value(remark)));
        }
    }

    fn write_stanza(&self, out: &mut String, stanza: &Stanza) {
        let kind = match stanza.kind() {
            Some(kind) => kind,
            None => return,
        };
        out.push_str(&format!("\n[{kind}]\n"));
        out.push_str(&format!("id: {}\n", escape_value(&stanza.id.value)));
        if let Some(name) = &stanza.name {
            out.push_str(&format!("name: {}\n", escape_value(&name.value)));
        }
        for alt in &stanza.alt_ids {
            out.push_str(&format!("alt_id: {}\n", escape_value(alt)));
        }
        if let Some(def) = &stanza.definition {
            out.push_str(&format!(
                "def: \"{}\" [{}]\n",
                escape_quoted(&def.value),
                stanza.definition_dbxrefs.as_deref().unwrap_or("")
            ));
        }
        if let Some(subsets) = stanza.subsets() {
            for subset in subsets {
                out.push_str(&format!("subset: {}\n", escape_value(subset)));
            }
        }
        if let StanzaData::Typedef(typedef) = &stanza.data {
            if typedef.is_transitive {
                out.push_str("is_transitive: true\n");
            }
            for over in &typedef.transitive_over {
                out.push_str(&format!("transitive_over: {}\n", escape_value(over)));
            }
        }
        if let Some(comment) = &stanza.comment {
            out.push_str(&format!("comment: {}\n", escape_value(&comment.value)));
        }
        for synonym in &stanza.synonyms {
            out.push_str(&format!(
                "synonym: \"{}\" {}",
                escape_quoted(&synonym.text),
                synonym.scope
            ));
            if let Some(dbxrefs) = &synonym.dbxrefs {
                out.push_str(&format!(" [{dbxrefs}]"));
            }
            out.push('\n');
        }
        for xref in &stanza.xrefs {
            out.push_str(&format!("xref: {}", escape_value(&xref.target)));
            if let Some(qualifier) = xref.qualifier {
                out.push_str(&format!(" {qualifier}"));
                if let Some(matched) = &xref.matched {
                    out.push_str(&format!(" {matched}"));
                }
            }
            out.push('\n');
        }
        self.write_relations(out, stanza, kind);
        if let Some(table) = stanza.intersection_of() {
            for (_, refs) in table.iter() {
                for r in refs {
                    out.push_str(&format!(
                        "intersection_of: {} {}{}\n",
                        escape_value(&r.rel),
                        escape_value(&r.target),
                        self.target_comment(r)
                    ));
                }
            }
        }
        if stanza.is_anonymous {
            out.push_str("is_anonymous: true\n");
        }
        if stanza.is_obsolete {
            out.push_str("is_obsolete: true\n");
        }
        for target in &stanza.replaced_by {
            out.push_str(&format!("replaced_by: {}\n", escape_value(target)));
        }
        for target in &stanza.consider {
            out.push_str(&format!("consider: {}\n", escape_value(target)));
        }
        if let Some(v) = &stanza.created_by {
            out.push_str(&format!("created_by: {}\n", escape_value(v)));
        }
        if let Some(v) = &stanza.creation_date {
            out.push_str(&format!("creation_date: {}\n", escape_value(v)));
        }
    }

    /// References under their labels, `is_a` first, the rest lexicographic;
    /// declaration order within one label.
    fn write_relations(&self, out: &mut String, stanza: &Stanza, kind: StanzaKind) {
        let mut labels: Vec<&str> = stanza.references.relations().collect();
        labels.sort_by_key(|rel| (*rel != "is_a", *rel));
        for rel in labels {
            let refs = match stanza.references.get(rel) {
                Some(refs) => refs,
                None => continue,
            };
            for r in refs {
                out.push_str(&self.relation_line(r, kind));
            }
        }
    }

    fn relation_line(&self, r: &StanzaReference, kind: StanzaKind) -> String {
        let target = escape_value(&r.target);
        let comment = self.target_comment(r);
        if self.is_builtin_relation(&r.rel) {
            return format!("{}: {}{}\n", r.rel, target, comment);
        }
        let rel = escape_value(&r.rel);
        match kind {
            StanzaKind::Instance => match &r.literal {
                Some(literal) => format!(
                    "property_value: {} \"{}\" {}{}\n",
                    rel,
                    escape_quoted(literal),
                    target,
                    comment
                ),
                None => format!("property_value: {} {}{}\n", rel, target, comment),
            },
            _ => format!("relationship: {} {}{}\n", rel, target, comment),
        }
    }

    /// ` ! name` when the reference is resolved and its target has a name.
    fn target_comment(&self, r: &StanzaReference) -> String {
        r.resolved_target
            .and_then(|sid| self.stanza(sid).name.as_ref())
            .map(|name| format!(" ! {}", name.value))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{DeprecatedTagPolicy, ResolutionPolicy, UnhandledTagPolicy};

    fn load(text: &str) -> Ontology {
        let mut onto = Ontology::new();
        onto.load_str(
            "<test>",
            text,
            UnhandledTagPolicy::Fail,
            DeprecatedTagPolicy::Silent,
        )
        .expect("document loads");
        onto
    }

    #[test]
    fn builtins_are_never_written() {
        let onto = Ontology::new();
        assert_eq!(onto.to_obo_string(), "format-version: 1.2\n");
    }

    #[test]
    fn relations_sort_is_a_first_then_lexicographic() {
        let mut onto = load(
            "[Typedef]\nid: part_of\nname: part of\n\n\
             [Typedef]\nid: adjacent_to\nname: adjacent to\n\n\
             [Term]\nid: A:1\nname: a\n\n\
             [Term]\nid: A:2\nname: b\n\
             relationship: part_of A:1\n\
             relationship: adjacent_to A:1\n\
             is_a: A:1\n",
        );
        onto.resolve_references(ResolutionPolicy::Fail, ResolutionPolicy::Fail)
            .expect("resolves");
        let text = onto.to_obo_string();
        let b_block = text.split("id: A:2").nth(1).expect("A:2 block");
        let is_a = b_block.find("is_a: A:1 ! a").expect("is_a line");
        let adjacent = b_block
            .find("relationship: adjacent_to A:1 ! a")
            .expect("adjacent_to line");
        let part = b_block
            .find("relationship: part_of A:1 ! a")
            .expect("part_of line");
        assert!(is_a < adjacent && adjacent < part);
    }

    #[test]
    fn resolved_targets_gain_name_comments() {
        let mut onto = load(
            "[Term]\nid: A:1\nname: root\n\n\
             [Term]\nid: A:2\nname: leaf\nis_a: A:1\n",
        );
        onto.resolve_references(ResolutionPolicy::Fail, ResolutionPolicy::Fail)
            .expect("resolves");
        assert!(onto.to_obo_string().contains("is_a: A:1 ! root\n"));
    }

    #[test]
    fn unresolved_targets_are_written_bare() {
        let onto = load("[Term]\nid: A:1\nname: a\nis_a: GHOST:1\n");
        assert!(onto.to_obo_string().contains("is_a: GHOST:1\n"));
    }

    #[test]
    fn special_characters_are_escaped_on_output() {
        let mut onto = load("[Term]\nid: A:1\nname: a\n");
        let sid = onto.lookup("A:1").expect("A:1");
        onto.stanza_mut(sid).name.as_mut().expect("name").value = "line\nbreak [x]".to_string();
        let text = onto.to_obo_string();
        assert!(text.contains(r"name: line\nbreak \[x\]"));
    }

    #[test]
    fn instance_property_values_round_trip_their_literal() {
        let onto = load(
            "[Instance]\nid: IDS:1\ninstance_of: PERSON:1\n\
             property_value: shoe_size \"8\" SIZE:1\n",
        );
        let text = onto.to_obo_string();
        assert!(text.contains("instance_of: PERSON:1\n"));
        assert!(text.contains("property_value: shoe_size \"8\" SIZE:1\n"));
    }

    #[test]
    fn synonyms_without_dbxrefs_round_trip_without_brackets() {
        let onto = load("[Term]\nid: A:1\nname: a\nsynonym: \"alpha\" EXACT\n");
        let text = onto.to_obo_string();
        assert!(text.contains("synonym: \"alpha\" EXACT\n"));

        let mut reparsed = Ontology::new();
        reparsed
            .load_str(
                "<round>",
                &text,
                UnhandledTagPolicy::Fail,
                DeprecatedTagPolicy::Silent,
            )
            .expect("canonical output reparses");
        let a = reparsed.stanza(reparsed.lookup("A:1").expect("A:1"));
        assert_eq!(a.synonyms[0].dbxrefs, None);

        let onto = load("[Term]\nid: A:1\nname: a\nsynonym: \"alpha\" EXACT []\n");
        assert!(onto.to_obo_string().contains("synonym: \"alpha\" EXACT []\n"));
    }

    #[test]
    fn serialization_reaches_a_fixed_point() {
        let first = load(
            "format-version: 1.2\n\
             data-version: 2026-08-01\n\
             subsetdef: slim \"the slim\"\n\
             synonymtypedef: UK_SPELLING \"UK spelling\" EXACT\n\
             default-namespace: testing\n\
             remark: written by hand\n\
             [Typedef]\nid: part_of\nname: part of\nis_transitive: true\n\n\
             [Term]\nid: A:1\nname: a\ndef: \"the a\" [T:1]\nsubset: slim\n\
             synonym: \"colour\" UK_SPELLING\nxref: DB:1 NO MATCH\n\n\
             [Term]\nid: A:2\nname: b\nis_a: A:1\nrelationship: part_of A:1\n\
             intersection_of: A:1\nintersection_of: part_of A:1\n\
             is_obsolete: true\nreplaced_by: A:1\n",
        )
        .to_obo_string();

        let mut reparsed = Ontology::new();
        reparsed
            .load_str(
                "<round>",
                &first,
                UnhandledTagPolicy::Fail,
                DeprecatedTagPolicy::Silent,
            )
            .expect("canonical output reparses");
        assert_eq!(reparsed.to_obo_string(), first);
    }
}
