//! Line scanner and tag dispatch.
//!
//! Loading is single-pass over lines: blank lines and `!` comment lines are
//! skipped, `[...]` headers switch the current stanza kind, and every other
//! line must be `tag: value` split at the first unescaped colon. The first
//! tag of a stanza block must be `id`; it creates the stanza (or re-attaches
//! to an existing one with the same id, so one ontology can span several
//! files) and every following tag mutates it in place.
//!
//! Tag recognition is layered the way the format nests its stanza kinds:
//! tags shared by all stanzas, then tags shared by Term and Typedef, then
//! kind-specific tags. A tag no layer claims falls through to the
//! caller-supplied [`UnhandledTagPolicy`].

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Location, OboError};
use crate::model::{
    Ontology, StanzaData, StanzaId, StanzaKind, StanzaReference, SubsetDef, Synonym,
    SynonymTypeDef, XRef,
};
use crate::policy::{DeprecatedTagPolicy, UnhandledTagPolicy};
use crate::value::{self, Scope, SourcedValue};

impl Ontology {
    /// Load one or more OBO files into this ontology, in order. Stanzas
    /// with the same id across files are merged.
    pub fn load_files<P: AsRef<Path>>(
        &mut self,
        paths: impl IntoIterator<Item = P>,
        unhandled: UnhandledTagPolicy,
        deprecated: DeprecatedTagPolicy,
    ) -> Result<(), OboError> {
        for path in paths {
            let path = path.as_ref();
            let source = path.display().to_string();
            let file = File::open(path).map_err(|e| OboError::Io {
                path: source.clone(),
                source: e,
            })?;
            self.load_reader(&source, BufReader::new(file), unhandled, deprecated)?;
        }
        Ok(())
    }

    /// Load from any buffered reader; `source` names the input in
    /// diagnostics.
    pub fn load_reader<R: BufRead>(
        &mut self,
        source: &str,
        reader: R,
        unhandled: UnhandledTagPolicy,
        deprecated: DeprecatedTagPolicy,
    ) -> Result<(), OboError> {
        let mut loader = Loader::new(self, source, unhandled, deprecated);
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| OboError::Io {
                path: source.to_string(),
                source: e,
            })?;
            loader.line(idx + 1, &line)?;
        }
        Ok(())
    }

    /// Load from an in-memory document.
    pub fn load_str(
        &mut self,
        source: &str,
        text: &str,
        unhandled: UnhandledTagPolicy,
        deprecated: DeprecatedTagPolicy,
    ) -> Result<(), OboError> {
        let mut loader = Loader::new(self, source, unhandled, deprecated);
        for (idx, line) in text.lines().enumerate() {
            loader.line(idx + 1, line)?;
        }
        Ok(())
    }
}

/// Where the scanner is inside the document.
#[derive(Clone, Copy)]
enum Block {
    /// Before the first stanza header.
    Header,
    /// Inside a stanza block; `current` is set once `id:` has been seen.
    Body {
        kind: StanzaKind,
        current: Option<StanzaId>,
    },
}

struct Loader<'a> {
    onto: &'a mut Ontology,
    source: String,
    unhandled: UnhandledTagPolicy,
    deprecated: DeprecatedTagPolicy,
    block: Block,
}

/// Split at the first unescaped colon.
fn split_tag_value(line: &str) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            ':' => return Some((&line[..i], &line[i + 1..])),
            _ => {}
        }
    }
    None
}

impl<'a> Loader<'a> {
    fn new(
        onto: &'a mut Ontology,
        source: &str,
        unhandled: UnhandledTagPolicy,
        deprecated: DeprecatedTagPolicy,
    ) -> Self {
        Self {
            onto,
            source: source.to_string(),
            unhandled,
            deprecated,
            block: Block::Header,
        }
    }

    fn line(&mut self, number: usize, raw: &str) -> Result<(), OboError> {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('!') {
            return Ok(());
        }
        let location = Location::new(self.source.as_str(), number);

        if line.starts_with('[') {
            return self.stanza_header(location, line);
        }

        let (tag, rest) = split_tag_value(line).ok_or_else(|| OboError::Syntax {
            location: location.clone(),
        })?;
        let tag = value::unescape(tag.trim());
        let value = SourcedValue::new(location, rest.trim().to_string());

        match self.block {
            Block::Header => self.header_tag(&tag, value),
            Block::Body { kind, current } => match current {
                None if tag == "id" => {
                    let id = value::id_value("id", &value)?;
                    let sid = self
                        .onto
                        .create_stanza(kind, SourcedValue::new(value.location, id))?;
                    self.block = Block::Body {
                        kind,
                        current: Some(sid),
                    };
                    Ok(())
                }
                None => Err(OboError::ExpectedId {
                    location: value.location,
                }),
                Some(sid) => self.stanza_tag(kind, sid, &tag, value),
            },
        }
    }

    fn stanza_header(&mut self, location: Location, line: &str) -> Result<(), OboError> {
        let end = line.find(']').ok_or_else(|| OboError::Syntax {
            location: location.clone(),
        })?;
        let trailer = line[end + 1..].trim_start();
        if !trailer.is_empty() && !trailer.starts_with('!') {
            return Err(OboError::Syntax { location });
        }
        let kind = match &line[1..end] {
            "Term" => StanzaKind::Term,
            "Typedef" => StanzaKind::Typedef,
            "Instance" => StanzaKind::Instance,
            other => {
                return Err(OboError::UnknownStanzaKind {
                    location,
                    kind: other.to_string(),
                })
            }
        };
        self.block = Block::Body {
            kind,
            current: None,
        };
        Ok(())
    }

    // ------------------------------------------------------------------
    // Header tags
    // ------------------------------------------------------------------

    fn header_tag(&mut self, tag: &str, value: SourcedValue<String>) -> Result<(), OboError> {
        match tag {
            "format-version" => self.onto.format_version = value::free_value(tag, &value)?,
            "data-version" => self.onto.data_version = Some(value::free_value(tag, &value)?),
            "date" => self.onto.date = Some(value::free_value(tag, &value)?),
            "saved-by" => self.onto.saved_by = Some(value::free_value(tag, &value)?),
            "auto-generated-by" => {
                self.onto.auto_generated_by = Some(value::free_value(tag, &value)?)
            }
            "default-namespace" => {
                self.onto.default_namespace = Some(value::free_value(tag, &value)?)
            }
            "remark" => {
                let remark = value::free_value(tag, &value)?;
                self.onto.remarks.push(remark);
            }
            "subsetdef" => {
                let (name, description) = value::subsetdef_value(tag, &value)?;
                self.onto.declare_subsetdef(SubsetDef {
                    name,
                    description,
                    location: value.location,
                });
            }
            "synonymtypedef" => {
                let (name, description, scope) = value::synonymtypedef_value(tag, &value)?;
                self.onto.declare_synonym_typedef(SynonymTypeDef {
                    name,
                    description,
                    scope,
                    location: value.location,
                });
            }
            _ => {
                return self
                    .unhandled
                    .apply(tag, value, &mut self.onto.unhandled_tags)
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Stanza tags
    // ------------------------------------------------------------------

    fn stanza_tag(
        &mut self,
        kind: StanzaKind,
        sid: StanzaId,
        tag: &str,
        value: SourcedValue<String>,
    ) -> Result<(), OboError> {
        if self.base_tag(sid, tag, &value)? {
            return Ok(());
        }
        let handled = match kind {
            StanzaKind::Term => {
                self.term_or_type_tag(sid, tag, &value)? || self.term_tag(sid, tag, &value)?
            }
            StanzaKind::Typedef => {
                self.term_or_type_tag(sid, tag, &value)? || self.typedef_tag(sid, tag, &value)?
            }
            StanzaKind::Instance => self.instance_tag(sid, tag, &value)?,
        };
        if handled {
            return Ok(());
        }
        let stanza = self.onto.stanza_mut(sid);
        self.unhandled.apply(tag, value, &mut stanza.unhandled_tags)
    }

    /// Tags common to every stanza kind.
    fn base_tag(
        &mut self,
        sid: StanzaId,
        tag: &str,
        value: &SourcedValue<String>,
    ) -> Result<bool, OboError> {
        match tag {
            "id" => {
                let previous = self.onto.stanza(sid).id.location.clone();
                return Err(OboError::DuplicateTag {
                    location: value.location.clone(),
                    tag: tag.to_string(),
                    previous,
                });
            }
            "name" => {
                let name = value::free_value(tag, value)?;
                let stanza = self.onto.stanza_mut(sid);
                match &stanza.name {
                    // re-stating the same name across files is common
                    Some(existing) if existing.value == name => {}
                    Some(existing) => {
                        tracing::warn!(
                            "{}: duplicate tag name, see: {}",
                            value.location,
                            existing.location
                        );
                        // the latest declaration wins
                        stanza.name = Some(SourcedValue::new(value.location.clone(), name));
                    }
                    None => stanza.name = Some(SourcedValue::new(value.location.clone(), name)),
                }
            }
            "is_anonymous" => {
                self.onto.stanza_mut(sid).is_anonymous = value::boolean_value(tag, value)?;
            }
            "alt_id" => {
                let alt = value::id_value(tag, value)?;
                self.onto.stanza_mut(sid).alt_ids.push(alt);
            }
            "def" => {
                let parsed = value::definition_value(tag, value)?;
                let stanza = self.onto.stanza_mut(sid);
                if let Some(existing) = &stanza.definition {
                    return Err(OboError::DuplicateTag {
                        location: value.location.clone(),
                        tag: tag.to_string(),
                        previous: existing.location.clone(),
                    });
                }
                stanza.definition = Some(SourcedValue::new(value.location.clone(), parsed.text));
                stanza.definition_dbxrefs = parsed.dbxrefs;
            }
            "comment" => {
                let comment = value::free_value(tag, value)?;
                let stanza = self.onto.stanza_mut(sid);
                if let Some(existing) = &stanza.comment {
                    return Err(OboError::DuplicateTag {
                        location: value.location.clone(),
                        tag: tag.to_string(),
                        previous: existing.location.clone(),
                    });
                }
                stanza.comment = Some(SourcedValue::new(value.location.clone(), comment));
            }
            "synonym" => self.read_synonym(sid, tag, value, None)?,
            "xref" => self.read_xref(sid, tag, value)?,
            "is_obsolete" => {
                self.onto.stanza_mut(sid).is_obsolete = value::boolean_value(tag, value)?;
            }
            "replaced_by" => {
                let target = value::id_value(tag, value)?;
                self.onto.stanza_mut(sid).replaced_by.push(target);
            }
            "consider" => {
                let target = value::id_value(tag, value)?;
                self.onto.stanza_mut(sid).consider.push(target);
            }
            "namespace" => {
                self.onto.stanza_mut(sid).namespace = Some(value::id_value(tag, value)?);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Tags shared by Term and Typedef stanzas.
    fn term_or_type_tag(
        &mut self,
        sid: StanzaId,
        tag: &str,
        value: &SourcedValue<String>,
    ) -> Result<bool, OboError> {
        match tag {
            "subset" => {
                let name = value::id_value(tag, value)?;
                if self.onto.subsetdef(&name).is_none() {
                    return Err(OboError::UndeclaredSubset {
                        location: value.location.clone(),
                        name,
                    });
                }
                let stanza = self.onto.stanza_mut(sid);
                let subsets = match &mut stanza.data {
                    StanzaData::Term(t) => &mut t.subsets,
                    StanzaData::Typedef(t) => &mut t.subsets,
                    _ => unreachable!("subset dispatched for Term and Typedef only"),
                };
                if subsets.contains(&name) {
                    tracing::warn!("{}: duplicate subset {name}", value.location);
                } else {
                    subsets.push(name);
                }
            }
            "is_a" | "disjoint_from" | "union_of" => {
                let target = value::id_value(tag, value)?;
                self.push_reference(sid, StanzaReference::new(value.location.clone(), tag, target));
            }
            "relationship" => {
                let (rel, target) = value::relationship_value(tag, value)?;
                self.push_reference(sid, StanzaReference::new(value.location.clone(), rel, target));
            }
            "exact_synonym" => self.read_deprecated_synonym(sid, tag, value, Scope::Exact)?,
            "broad_synonym" => self.read_deprecated_synonym(sid, tag, value, Scope::Broad)?,
            "narrow_synonym" => self.read_deprecated_synonym(sid, tag, value, Scope::Narrow)?,
            "related_synonym" => self.read_deprecated_synonym(sid, tag, value, Scope::Related)?,
            "xref_analog" | "xref_unk" => {
                self.deprecated.apply(tag, value);
                self.read_xref(sid, tag, value)?;
            }
            "use_term" => {
                self.deprecated.apply(tag, value);
                let target = value::id_value(tag, value)?;
                self.onto.stanza_mut(sid).consider.push(target);
            }
            "created_by" => {
                self.onto.stanza_mut(sid).created_by = Some(value::free_value(tag, value)?);
            }
            "creation_date" => {
                self.onto.stanza_mut(sid).creation_date = Some(value::free_value(tag, value)?);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Term-only tags.
    fn term_tag(
        &mut self,
        sid: StanzaId,
        tag: &str,
        value: &SourcedValue<String>,
    ) -> Result<bool, OboError> {
        match tag {
            "intersection_of" => {
                let (rel, target) = value::intersection_value(tag, value)?;
                let stanza = self.onto.stanza_mut(sid);
                match &mut stanza.data {
                    StanzaData::Term(t) => t
                        .intersection_of
                        .push(StanzaReference::new(value.location.clone(), rel, target)),
                    _ => unreachable!("intersection_of dispatched for Term only"),
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Typedef-only tags: relation endpoints and the algebraic flags.
    fn typedef_tag(
        &mut self,
        sid: StanzaId,
        tag: &str,
        value: &SourcedValue<String>,
    ) -> Result<bool, OboError> {
        match tag {
            "domain" | "range" | "inverse_of" => {
                let target = value::id_value(tag, value)?;
                self.push_reference(sid, StanzaReference::new(value.location.clone(), tag, target));
                return Ok(true);
            }
            "transitive_over" => {
                let target = value::id_value(tag, value)?;
                let stanza = self.onto.stanza_mut(sid);
                match &mut stanza.data {
                    StanzaData::Typedef(t) => t.transitive_over.push(target),
                    _ => unreachable!("transitive_over dispatched for Typedef only"),
                }
                return Ok(true);
            }
            _ => {}
        }
        let flag = match tag {
            "is_cyclic" | "is_reflexive" | "is_symmetric" | "is_anti_symmetric"
            | "is_transitive" | "is_metadata_tag" => value::boolean_value(tag, value)?,
            _ => return Ok(false),
        };
        let stanza = self.onto.stanza_mut(sid);
        match &mut stanza.data {
            StanzaData::Typedef(t) => match tag {
                "is_cyclic" => t.is_cyclic = flag,
                "is_reflexive" => t.is_reflexive = flag,
                "is_symmetric" => t.is_symmetric = flag,
                "is_anti_symmetric" => t.is_anti_symmetric = flag,
                "is_transitive" => t.is_transitive = flag,
                "is_metadata_tag" => t.is_metadata_tag = flag,
                _ => unreachable!(),
            },
            _ => unreachable!("typedef flags dispatched for Typedef only"),
        }
        Ok(true)
    }

    /// Instance-only tags.
    fn instance_tag(
        &mut self,
        sid: StanzaId,
        tag: &str,
        value: &SourcedValue<String>,
    ) -> Result<bool, OboError> {
        match tag {
            "instance_of" => {
                let target = value::id_value(tag, value)?;
                self.push_reference(
                    sid,
                    StanzaReference::new(value.location.clone(), "instance_of", target),
                );
            }
            "property_value" => {
                let (rel, literal, target) = value::property_value(tag, value)?;
                let mut reference = StanzaReference::new(value.location.clone(), rel, target);
                reference.literal = literal;
                self.push_reference(sid, reference);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn push_reference(&mut self, sid: StanzaId, reference: StanzaReference) {
        self.onto.stanza_mut(sid).references.push(reference);
    }

    fn read_synonym(
        &mut self,
        sid: StanzaId,
        tag: &str,
        value: &SourcedValue<String>,
        forced_scope: Option<Scope>,
    ) -> Result<(), OboError> {
        let parsed = if forced_scope.is_some() {
            value::deprecated_synonym_value(tag, value)?
        } else {
            value::synonym_value(tag, value)?
        };
        // the synonym type's declared scope is the fallback, so the type
        // must already be declared in the header
        let declared_scope = match parsed.type_name.as_deref() {
            Some(name) => Some(
                self.onto
                    .synonym_typedef(name)
                    .ok_or_else(|| OboError::UndeclaredSynonymType {
                        location: value.location.clone(),
                        name: name.to_string(),
                    })?
                    .1
                    .scope,
            ),
            None => None,
        };
        let scope = forced_scope
            .or(parsed.scope)
            .or(declared_scope)
            .unwrap_or(Scope::Related);
        self.onto.stanza_mut(sid).synonyms.push(Synonym {
            text: parsed.text,
            scope,
            type_name: parsed.type_name,
            dbxrefs: parsed.dbxrefs,
            location: value.location.clone(),
            resolved_type: None,
        });
        Ok(())
    }

    fn read_deprecated_synonym(
        &mut self,
        sid: StanzaId,
        tag: &str,
        value: &SourcedValue<String>,
        scope: Scope,
    ) -> Result<(), OboError> {
        self.deprecated.apply(tag, value);
        self.read_synonym(sid, tag, value, Some(scope))
    }

    fn read_xref(
        &mut self,
        sid: StanzaId,
        tag: &str,
        value: &SourcedValue<String>,
    ) -> Result<(), OboError> {
        let parsed = value::xref_value(tag, value)?;
        self.onto.stanza_mut(sid).xrefs.push(XRef {
            target: parsed.target,
            description: parsed.description,
            qualifier: parsed.qualifier,
            matched: parsed.matched,
            location: value.location.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::XRefMatch;

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

    fn load_err(text: &str) -> OboError {
        let mut onto = Ontology::new();
        onto.load_str(
            "<test>",
            text,
            UnhandledTagPolicy::Fail,
            DeprecatedTagPolicy::Silent,
        )
        .unwrap_err()
    }

    const SMALL: &str = "\
format-version: 1.2
default-namespace: cell_biology
subsetdef: goslim_plant \"Plant GO slim\"
synonymtypedef: UK_SPELLING \"UK spelling\" EXACT

! a comment line
[Term]
id: GO:0005634
name: nucleus
def: \"A membrane-bounded organelle\" [GO:curators]
synonym: \"cell nucleus\" EXACT []
subset: goslim_plant
is_a: GO:0043231 ! intracellular membrane-bounded organelle

[Term]
id: GO:0043231
name: intracellular membrane-bounded organelle
";

    #[test]
    fn small_document_round_into_model() {
        let onto = load(SMALL);
        assert_eq!(onto.format_version, "1.2");
        assert_eq!(onto.default_namespace.as_deref(), Some("cell_biology"));
        assert_eq!(onto.subsetdefs().len(), 1);
        assert_eq!(onto.synonym_typedefs().len(), 1);

        let nucleus = onto.stanza(onto.lookup("GO:0005634").expect("nucleus"));
        assert_eq!(nucleus.name.as_ref().expect("name").value, "nucleus");
        assert_eq!(
            nucleus.definition.as_ref().expect("def").value,
            "A membrane-bounded organelle"
        );
        assert_eq!(nucleus.definition_dbxrefs.as_deref(), Some("GO:curators"));
        assert_eq!(nucleus.namespace.as_deref(), Some("cell_biology"));
        assert_eq!(nucleus.subsets(), Some(&["goslim_plant".to_string()][..]));
        assert_eq!(nucleus.synonyms.len(), 1);
        assert_eq!(nucleus.synonyms[0].scope, Scope::Exact);

        let is_a = nucleus.references.get("is_a").expect("is_a");
        assert_eq!(is_a.len(), 1);
        assert_eq!(is_a[0].target, "GO:0043231");
        assert_eq!(is_a[0].location.line, 13);

        assert_eq!(onto.user_stanzas().count(), 2);
    }

    #[test]
    fn first_stanza_tag_must_be_id() {
        let err = load_err("[Term]\nname: nameless\n");
        assert!(matches!(err, OboError::ExpectedId { location } if location.line == 2));
    }

    #[test]
    fn bare_text_line_is_a_syntax_error() {
        let err = load_err("[Term]\nid: A:1\nno tag here\n");
        assert!(matches!(err, OboError::Syntax { .. }));
    }

    #[test]
    fn unknown_stanza_kind_is_fatal() {
        let err = load_err("[Widget]\nid: A:1\n");
        assert!(matches!(err, OboError::UnknownStanzaKind { kind, .. } if kind == "Widget"));
    }

    #[test]
    fn duplicate_def_is_fatal_but_duplicate_identical_name_is_not() {
        let err = load_err("[Term]\nid: A:1\nname: a\ndef: \"x\"\ndef: \"y\"\n");
        assert!(matches!(
            err,
            OboError::DuplicateTag { tag, previous, .. } if tag == "def" && previous.line == 4
        ));

        let onto = load("[Term]\nid: A:1\nname: a\nname: a\n");
        let a = onto.stanza(onto.lookup("A:1").expect("A:1"));
        assert_eq!(a.name.as_ref().expect("name").value, "a");
    }

    #[test]
    fn conflicting_name_is_overridden_by_the_latest() {
        let onto = load("[Term]\nid: A:1\nname: first\nname: second\n");
        let a = onto.stanza(onto.lookup("A:1").expect("A:1"));
        assert_eq!(a.name.as_ref().expect("name").value, "second");
    }

    #[test]
    fn duplicate_id_tag_in_one_block_is_fatal() {
        let err = load_err("[Term]\nid: A:1\nid: A:2\n");
        assert!(matches!(err, OboError::DuplicateTag { tag, .. } if tag == "id"));
    }

    #[test]
    fn stanzas_merge_across_documents() {
        let mut onto = Ontology::new();
        onto.load_str(
            "<one>",
            "[Term]\nid: A:1\nname: a\n",
            UnhandledTagPolicy::Fail,
            DeprecatedTagPolicy::Silent,
        )
        .expect("first document");
        onto.load_str(
            "<two>",
            "[Term]\nid: A:1\ncomment: seen again\nis_a: A:2\n\n[Term]\nid: A:2\nname: b\n",
            UnhandledTagPolicy::Fail,
            DeprecatedTagPolicy::Silent,
        )
        .expect("second document");

        assert_eq!(onto.user_stanzas().count(), 2);
        let a = onto.stanza(onto.lookup("A:1").expect("A:1"));
        assert_eq!(a.name.as_ref().expect("name").value, "a");
        assert_eq!(a.comment.as_ref().expect("comment").value, "seen again");
        assert!(a.references.contains("is_a"));
        // the id location now points at the latest declaration
        assert_eq!(a.id.location.source, "<two>");
    }

    #[test]
    fn deprecated_synonym_tags_force_their_scope() {
        let onto = load("[Term]\nid: A:1\nname: a\nnarrow_synonym: \"tight\" []\n");
        let a = onto.stanza(onto.lookup("A:1").expect("A:1"));
        assert_eq!(a.synonyms.len(), 1);
        assert_eq!(a.synonyms[0].scope, Scope::Narrow);
        assert_eq!(a.synonyms[0].text, "tight");
    }

    #[test]
    fn synonym_scope_defaults_from_its_declared_type() {
        let onto = load(
            "synonymtypedef: UK_SPELLING \"UK spelling\" EXACT\n\
             [Term]\nid: A:1\nname: colour\nsynonym: \"colour\" UK_SPELLING\n",
        );
        let a = onto.stanza(onto.lookup("A:1").expect("A:1"));
        assert_eq!(a.synonyms[0].scope, Scope::Exact);
        assert_eq!(a.synonyms[0].type_name.as_deref(), Some("UK_SPELLING"));
    }

    #[test]
    fn undeclared_synonym_type_is_fatal() {
        let err = load_err("[Term]\nid: A:1\nname: a\nsynonym: \"x\" MADE_UP\n");
        assert!(matches!(
            err,
            OboError::UndeclaredSynonymType { name, .. } if name == "MADE_UP"
        ));
    }

    #[test]
    fn xref_tags_collect_with_qualifiers() {
        let onto = load(
            "[Term]\nid: A:1\nname: a\n\
             xref: UMLS:C1 \"desc\" MATCH NAME cell body\n\
             xref_analog: DB:2\n",
        );
        let a = onto.stanza(onto.lookup("A:1").expect("A:1"));
        assert_eq!(a.xrefs.len(), 2);
        assert_eq!(a.xrefs[0].qualifier, Some(XRefMatch::MatchName));
        assert_eq!(a.xrefs[0].matched.as_deref(), Some("cell body"));
        assert_eq!(a.xrefs[1].target, "DB:2");
    }

    #[test]
    fn typedef_flags_and_endpoints() {
        let onto = load(
            "[Typedef]\nid: part_of\nname: part of\nis_transitive: true\n\
             domain: OBO:TERM\nrange: OBO:TERM\n",
        );
        let t = onto.stanza(onto.lookup("part_of").expect("part_of"));
        match &t.data {
            StanzaData::Typedef(data) => assert!(data.is_transitive),
            other => panic!("expected typedef, got {other:?}"),
        }
        assert!(t.references.contains("domain"));
        assert!(t.references.contains("range"));
    }

    #[test]
    fn undeclared_subset_is_fatal_and_duplicates_collapse() {
        let err = load_err("[Term]\nid: A:1\nname: a\nsubset: ghost_slim\n");
        assert!(matches!(
            err,
            OboError::UndeclaredSubset { name, .. } if name == "ghost_slim"
        ));

        let onto = load(
            "subsetdef: slim \"the slim\"\n\
             [Term]\nid: A:1\nname: a\nsubset: slim\nsubset: slim\n",
        );
        let a = onto.stanza(onto.lookup("A:1").expect("A:1"));
        assert_eq!(a.subsets(), Some(&["slim".to_string()][..]));
    }

    #[test]
    fn creation_date_accepts_its_timestamp_shape() {
        let onto = load(
            "[Term]\nid: A:1\nname: a\ncreated_by: curator\n\
             creation_date: 04:01:2007 12:33\n",
        );
        let a = onto.stanza(onto.lookup("A:1").expect("A:1"));
        assert_eq!(a.creation_date.as_deref(), Some("04:01:2007 12:33"));
    }

    #[test]
    fn transitive_over_collects_relation_ids() {
        let onto = load(
            "[Typedef]\nid: regulates\nname: regulates\ntransitive_over: part_of\n",
        );
        let t = onto.stanza(onto.lookup("regulates").expect("regulates"));
        match &t.data {
            StanzaData::Typedef(data) => {
                assert_eq!(data.transitive_over, vec!["part_of".to_string()])
            }
            other => panic!("expected typedef, got {other:?}"),
        }
    }

    #[test]
    fn instance_stanzas_take_property_values() {
        let onto = load(
            "[Instance]\nid: IDS:1\ninstance_of: PERSON:1\n\
             property_value: shoe_size \"8\" SIZE:1\n",
        );
        let i = onto.stanza(onto.lookup("IDS:1").expect("IDS:1"));
        assert!(i.references.contains("instance_of"));
        let pv = &i.references.get("shoe_size").expect("shoe_size")[0];
        assert_eq!(pv.literal.as_deref(), Some("8"));
        assert_eq!(pv.target, "SIZE:1");
    }

    #[test]
    fn unhandled_tags_follow_the_policy() {
        let err = load_err("[Term]\nid: A:1\nnovel_tag: hello\n");
        assert!(matches!(err, OboError::UnhandledTag { tag, .. } if tag == "novel_tag"));

        let mut onto = Ontology::new();
        onto.load_str(
            "<test>",
            "idspace: GO urn:x\n[Term]\nid: A:1\nname: a\nnovel_tag: hello\n",
            UnhandledTagPolicy::Record,
            DeprecatedTagPolicy::Silent,
        )
        .expect("recording load");
        assert_eq!(onto.unhandled_tags.len(), 1);
        assert_eq!(onto.unhandled_tags[0].0, "idspace");
        let a = onto.stanza(onto.lookup("A:1").expect("A:1"));
        assert_eq!(a.unhandled_tags.len(), 1);
        assert_eq!(a.unhandled_tags[0].1.value, "hello");
    }

    #[test]
    fn tag_splits_at_first_unescaped_colon() {
        let onto = load("[Term]\nid: A:1\nname: ratio 1:2\n");
        let a = onto.stanza(onto.lookup("A:1").expect("A:1"));
        assert_eq!(a.name.as_ref().expect("name").value, "ratio 1:2");
    }
}
