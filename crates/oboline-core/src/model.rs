//! In-memory ontology model.
//!
//! Stanzas live in an arena owned by the [`Ontology`] and are addressed by
//! copyable [`StanzaId`] handles; an id-string index sits next to the arena.
//! References between stanzas stay textual until
//! [`Ontology::resolve_references`] attaches handles, so the object graph
//! never needs back-pointers or interior mutability.
//!
//! Every ontology starts with the eight builtin relation typedefs (parsed
//! from an embedded OBO document with source `<<builtin>>`) and four marker
//! stanzas (`OBO:TERM`, `OBO:TYPE`, `OBO:INSTANCE`, `OBO:TERM_OR_TYPE`)
//! which serve as domain/range sentinels. Builtins are excluded from
//! user-facing iteration and from serialization; the marker ids are
//! reserved.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::{Location, OboError};
use crate::value::{Scope, SourcedValue, XRefMatch};

/// Source name of the embedded builtin document.
pub const BUILTIN_SOURCE: &str = "<<builtin>>";

/// The always-available hierarchy relation.
pub const IS_A: &str = "is_a";

/// Marker stanza ids, reserved in every ontology.
const MARKER_IDS: [&str; 4] = ["OBO:TYPE", "OBO:INSTANCE", "OBO:TERM", "OBO:TERM_OR_TYPE"];

const BUILTIN_DOC: &str = r#"[Typedef]
id: is_a
name: is_a
range: OBO:TERM_OR_TYPE
domain: OBO:TERM_OR_TYPE
def: "The basic subclassing relationship" [OBO:defs]

[Typedef]
id: disjoint_from
name: disjoint_from
range: OBO:TERM
domain: OBO:TERM
def: "Indicates that two classes are disjoint" [OBO:defs]

[Typedef]
id: instance_of
name: instance_of
range: OBO:TERM
domain: OBO:INSTANCE
def: "Indicates the type of an instance" [OBO:defs]

[Typedef]
id: inverse_of
name: inverse_of
range: OBO:TYPE
domain: OBO:TYPE
def: "Indicates that one relationship type is the inverse of another" [OBO:defs]

[Typedef]
id: union_of
name: union_of
range: OBO:TERM
domain: OBO:TERM
def: "Indicates that a term is the union of several others" [OBO:defs]

[Typedef]
id: intersection_of
name: intersection_of
range: OBO:TERM
domain: OBO:TERM
def: "Indicates that a term is the intersection of several others" [OBO:defs]

[Typedef]
id: range
name: range
range: OBO:TERM_OR_TYPE
domain: OBO:TYPE
def: "Indicates the range (type of target) of a relation"

[Typedef]
id: domain
name: domain
range: OBO:TERM_OR_TYPE
domain: OBO:TYPE
def: "Indicates the domain (type of source) of a relation"
"#;

/// Stable handle into the ontology's stanza arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct StanzaId(pub(crate) usize);

/// Header `subsetdef` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubsetDef {
    pub name: String,
    pub description: String,
    pub location: Location,
}

/// Header `synonymtypedef` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynonymTypeDef {
    pub name: String,
    pub description: String,
    pub scope: Scope,
    pub location: Location,
}

/// An alternate label owned by one stanza.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Synonym {
    pub text: String,
    pub scope: Scope,
    pub type_name: Option<String>,
    pub dbxrefs: Option<String>,
    pub location: Location,
    /// Index into [`Ontology::synonym_typedefs`], set by resolution.
    pub resolved_type: Option<usize>,
}

/// A cross-reference to an external identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XRef {
    pub target: String,
    pub description: Option<String>,
    pub qualifier: Option<XRefMatch>,
    pub matched: Option<String>,
    pub location: Location,
}

/// A directed, labeled edge from its owning stanza to a target id.
///
/// Textual until resolution; afterwards `resolved_target` holds the target
/// stanza handle and `resolved_rel` the relation's Typedef handle (either
/// may stay `None` under a non-fail policy).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StanzaReference {
    pub rel: String,
    pub target: String,
    /// Quoted literal payload of an Instance `property_value` tag.
    pub literal: Option<String>,
    pub location: Location,
    pub resolved_target: Option<StanzaId>,
    pub resolved_rel: Option<StanzaId>,
}

impl StanzaReference {
    pub fn new(location: Location, rel: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            target: target.into(),
            literal: None,
            location,
            resolved_target: None,
            resolved_rel: None,
        }
    }
}

/// Relation label → ordered references. Labels are unique and keep first
/// insertion order; references keep declaration order per label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefMap {
    entries: Vec<(String, Vec<StanzaReference>)>,
}

impl RefMap {
    pub fn push(&mut self, reference: StanzaReference) {
        match self.entries.iter_mut().find(|(rel, _)| *rel == reference.rel) {
            Some((_, refs)) => refs.push(reference),
            None => self
                .entries
                .push((reference.rel.clone(), vec![reference])),
        }
    }

    pub fn get(&self, rel: &str) -> Option<&[StanzaReference]> {
        self.entries
            .iter()
            .find(|(r, _)| r == rel)
            .map(|(_, refs)| refs.as_slice())
    }

    pub fn contains(&self, rel: &str) -> bool {
        self.entries.iter().any(|(r, _)| r == rel)
    }

    pub fn relations(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(rel, _)| rel.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[StanzaReference])> {
        self.entries
            .iter()
            .map(|(rel, refs)| (rel.as_str(), refs.as_slice()))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Vec<StanzaReference>)> {
        self.entries
            .iter_mut()
            .map(|(rel, refs)| (rel.as_str(), refs))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Concrete stanza kind, as named by the `[...]` stanza header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StanzaKind {
    Term,
    Typedef,
    Instance,
}

impl StanzaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StanzaKind::Term => "Term",
            StanzaKind::Typedef => "Typedef",
            StanzaKind::Instance => "Instance",
        }
    }
}

impl std::fmt::Display for StanzaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Term-only state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TermData {
    pub subsets: Vec<String>,
    pub intersection_of: RefMap,
    /// Indices into [`Ontology::subsetdefs`], set by resolution.
    pub resolved_subsets: Vec<usize>,
}

/// Typedef-only state: subset membership plus the algebraic relation
/// property flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypedefData {
    pub subsets: Vec<String>,
    pub resolved_subsets: Vec<usize>,
    /// Ids of relations this one is transitive over; kept textual like
    /// `replaced_by` and `consider`.
    pub transitive_over: Vec<String>,
    pub is_cyclic: bool,
    pub is_reflexive: bool,
    pub is_symmetric: bool,
    pub is_anti_symmetric: bool,
    pub is_transitive: bool,
    pub is_metadata_tag: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StanzaData {
    Term(TermData),
    Typedef(TypedefData),
    Instance,
    /// Ontology-internal domain/range sentinel; never user-facing.
    BuiltinMarker,
}

/// One `[Term]`, `[Typedef]` or `[Instance]` block (or a builtin).
///
/// Created on the first `id:` tag of a block, then mutated tag by tag in
/// document order, possibly across several input files.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stanza {
    pub id: SourcedValue<String>,
    pub name: Option<SourcedValue<String>>,
    pub is_anonymous: bool,
    pub alt_ids: Vec<String>,
    pub comment: Option<SourcedValue<String>>,
    pub definition: Option<SourcedValue<String>>,
    pub definition_dbxrefs: Option<String>,
    pub synonyms: Vec<Synonym>,
    pub xrefs: Vec<XRef>,
    pub references: RefMap,
    pub is_obsolete: bool,
    pub replaced_by: Vec<String>,
    pub consider: Vec<String>,
    pub created_by: Option<String>,
    pub creation_date: Option<String>,
    pub namespace: Option<String>,
    pub unhandled_tags: Vec<(String, SourcedValue<String>)>,
    pub builtin: bool,
    pub data: StanzaData,
}

impl Stanza {
    pub fn new(kind: StanzaKind, id: SourcedValue<String>, namespace: Option<String>) -> Self {
        let data = match kind {
            StanzaKind::Term => StanzaData::Term(TermData::default()),
            StanzaKind::Typedef => StanzaData::Typedef(TypedefData::default()),
            StanzaKind::Instance => StanzaData::Instance,
        };
        Self {
            id,
            name: None,
            is_anonymous: false,
            alt_ids: Vec::new(),
            comment: None,
            definition: None,
            definition_dbxrefs: None,
            synonyms: Vec::new(),
            xrefs: Vec::new(),
            references: RefMap::default(),
            is_obsolete: false,
            replaced_by: Vec::new(),
            consider: Vec::new(),
            created_by: None,
            creation_date: None,
            namespace,
            unhandled_tags: Vec::new(),
            builtin: false,
            data,
        }
    }

    fn marker(id: &str) -> Self {
        let mut stanza = Stanza::new(
            StanzaKind::Term,
            SourcedValue::new(Location::new(BUILTIN_SOURCE, 0), id.to_string()),
            None,
        );
        stanza.data = StanzaData::BuiltinMarker;
        stanza.builtin = true;
        stanza
    }

    /// Add a reference edge programmatically. Equivalent to a
    /// `relationship:` (or builtin-relation) tag line.
    pub fn add_reference(&mut self, reference: StanzaReference) {
        self.references.push(reference);
    }

    pub fn add_synonym(&mut self, synonym: Synonym) {
        self.synonyms.push(synonym);
    }

    pub fn add_xref(&mut self, xref: XRef) {
        self.xrefs.push(xref);
    }

    /// `None` for builtin marker stanzas.
    pub fn kind(&self) -> Option<StanzaKind> {
        match self.data {
            StanzaData::Term(_) => Some(StanzaKind::Term),
            StanzaData::Typedef(_) => Some(StanzaKind::Typedef),
            StanzaData::Instance => Some(StanzaKind::Instance),
            StanzaData::BuiltinMarker => None,
        }
    }

    pub fn is_term(&self) -> bool {
        matches!(self.data, StanzaData::Term(_))
    }

    pub fn is_typedef(&self) -> bool {
        matches!(self.data, StanzaData::Typedef(_))
    }

    /// Subset memberships (Term and Typedef only).
    pub fn subsets(&self) -> Option<&[String]> {
        match &self.data {
            StanzaData::Term(t) => Some(&t.subsets),
            StanzaData::Typedef(t) => Some(&t.subsets),
            _ => None,
        }
    }

    pub fn intersection_of(&self) -> Option<&RefMap> {
        match &self.data {
            StanzaData::Term(t) => Some(&t.intersection_of),
            _ => None,
        }
    }
}

/// One loaded ontology: stanza registry, header metadata and declaration
/// tables. The unit of isolation — there is no global state.
#[derive(Debug, Serialize)]
pub struct Ontology {
    stanzas: Vec<Stanza>,
    index: HashMap<String, StanzaId>,

    pub format_version: String,
    pub data_version: Option<String>,
    pub date: Option<String>,
    pub saved_by: Option<String>,
    pub auto_generated_by: Option<String>,
    pub default_namespace: Option<String>,
    pub remarks: Vec<String>,

    pub(crate) subsetdefs: Vec<SubsetDef>,
    pub(crate) synonym_typedefs: Vec<SynonymTypeDef>,

    builtin_relations: HashSet<String>,
    reserved_ids: HashSet<String>,

    /// Header tags recorded by [`UnhandledTagPolicy::Record`](crate::policy::UnhandledTagPolicy).
    pub unhandled_tags: Vec<(String, SourcedValue<String>)>,
}

impl Ontology {
    /// An empty ontology, pre-populated with the builtin relation typedefs
    /// and marker stanzas.
    pub fn new() -> Self {
        use crate::policy::{DeprecatedTagPolicy, UnhandledTagPolicy};

        let mut onto = Ontology {
            stanzas: Vec::new(),
            index: HashMap::new(),
            format_version: "1.2".to_string(),
            data_version: None,
            date: None,
            saved_by: None,
            auto_generated_by: None,
            default_namespace: None,
            remarks: Vec::new(),
            subsetdefs: Vec::new(),
            synonym_typedefs: Vec::new(),
            builtin_relations: HashSet::new(),
            reserved_ids: HashSet::new(),
            unhandled_tags: Vec::new(),
        };
        onto.load_str(
            BUILTIN_SOURCE,
            BUILTIN_DOC,
            UnhandledTagPolicy::Fail,
            DeprecatedTagPolicy::Warn,
        )
        .expect("builtin relation typedefs must parse");
        for stanza in &mut onto.stanzas {
            stanza.builtin = true;
        }
        onto.builtin_relations = onto.stanzas.iter().map(|s| s.id.value.clone()).collect();
        for id in MARKER_IDS {
            let handle = StanzaId(onto.stanzas.len());
            onto.stanzas.push(Stanza::marker(id));
            onto.index.insert(id.to_string(), handle);
            onto.reserved_ids.insert(id.to_string());
        }
        onto
    }

    // ------------------------------------------------------------------
    // Registry access
    // ------------------------------------------------------------------

    pub fn lookup(&self, id: &str) -> Option<StanzaId> {
        self.index.get(id).copied()
    }

    pub fn stanza(&self, id: StanzaId) -> &Stanza {
        &self.stanzas[id.0]
    }

    pub fn stanza_mut(&mut self, id: StanzaId) -> &mut Stanza {
        &mut self.stanzas[id.0]
    }

    pub(crate) fn stanza_count(&self) -> usize {
        self.stanzas.len()
    }

    /// All non-builtin stanzas, in first-`id`-seen order.
    pub fn user_stanzas(&self) -> impl Iterator<Item = (StanzaId, &Stanza)> {
        self.stanzas
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.builtin)
            .map(|(i, s)| (StanzaId(i), s))
    }

    /// All non-builtin Terms, in registry order.
    pub fn terms(&self) -> impl Iterator<Item = (StanzaId, &Stanza)> {
        self.user_stanzas().filter(|(_, s)| s.is_term())
    }

    /// Whether `rel` is one of the eight builtin relation typedef ids.
    pub fn is_builtin_relation(&self, rel: &str) -> bool {
        self.builtin_relations.contains(rel)
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create a stanza of `kind` under the given id, or re-attach to an
    /// existing stanza of the same kind (later declarations extend earlier
    /// ones). Re-declaring a marker id or re-using an id across kinds is
    /// an error.
    pub fn create_stanza(
        &mut self,
        kind: StanzaKind,
        id: SourcedValue<String>,
    ) -> Result<StanzaId, OboError> {
        if self.reserved_ids.contains(&id.value) {
            return Err(OboError::ReservedId {
                location: id.location,
                id: id.value,
            });
        }
        if let Some(handle) = self.lookup(&id.value) {
            let existing = &mut self.stanzas[handle.0];
            if existing.kind() != Some(kind) {
                return Err(OboError::StanzaKindMismatch {
                    location: id.location,
                    id: id.value,
                    previous: existing.id.location.clone(),
                });
            }
            existing.id = id;
            return Ok(handle);
        }
        let handle = StanzaId(self.stanzas.len());
        self.index.insert(id.value.clone(), handle);
        self.stanzas
            .push(Stanza::new(kind, id, self.default_namespace.clone()));
        Ok(handle)
    }

    /// Declare a header subset; a duplicate declaration warns and keeps
    /// the first.
    pub fn declare_subsetdef(&mut self, def: SubsetDef) {
        if let Some((_, existing)) = self.subsetdef(&def.name) {
            tracing::warn!(
                "{}: duplicate tag subsetdef, see: {}",
                def.location,
                existing.location
            );
            return;
        }
        self.subsetdefs.push(def);
    }

    pub fn subsetdef(&self, name: &str) -> Option<(usize, &SubsetDef)> {
        self.subsetdefs
            .iter()
            .enumerate()
            .find(|(_, d)| d.name == name)
    }

    pub fn subsetdefs(&self) -> &[SubsetDef] {
        &self.subsetdefs
    }

    /// Declare a header synonym type; a duplicate declaration warns and
    /// keeps the first.
    pub fn declare_synonym_typedef(&mut self, def: SynonymTypeDef) {
        if let Some((_, existing)) = self.synonym_typedef(&def.name) {
            tracing::warn!(
                "{}: duplicate tag synonymtypedef, see: {}",
                def.location,
                existing.location
            );
            return;
        }
        self.synonym_typedefs.push(def);
    }

    pub fn synonym_typedef(&self, name: &str) -> Option<(usize, &SynonymTypeDef)> {
        self.synonym_typedefs
            .iter()
            .enumerate()
            .find(|(_, d)| d.name == name)
    }

    pub fn synonym_typedefs(&self) -> &[SynonymTypeDef] {
        &self.synonym_typedefs
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Check every stanza carries its kind's mandatory tags: Term and
    /// Typedef require `name`, Instance requires `instance_of`. Returns
    /// the first violation.
    pub fn check_required(&self) -> Result<(), OboError> {
        for stanza in &self.stanzas {
            match stanza.data {
                StanzaData::Term(_) | StanzaData::Typedef(_) => {
                    if stanza.name.is_none() {
                        return Err(OboError::MissingRequiredTag {
                            location: stanza.id.location.clone(),
                            tag: "name".to_string(),
                        });
                    }
                }
                StanzaData::Instance => {
                    if !stanza.references.contains("instance_of") {
                        return Err(OboError::MissingRequiredTag {
                            location: stanza.id.location.clone(),
                            tag: "instance_of".to_string(),
                        });
                    }
                }
                StanzaData::BuiltinMarker => {}
            }
        }
        Ok(())
    }
}

impl Default for Ontology {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ontology_carries_builtins_but_hides_them() {
        let onto = Ontology::new();
        assert!(onto.lookup("is_a").is_some());
        assert!(onto.lookup("OBO:TERM_OR_TYPE").is_some());
        assert!(onto.is_builtin_relation("is_a"));
        assert!(onto.is_builtin_relation("inverse_of"));
        assert!(!onto.is_builtin_relation("part_of"));
        assert_eq!(onto.user_stanzas().count(), 0);
    }

    #[test]
    fn builtin_relation_ids_can_be_extended_but_markers_cannot() {
        let mut onto = Ontology::new();
        let loc = Location::new("<test>", 1);
        let existing = onto
            .create_stanza(
                StanzaKind::Typedef,
                SourcedValue::new(loc.clone(), "is_a".to_string()),
            )
            .expect("merge into builtin typedef");
        assert!(onto.stanza(existing).builtin);

        let err = onto
            .create_stanza(
                StanzaKind::Term,
                SourcedValue::new(loc, "OBO:TERM".to_string()),
            )
            .unwrap_err();
        assert!(matches!(err, OboError::ReservedId { .. }));
    }

    #[test]
    fn cross_kind_id_reuse_is_rejected() {
        let mut onto = Ontology::new();
        let loc = Location::new("<test>", 1);
        onto.create_stanza(
            StanzaKind::Term,
            SourcedValue::new(loc.clone(), "X:1".to_string()),
        )
        .expect("create term");
        let err = onto
            .create_stanza(
                StanzaKind::Typedef,
                SourcedValue::new(Location::new("<test>", 9), "X:1".to_string()),
            )
            .unwrap_err();
        assert!(matches!(err, OboError::StanzaKindMismatch { .. }));
    }

    #[test]
    fn refmap_keeps_label_and_declaration_order() {
        let mut map = RefMap::default();
        let loc = Location::new("<test>", 1);
        map.push(StanzaReference::new(loc.clone(), "part_of", "B:1"));
        map.push(StanzaReference::new(loc.clone(), "is_a", "A:1"));
        map.push(StanzaReference::new(loc, "part_of", "B:2"));

        let labels: Vec<&str> = map.relations().collect();
        assert_eq!(labels, vec!["part_of", "is_a"]);
        let targets: Vec<&str> = map
            .get("part_of")
            .expect("part_of")
            .iter()
            .map(|r| r.target.as_str())
            .collect();
        assert_eq!(targets, vec!["B:1", "B:2"]);
    }

    #[test]
    fn check_required_flags_nameless_terms() {
        let mut onto = Ontology::new();
        onto.create_stanza(
            StanzaKind::Term,
            SourcedValue::new(Location::new("<test>", 3), "X:1".to_string()),
        )
        .expect("create term");
        let err = onto.check_required().unwrap_err();
        assert!(matches!(err, OboError::MissingRequiredTag { tag, .. } if tag == "name"));
    }
}
