//! OBO flat-file ontology model, parser and serializer.
//!
//! The OBO exchange format is line oriented: a header of `tag: value` lines
//! followed by `[Term]`, `[Typedef]` and `[Instance]` stanzas. This crate
//! loads one or more OBO documents into an [`Ontology`](model::Ontology),
//! resolves textual cross-references into stanza handles, offers upward and
//! downward graph traversal with cycle detection, and serializes back to
//! canonical OBO text.
//!
//! Loading is two-phase by design: [`Ontology::load_str`](model::Ontology)
//! and friends only record references textually, then
//! [`Ontology::resolve_references`](model::Ontology) attaches handles once
//! every document is in. Recoverable conditions (unknown tags, deprecated
//! tags, dangling or obsolete references) are graded by caller-supplied
//! [`policy`] values rather than hard-coded severities.

pub mod error;
pub mod model;
pub mod policy;
pub mod reader;
pub mod resolve;
pub mod traverse;
pub mod value;
pub mod write;

pub use error::{Location, OboError};
pub use model::{
    Ontology, RefMap, Stanza, StanzaData, StanzaId, StanzaKind, StanzaReference, SubsetDef,
    Synonym, SynonymTypeDef, TermData, TypedefData, XRef,
};
pub use policy::{DeprecatedTagPolicy, ResolutionPolicy, UnhandledTagPolicy};
pub use value::{Scope, SourcedValue, XRefMatch};
