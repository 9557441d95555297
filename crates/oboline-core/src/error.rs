//! Error taxonomy for OBO loading, resolution and traversal.
//!
//! Severity classes (see the crate docs):
//! - syntax / format errors are always fatal,
//! - semantic errors are fatal except where a policy explicitly routes them,
//! - reference errors are produced here but their severity is decided by the
//!   caller-supplied [`ResolutionPolicy`](crate::policy::ResolutionPolicy).
//!
//! Every variant carries the source location it was detected at, so `Display`
//! output reads like compiler diagnostics: `file.obo:42: duplicate tag def`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A `source:line` pair attached to every parsed element.
///
/// `source` is a file path for file loads, or a caller-chosen name for
/// streams and programmatic construction (the builtin document uses
/// `<<builtin>>`, the CLI uses `<<stdin>>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub source: String,
    pub line: usize,
}

impl Location {
    pub fn new(source: impl Into<String>, line: usize) -> Self {
        Self {
            source: source.into(),
            line,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.source, self.line)
    }
}

#[derive(Debug, Error)]
pub enum OboError {
    /// A non-blank line that is neither a stanza header nor `tag: value`.
    #[error("{location}: syntax error")]
    Syntax { location: Location },

    #[error("{location}: unhandled stanza type {kind}")]
    UnknownStanzaKind { location: Location, kind: String },

    /// A tag value that does not match the expected value shape.
    #[error("{location}: invalid {tag} format")]
    InvalidFormat { location: Location, tag: String },

    /// The first tag of a stanza block was not `id`.
    #[error("{location}: expected tag id")]
    ExpectedId { location: Location },

    #[error("{location}: duplicate tag {tag}, see: {previous}")]
    DuplicateTag {
        location: Location,
        tag: String,
        previous: Location,
    },

    /// The id of one of the builtin marker stanzas was re-declared.
    #[error("{location}: this id is reserved: {id}")]
    ReservedId { location: Location, id: String },

    #[error("{location}: the same id is used for different kinds of stanzas, see: {previous}")]
    StanzaKindMismatch {
        location: Location,
        id: String,
        previous: Location,
    },

    #[error("{location}: undefined subset {name}")]
    UndeclaredSubset { location: Location, name: String },

    #[error("{location}: undefined synonym type: {name}")]
    UndeclaredSynonymType { location: Location, name: String },

    /// Produced by [`UnhandledTagPolicy::Fail`](crate::policy::UnhandledTagPolicy).
    #[error("{location}: unhandled tag {tag}")]
    UnhandledTag { location: Location, tag: String },

    #[error("{location}: missing required tag {tag}")]
    MissingRequiredTag { location: Location, tag: String },

    /// A relation label resolved to a stanza that is not a Typedef.
    ///
    /// `referenced_at` lists the locations of the offending references,
    /// one per line.
    #[error("this is not a relation type: {rel}\n    {referenced_at}")]
    NotARelationType { rel: String, referenced_at: String },

    #[error("{location}: reference to unknown {target}")]
    DanglingReference { location: Location, target: String },

    #[error("{location}: reference to obsolete {target}")]
    ObsoleteReference { location: Location, target: String },

    /// Path enumeration found a node inside its own ancestor chain.
    #[error("reference cycle: {chain}")]
    ReferenceCycle { chain: String },

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
