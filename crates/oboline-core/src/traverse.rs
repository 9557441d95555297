//! Graph traversal over resolved references.
//!
//! All traversal reads `resolved_target` handles, so
//! [`Ontology::resolve_references`](crate::model::Ontology) must have run
//! first; unresolved references are simply skipped. Handles make upward
//! steps O(1); downward steps scan the registry, which is fine for the
//! interactive and batch uses this crate targets.

use crate::error::OboError;
use crate::model::{Ontology, StanzaId};

impl Ontology {
    /// Direct targets of this stanza's `rel` references, in declaration
    /// order.
    pub fn parents(&self, id: StanzaId, rel: &str) -> Vec<StanzaId> {
        self.stanza(id)
            .references
            .get(rel)
            .map(|refs| refs.iter().filter_map(|r| r.resolved_target).collect())
            .unwrap_or_default()
    }

    /// Stanzas holding a `rel` reference to this one, in registry order.
    pub fn children(&self, id: StanzaId, rel: &str) -> Vec<StanzaId> {
        self.user_stanzas()
            .filter(|(_, s)| {
                s.references
                    .get(rel)
                    .is_some_and(|refs| refs.iter().any(|r| r.resolved_target == Some(id)))
            })
            .map(|(sid, _)| sid)
            .collect()
    }

    /// Every path along `rel` references, root first, ending at `start`
    /// (included when `include_self` is set). A stanza with no `rel`
    /// parents yields a single path.
    ///
    /// A stanza that reappears inside its own ancestor chain is an error;
    /// the chain in the error names the ids along the loop.
    pub fn paths(
        &self,
        start: StanzaId,
        rel: &str,
        include_self: bool,
    ) -> Result<Vec<Vec<StanzaId>>, OboError> {
        let mut out = Vec::new();
        let mut chain = vec![start];
        self.walk_paths(rel, &mut chain, &mut out)?;
        for path in &mut out {
            if !include_self {
                path.remove(0);
            }
            path.reverse();
        }
        Ok(out)
    }

    /// Stanzas reachable upward from `start` along `rel`, depth-first in
    /// declaration order, nearest first within each branch. Each ancestor
    /// appears once per distinct route from `start` to it, so the result
    /// is a multiset.
    pub fn ancestors(
        &self,
        start: StanzaId,
        rel: &str,
        include_self: bool,
    ) -> Result<Vec<StanzaId>, OboError> {
        let mut out = Vec::new();
        if include_self {
            out.push(start);
        }
        let mut chain = vec![start];
        self.walk_ancestors(rel, &mut chain, &mut out)?;
        Ok(out)
    }

    /// Parent-first recursion: each parent is emitted once, then its own
    /// ancestors, before the next sibling.
    fn walk_ancestors(
        &self,
        rel: &str,
        chain: &mut Vec<StanzaId>,
        out: &mut Vec<StanzaId>,
    ) -> Result<(), OboError> {
        let node = chain[chain.len() - 1];
        for parent in self.parents(node, rel) {
            if chain.contains(&parent) {
                return Err(self.cycle_error(chain, parent));
            }
            out.push(parent);
            chain.push(parent);
            self.walk_ancestors(rel, chain, out)?;
            chain.pop();
        }
        Ok(())
    }

    /// Node-first chains, shared by [`paths`](Self::paths) and
    /// [`ancestors`](Self::ancestors).
    fn walk_paths(
        &self,
        rel: &str,
        chain: &mut Vec<StanzaId>,
        out: &mut Vec<Vec<StanzaId>>,
    ) -> Result<(), OboError> {
        let node = chain[chain.len() - 1];
        let parents = self.parents(node, rel);
        if parents.is_empty() {
            out.push(chain.clone());
            return Ok(());
        }
        for parent in parents {
            if chain.contains(&parent) {
                return Err(self.cycle_error(chain, parent));
            }
            chain.push(parent);
            self.walk_paths(rel, chain, out)?;
            chain.pop();
        }
        Ok(())
    }

    fn cycle_error(&self, chain: &[StanzaId], repeated: StanzaId) -> OboError {
        let chain_ids = chain
            .iter()
            .chain(std::iter::once(&repeated))
            .map(|sid| self.stanza(*sid).id.value.as_str())
            .collect::<Vec<_>>()
            .join(" -> ");
        OboError::ReferenceCycle { chain: chain_ids }
    }
}
