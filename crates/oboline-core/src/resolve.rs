//! Reference resolution.
//!
//! Loading leaves every cross-stanza reference textual; this pass attaches
//! [`StanzaId`] handles so traversal never re-hits the index. It runs after
//! all files are loaded and is idempotent: every handle is recomputed from
//! the current registry, so loading more files and resolving again is fine.
//!
//! A relation label that names a non-Typedef stanza is always fatal. A
//! label or target the registry does not know follows the dangling-reference
//! policy; a target that exists but is obsolete follows the
//! obsolete-reference policy, except when the referring stanza is itself
//! obsolete (obsolete subgraphs may point at each other).

use crate::error::{Location, OboError};
use crate::model::{Ontology, StanzaData, StanzaId};
use crate::policy::ResolutionPolicy;

/// Planned handle assignments for one stanza, shaped like its reference
/// tables so apply can zip over them.
#[derive(Default)]
struct StanzaPlan {
    references: Vec<Vec<(Option<StanzaId>, Option<StanzaId>)>>,
    intersection_of: Vec<Vec<(Option<StanzaId>, Option<StanzaId>)>>,
    synonym_types: Vec<Option<usize>>,
    subsets: Vec<usize>,
}

impl Ontology {
    /// Attach stanza handles to every reference, synonym type and subset
    /// membership.
    pub fn resolve_references(
        &mut self,
        dangling: ResolutionPolicy,
        obsolete: ResolutionPolicy,
    ) -> Result<(), OboError> {
        self.check_relation_types()?;
        for idx in 0..self.stanza_count() {
            let sid = StanzaId(idx);
            let plan = self.plan_stanza(sid, dangling, obsolete)?;
            self.apply_plan(sid, plan);
        }
        Ok(())
    }

    /// Every relation label in use must either be unknown (left to the
    /// dangling policy) or name a Typedef.
    fn check_relation_types(&self) -> Result<(), OboError> {
        let mut uses: Vec<(&str, Vec<&Location>)> = Vec::new();
        for idx in 0..self.stanza_count() {
            let stanza = self.stanza(StanzaId(idx));
            let tables = std::iter::once(&stanza.references)
                .chain(stanza.intersection_of().into_iter());
            for table in tables {
                for (rel, refs) in table.iter() {
                    let locations: Vec<&Location> = refs.iter().map(|r| &r.location).collect();
                    match uses.iter_mut().find(|(r, _)| *r == rel) {
                        Some((_, locs)) => locs.extend(locations),
                        None => uses.push((rel, locations)),
                    }
                }
            }
        }
        for (rel, locations) in uses {
            if let Some(handle) = self.lookup(rel) {
                if !self.stanza(handle).is_typedef() {
                    let referenced_at = locations
                        .iter()
                        .map(|l| l.to_string())
                        .collect::<Vec<_>>()
                        .join("\n    ");
                    return Err(OboError::NotARelationType {
                        rel: rel.to_string(),
                        referenced_at,
                    });
                }
            }
        }
        Ok(())
    }

    fn plan_stanza(
        &self,
        sid: StanzaId,
        dangling: ResolutionPolicy,
        obsolete: ResolutionPolicy,
    ) -> Result<StanzaPlan, OboError> {
        let stanza = self.stanza(sid);
        let owner_obsolete = stanza.is_obsolete;
        let mut plan = StanzaPlan::default();

        for (_, refs) in stanza.references.iter() {
            plan.references
                .push(self.plan_refs(refs, owner_obsolete, dangling, obsolete)?);
        }
        if let Some(table) = stanza.intersection_of() {
            for (_, refs) in table.iter() {
                plan.intersection_of
                    .push(self.plan_refs(refs, owner_obsolete, dangling, obsolete)?);
            }
        }

        for synonym in &stanza.synonyms {
            let resolved = match synonym.type_name.as_deref() {
                Some(name) => match self.synonym_typedef(name) {
                    Some((idx, _)) => Some(idx),
                    None => {
                        dangling.apply(OboError::UndeclaredSynonymType {
                            location: synonym.location.clone(),
                            name: name.to_string(),
                        })?;
                        None
                    }
                },
                None => None,
            };
            plan.synonym_types.push(resolved);
        }

        if let Some(subsets) = stanza.subsets() {
            for name in subsets {
                match self.subsetdef(name) {
                    Some((idx, _)) => plan.subsets.push(idx),
                    None => dangling.apply(OboError::UndeclaredSubset {
                        location: stanza.id.location.clone(),
                        name: name.clone(),
                    })?,
                }
            }
        }

        Ok(plan)
    }

    fn plan_refs(
        &self,
        refs: &[crate::model::StanzaReference],
        owner_obsolete: bool,
        dangling: ResolutionPolicy,
        obsolete: ResolutionPolicy,
    ) -> Result<Vec<(Option<StanzaId>, Option<StanzaId>)>, OboError> {
        let mut out = Vec::with_capacity(refs.len());
        for r in refs {
            let rel_handle = match self.lookup(&r.rel) {
                Some(handle) => Some(handle),
                None => {
                    dangling.apply(OboError::DanglingReference {
                        location: r.location.clone(),
                        target: r.rel.clone(),
                    })?;
                    None
                }
            };
            let target_handle = match self.lookup(&r.target) {
                Some(handle) => {
                    if self.stanza(handle).is_obsolete && !owner_obsolete {
                        obsolete.apply(OboError::ObsoleteReference {
                            location: r.location.clone(),
                            target: r.target.clone(),
                        })?;
                    }
                    Some(handle)
                }
                None => {
                    dangling.apply(OboError::DanglingReference {
                        location: r.location.clone(),
                        target: r.target.clone(),
                    })?;
                    None
                }
            };
            out.push((rel_handle, target_handle));
        }
        Ok(out)
    }

    fn apply_plan(&mut self, sid: StanzaId, plan: StanzaPlan) {
        let stanza = self.stanza_mut(sid);

        for ((_, refs), planned) in stanza.references.iter_mut().zip(plan.references) {
            for (r, (rel_handle, target_handle)) in refs.iter_mut().zip(planned) {
                r.resolved_rel = rel_handle;
                r.resolved_target = target_handle;
            }
        }
        if let StanzaData::Term(term) = &mut stanza.data {
            for ((_, refs), planned) in term.intersection_of.iter_mut().zip(plan.intersection_of) {
                for (r, (rel_handle, target_handle)) in refs.iter_mut().zip(planned) {
                    r.resolved_rel = rel_handle;
                    r.resolved_target = target_handle;
                }
            }
        }

        for (synonym, resolved) in stanza.synonyms.iter_mut().zip(plan.synonym_types) {
            synonym.resolved_type = resolved;
        }

        match &mut stanza.data {
            StanzaData::Term(t) => t.resolved_subsets = plan.subsets,
            StanzaData::Typedef(t) => t.resolved_subsets = plan.subsets,
            _ => {}
        }
    }
}
