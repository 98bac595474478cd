//! Version history of a signed record.
//!
//! Correcting a signed record never mutates it. The server creates a new
//! version linked through `replaces`/`replaced_by` and supersedes the old one.
//! A chain is that linked history, ordered oldest first.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::{
    domain::{ChildId, ChildStatus},
    protocol::ChildRecord,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("replacement chain has {count} signed versions")]
    MultipleSigned { count: usize },
    #[error("version {child_id} was replaced but is {status}, not SUPERSEDED")]
    ReplacedButNotSuperseded {
        child_id: ChildId,
        status: ChildStatus,
    },
    #[error("version {child_id} is not linked to its predecessor {expected}")]
    BrokenLink { child_id: ChildId, expected: ChildId },
    #[error("replacement chain does not have a single root")]
    NoSingleRoot,
    #[error("version {0} appears more than once in the replacement chain")]
    DuplicateVersion(ChildId),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplacementChain {
    versions: Vec<ChildRecord>,
}

impl ReplacementChain {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Orders versions by following `replaces` links from the root.
    ///
    /// The root is the only version whose predecessor is absent from the set.
    /// Versions that cannot be reached from the root are reported as a
    /// broken chain rather than silently dropped.
    pub fn from_versions(versions: Vec<ChildRecord>) -> Result<Self, ChainError> {
        if versions.is_empty() {
            return Ok(Self::empty());
        }

        let mut seen = HashSet::new();
        for version in &versions {
            if !seen.insert(version.child_id) {
                return Err(ChainError::DuplicateVersion(version.child_id));
            }
        }

        let mut successors: HashMap<ChildId, ChildId> = HashMap::new();
        let mut roots = Vec::new();
        for version in &versions {
            match version.replaces {
                Some(previous) if seen.contains(&previous) => {
                    if successors.insert(previous, version.child_id).is_some() {
                        return Err(ChainError::NoSingleRoot);
                    }
                }
                _ => roots.push(version.child_id),
            }
        }
        let [root] = roots.as_slice() else {
            return Err(ChainError::NoSingleRoot);
        };

        let mut by_id: HashMap<ChildId, ChildRecord> = versions
            .into_iter()
            .map(|version| (version.child_id, version))
            .collect();
        let mut ordered = Vec::with_capacity(by_id.len());
        let mut cursor = Some(*root);
        while let Some(child_id) = cursor {
            let Some(version) = by_id.remove(&child_id) else {
                break;
            };
            cursor = successors.get(&child_id).copied();
            ordered.push(version);
        }

        if let Some(orphan) = by_id.into_values().next() {
            return Err(ChainError::BrokenLink {
                child_id: orphan.child_id,
                expected: orphan.replaces.unwrap_or(orphan.child_id),
            });
        }

        let chain = Self { versions: ordered };
        chain.verify()?;
        Ok(chain)
    }

    /// Checks the single-active-version rule and the link structure.
    pub fn verify(&self) -> Result<(), ChainError> {
        let signed = self
            .versions
            .iter()
            .filter(|version| version.status == ChildStatus::Signed)
            .count();
        if signed > 1 {
            return Err(ChainError::MultipleSigned { count: signed });
        }

        for pair in self.versions.windows(2) {
            let (older, newer) = (&pair[0], &pair[1]);
            if older.status != ChildStatus::Superseded {
                return Err(ChainError::ReplacedButNotSuperseded {
                    child_id: older.child_id,
                    status: older.status,
                });
            }
            if newer.replaces != Some(older.child_id) {
                return Err(ChainError::BrokenLink {
                    child_id: newer.child_id,
                    expected: older.child_id,
                });
            }
            if older.replaced_by.is_some_and(|next| next != newer.child_id) {
                return Err(ChainError::BrokenLink {
                    child_id: older.child_id,
                    expected: newer.child_id,
                });
            }
        }

        Ok(())
    }

    pub fn versions(&self) -> &[ChildRecord] {
        &self.versions
    }

    /// Number of replacements, one less than the number of versions. A
    /// record that was never replaced has a chain of length zero whether the
    /// server sent no history or just the original version.
    pub fn len(&self) -> usize {
        self.versions.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn head(&self) -> Option<&ChildRecord> {
        self.versions.last()
    }

    /// The currently signed version, if the newest one is signed.
    pub fn active(&self) -> Option<&ChildRecord> {
        self.head()
            .filter(|version| version.status == ChildStatus::Signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::EncounterId,
        protocol::{ChildBody, ClinicalNotePayload, NoteType},
    };

    fn version(
        id: i64,
        status: ChildStatus,
        replaces: Option<i64>,
        replaced_by: Option<i64>,
    ) -> ChildRecord {
        ChildRecord {
            child_id: ChildId(id),
            encounter_id: EncounterId::parse("12345").expect("id"),
            status,
            replaces: replaces.map(ChildId),
            replaced_by: replaced_by.map(ChildId),
            replacement_reason: replaces.map(|_| "corrected".to_string()),
            signed_by: None,
            signed_at: None,
            created_at: "2024-01-01T00:00:00Z".parse().expect("timestamp"),
            body: ChildBody::ClinicalNote(ClinicalNotePayload {
                note_type: NoteType::Progress,
                title: None,
                content: format!("version {id}"),
            }),
        }
    }

    #[test]
    fn empty_history_is_a_valid_chain() {
        let chain = ReplacementChain::from_versions(Vec::new()).expect("chain");
        assert!(chain.is_empty());
        assert!(chain.active().is_none());
    }

    #[test]
    fn length_counts_replacements() {
        let original = ReplacementChain::from_versions(vec![version(
            1,
            ChildStatus::Signed,
            None,
            None,
        )])
        .expect("chain");
        assert_eq!(original.len(), 0);
        assert!(original.is_empty());
        assert_eq!(original.active().map(|v| v.child_id), Some(ChildId(1)));

        let replaced = ReplacementChain::from_versions(vec![
            version(1, ChildStatus::Superseded, None, Some(2)),
            version(2, ChildStatus::Pending, Some(1), None),
        ])
        .expect("chain");
        assert_eq!(replaced.len(), original.len() + 1);
    }

    #[test]
    fn orders_versions_by_links_not_input_order() {
        let chain = ReplacementChain::from_versions(vec![
            version(3, ChildStatus::Signed, Some(2), None),
            version(1, ChildStatus::Superseded, None, Some(2)),
            version(2, ChildStatus::Superseded, Some(1), Some(3)),
        ])
        .expect("chain");

        let ids: Vec<i64> = chain.versions().iter().map(|v| v.child_id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(chain.active().map(|v| v.child_id), Some(ChildId(3)));
    }

    #[test]
    fn pending_head_has_no_active_version() {
        let chain = ReplacementChain::from_versions(vec![
            version(99, ChildStatus::Superseded, None, Some(100)),
            version(100, ChildStatus::Pending, Some(99), None),
        ])
        .expect("chain");
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.versions().len(), 2);
        assert!(chain.active().is_none());
    }

    #[test]
    fn two_signed_versions_violate_the_chain() {
        let err = ReplacementChain::from_versions(vec![
            version(1, ChildStatus::Signed, None, Some(2)),
            version(2, ChildStatus::Signed, Some(1), None),
        ])
        .expect_err("must fail");
        assert_eq!(err, ChainError::MultipleSigned { count: 2 });
    }

    #[test]
    fn replaced_version_must_be_superseded() {
        let err = ReplacementChain::from_versions(vec![
            version(1, ChildStatus::Cancelled, None, Some(2)),
            version(2, ChildStatus::Pending, Some(1), None),
        ])
        .expect_err("must fail");
        assert!(matches!(err, ChainError::ReplacedButNotSuperseded { .. }));
    }

    #[test]
    fn forked_history_has_no_single_root() {
        let err = ReplacementChain::from_versions(vec![
            version(1, ChildStatus::Superseded, None, Some(2)),
            version(2, ChildStatus::Pending, Some(1), None),
            version(3, ChildStatus::Pending, Some(1), None),
        ])
        .expect_err("must fail");
        assert_eq!(err, ChainError::NoSingleRoot);
    }
}
