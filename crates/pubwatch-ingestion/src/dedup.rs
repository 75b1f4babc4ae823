//! New-arrival detection against the ledger of already processed ids.
//!
//! Membership of the normalised `PublicationId` is the only criterion; no
//! timestamps or content hashes are consulted.

use std::collections::HashSet;

use pubwatch_common::{PublicationId, PublicationRecord};

/// Ids already processed, in the order they were first recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownIdSet {
    order: Vec<PublicationId>,
    members: HashSet<PublicationId>,
}

impl KnownIdSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: PublicationId) -> bool {
        self.members.contains(&id)
    }

    /// Add one id; returns false if it was already present.
    pub fn insert(&mut self, id: PublicationId) -> bool {
        if self.members.insert(id) {
            self.order.push(id);
            true
        } else {
            false
        }
    }

    /// Append ids, skipping ones already present. Returns how many were added.
    pub fn append<I: IntoIterator<Item = PublicationId>>(&mut self, ids: I) -> usize {
        ids.into_iter().filter(|id| self.insert(*id)).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = PublicationId> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl FromIterator<PublicationId> for KnownIdSet {
    fn from_iter<I: IntoIterator<Item = PublicationId>>(iter: I) -> Self {
        let mut set = Self::new();
        set.append(iter);
        set
    }
}

/// Result of checking a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalStatus {
    /// Not in the ledger; enrich, notify and commit.
    New,
    /// Already processed in an earlier run.
    Known,
}

pub fn check_arrival(record: &PublicationRecord, known: &KnownIdSet) -> ArrivalStatus {
    if known.contains(record.id) {
        ArrivalStatus::Known
    } else {
        ArrivalStatus::New
    }
}

/// The subsequence of `current` whose ids are not in `known`, in input order.
pub fn new_arrivals(current: &[PublicationRecord], known: &KnownIdSet) -> Vec<PublicationRecord> {
    current
        .iter()
        .filter(|r| check_arrival(r, known) == ArrivalStatus::New)
        .cloned()
        .collect()
}
