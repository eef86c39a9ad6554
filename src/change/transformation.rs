//! Transformations: ordered compositions of change sets.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::{GraphStore, StoreResult};

use super::{ApplyStats, ChangeSet};

/// An ordered list of change sets applied inside one write scope.
///
/// `apply(invert(t))` after `apply(t)` restores the prior graph whenever every
/// change set of `t` is effective against the state it was applied to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transformation {
    #[serde(default)]
    change_sets: Vec<ChangeSet>,
}

impl Transformation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_change_sets(change_sets: Vec<ChangeSet>) -> Self {
        Self { change_sets }
    }

    pub fn single(change_set: ChangeSet) -> Self {
        Self {
            change_sets: vec![change_set],
        }
    }

    /// Append a change set.
    pub fn push(&mut self, change_set: ChangeSet) {
        self.change_sets.push(change_set);
    }

    pub fn change_sets(&self) -> &[ChangeSet] {
        &self.change_sets
    }

    /// Whether applying would request no operations at all.
    pub fn is_empty(&self) -> bool {
        self.change_sets.iter().all(ChangeSet::is_empty)
    }

    /// Total number of operations across change sets.
    pub fn operation_count(&self) -> usize {
        self.change_sets.iter().map(ChangeSet::len).sum()
    }

    /// `self` followed by `other`.
    pub fn and_then(mut self, other: Transformation) -> Self {
        self.change_sets.extend(other.change_sets);
        self
    }

    /// Reverse the change-set list and invert each.
    pub fn invert(&self) -> Self {
        Self {
            change_sets: self.change_sets.iter().rev().map(ChangeSet::invert).collect(),
        }
    }

    /// All operations merged into one change set, in order.
    pub fn flatten(&self) -> ChangeSet {
        self.change_sets
            .iter()
            .flat_map(|cs| cs.operations().iter().cloned())
            .collect()
    }

    /// Apply each change set in order inside the caller's write scope.
    pub fn apply<S: GraphStore + ?Sized>(&self, store: &S) -> StoreResult<ApplyStats> {
        let mut stats = ApplyStats::default();
        for change_set in &self.change_sets {
            stats += change_set.apply(store)?;
        }
        Ok(stats)
    }

    /// Apply each change set in order, restricted to its effective operations.
    ///
    /// Returns the transformation that was actually applied; its inverse
    /// restores the prior graph exactly.
    pub fn apply_effective<S: GraphStore + ?Sized>(
        &self,
        store: &S,
    ) -> StoreResult<(Transformation, ApplyStats)> {
        let mut applied = Transformation::new();
        let mut stats = ApplyStats::default();
        for change_set in &self.change_sets {
            let effective = change_set.effective_against(store)?;
            if effective.is_empty() {
                continue;
            }
            stats += effective.apply(store)?;
            applied.push(effective);
        }
        Ok((applied, stats))
    }

    /// Open a write scope, apply, and commit; abort on any failure.
    pub fn apply_atomically<S: GraphStore + ?Sized>(&self, store: &S) -> StoreResult<ApplyStats> {
        store.begin_write()?;
        match self.apply(store) {
            Ok(stats) => {
                store.commit()?;
                tracing::info!(
                    change_sets = self.change_sets.len(),
                    operations = self.operation_count(),
                    %stats,
                    "transformation applied"
                );
                Ok(stats)
            }
            Err(err) => {
                if let Err(rollback) = store.abort() {
                    return Err(StoreError::Rollback {
                        cause: err.to_string(),
                        message: rollback.to_string(),
                    });
                }
                tracing::warn!(error = %err, "transformation aborted");
                Err(err)
            }
        }
    }
}

impl From<ChangeSet> for Transformation {
    fn from(change_set: ChangeSet) -> Self {
        Self::single(change_set)
    }
}

impl FromIterator<ChangeSet> for Transformation {
    fn from_iter<I: IntoIterator<Item = ChangeSet>>(iter: I) -> Self {
        Self {
            change_sets: iter.into_iter().collect(),
        }
    }
}
