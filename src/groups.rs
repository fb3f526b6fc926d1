//! Group membership and the dense group index.
//!
//! Callers label groups with arbitrary `u32` ids. Everything that indexes arrays by
//! group goes through a [`GroupIndex`], which maps the labels actually present to a
//! dense `0..G` range (ascending label order) and back. Per-group results are reported
//! keyed by the caller's label, never by the dense index.

use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::error::{ensure_len, Error, Result};

/// Caller-facing group label.
pub type GroupId = u32;

/// Dense remapping of the group labels present in some input.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupIndex {
    labels: Vec<GroupId>,
}

impl GroupIndex {
    /// Build from any collection of labels (duplicates allowed).
    pub fn from_labels<It>(labels: It) -> Self
    where
        It: IntoIterator<Item = GroupId>,
    {
        let mut labels: Vec<GroupId> = labels.into_iter().collect();
        labels.sort_unstable();
        labels.dedup();
        Self { labels }
    }

    /// Number of distinct groups.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Dense index of `label`, if present.
    pub fn index_of(&self, label: GroupId) -> Option<usize> {
        self.labels.binary_search(&label).ok()
    }

    /// Caller label for a dense index.
    ///
    /// Panics if `idx >= self.len()`; dense indices only come from this index.
    pub fn label(&self, idx: usize) -> GroupId {
        self.labels[idx]
    }

    /// Labels in dense order.
    pub fn labels(&self) -> &[GroupId] {
        &self.labels
    }

    /// Translate a dense per-group vector back to caller labels.
    pub fn to_labeled(&self, dense: &[f64]) -> BTreeMap<GroupId, f64> {
        self.labels.iter().copied().zip(dense.iter().copied()).collect()
    }
}

/// Total mapping from items to group labels, preserving the caller's item order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Membership<I: Ord> {
    items: Vec<I>,
    groups: Vec<GroupId>,
    lookup: BTreeMap<I, GroupId>,
}

impl<I> Membership<I>
where
    I: Clone + Ord + Debug,
{
    /// Pair `items[i]` with `groups[i]`.
    ///
    /// Errors with `ShapeMismatch` when the lengths differ and `DuplicateItem` when an
    /// item repeats.
    pub fn new(items: Vec<I>, groups: Vec<GroupId>) -> Result<Self> {
        ensure_len("group_ids", items.len(), groups.len())?;
        let mut lookup = BTreeMap::new();
        for (item, &g) in items.iter().zip(groups.iter()) {
            if lookup.insert(item.clone(), g).is_some() {
                return Err(Error::DuplicateItem(format!("{item:?}")));
            }
        }
        Ok(Self {
            items,
            groups,
            lookup,
        })
    }

    /// Build from `(item, group)` pairs.
    pub fn from_pairs<It>(pairs: It) -> Result<Self>
    where
        It: IntoIterator<Item = (I, GroupId)>,
    {
        let (items, groups): (Vec<I>, Vec<GroupId>) = pairs.into_iter().unzip();
        Self::new(items, groups)
    }

    /// Group of `item`, if it has one.
    pub fn group_of(&self, item: &I) -> Option<GroupId> {
        self.lookup.get(item).copied()
    }

    /// Group of `item`, or `UnknownItem`.
    pub fn require_group(&self, item: &I) -> Result<GroupId> {
        self.group_of(item)
            .ok_or_else(|| Error::UnknownItem(format!("{item:?}")))
    }

    /// Items in the order they were supplied.
    pub fn items(&self) -> &[I] {
        &self.items
    }

    /// Group labels aligned with [`Membership::items`].
    pub fn groups(&self) -> &[GroupId] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Dense index over the labels in use.
    pub fn group_index(&self) -> GroupIndex {
        GroupIndex::from_labels(self.groups.iter().copied())
    }

    /// Member count per group label.
    pub fn group_sizes(&self) -> BTreeMap<GroupId, usize> {
        let mut out = BTreeMap::new();
        for &g in &self.groups {
            *out.entry(g).or_insert(0) += 1;
        }
        out
    }

    /// Labels for a sequence of items (e.g. a ranking), failing on the first unknown item.
    pub fn labels_for<'a, It>(&self, ranking: It) -> Result<Vec<GroupId>>
    where
        It: IntoIterator<Item = &'a I>,
        I: 'a,
    {
        ranking.into_iter().map(|i| self.require_group(i)).collect()
    }
}
