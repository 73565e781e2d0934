//! Replica slots, confirmed-destination flags and the replication policy.

use crate::Stage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One of the two required replication destinations.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
pub enum ReplicaSlot {
    /// Destination A (e.g. a NAS)
    #[display("A")]
    A,
    /// Destination B (e.g. a phone kept in sync)
    #[display("B")]
    B,
}

impl ReplicaSlot {
    /// The other slot.
    pub fn other(&self) -> ReplicaSlot {
        match self {
            ReplicaSlot::A => ReplicaSlot::B,
            ReplicaSlot::B => ReplicaSlot::A,
        }
    }
}

/// Destination identifiers that have durably confirmed a copy.
///
/// Flags only ever grow. The column form is a sorted, comma-delimited list
/// with leading and trailing delimiters (`,nas,pixel,`) so that membership
/// can be tested with a substring search for `,id,`.
///
/// # Examples
///
/// ```
/// use keepsake_core::ReplicaFlags;
///
/// let mut flags = ReplicaFlags::default();
/// flags.insert("pixel");
/// flags.insert("nas");
/// assert_eq!(flags.to_column(), ",nas,pixel,");
/// assert_eq!(ReplicaFlags::from_column(",nas,pixel,"), flags);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplicaFlags(BTreeSet<String>);

impl ReplicaFlags {
    /// Add a destination. Returns false if it was already present.
    pub fn insert(&mut self, destination: impl Into<String>) -> bool {
        self.0.insert(destination.into())
    }

    /// Whether `destination` has confirmed a copy.
    pub fn contains(&self, destination: &str) -> bool {
        self.0.contains(destination)
    }

    /// Union with another flag set.
    pub fn union(&self, other: &ReplicaFlags) -> ReplicaFlags {
        ReplicaFlags(self.0.union(&other.0).cloned().collect())
    }

    /// Whether every flag here is also present in `other`.
    pub fn is_subset(&self, other: &ReplicaFlags) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Number of confirmed destinations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no destination has confirmed yet.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate destination identifiers in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Encode for storage.
    pub fn to_column(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        let joined: Vec<&str> = self.iter().collect();
        format!(",{},", joined.join(","))
    }

    /// Decode from storage. Empty segments are ignored.
    pub fn from_column(column: &str) -> ReplicaFlags {
        ReplicaFlags(
            column
                .split(',')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// The delimited token `destination` occupies in an encoded column.
    ///
    /// Membership is a plain substring test on this token, so it is exact
    /// and case-sensitive.
    pub fn column_token(destination: &str) -> String {
        format!(",{},", destination)
    }
}

impl<S: Into<String>> FromIterator<S> for ReplicaFlags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        ReplicaFlags(iter.into_iter().map(Into::into).collect())
    }
}

/// Which destination identifiers fill the two replica slots.
///
/// # Examples
///
/// ```
/// use keepsake_core::{ReplicaFlags, ReplicaPolicy, Stage};
///
/// let policy = ReplicaPolicy::new("nas", "pixel");
/// let flags: ReplicaFlags = ["pixel"].into_iter().collect();
/// assert_eq!(policy.stage_for(&flags), Some(Stage::ReplicatedB));
/// assert!(!policy.is_satisfied_by(&flags));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct ReplicaPolicy {
    /// Destination identifier for slot A
    destination_a: String,
    /// Destination identifier for slot B
    destination_b: String,
}

impl ReplicaPolicy {
    /// Create a policy from the two destination identifiers.
    pub fn new(destination_a: impl Into<String>, destination_b: impl Into<String>) -> Self {
        Self {
            destination_a: destination_a.into(),
            destination_b: destination_b.into(),
        }
    }

    /// Destination identifier for a slot.
    pub fn destination(&self, slot: ReplicaSlot) -> &str {
        match slot {
            ReplicaSlot::A => &self.destination_a,
            ReplicaSlot::B => &self.destination_b,
        }
    }

    /// Whether `destination` is one of the two required destinations.
    pub fn is_known(&self, destination: &str) -> bool {
        destination == self.destination_a || destination == self.destination_b
    }

    /// Whether both required destinations have confirmed.
    pub fn is_satisfied_by(&self, flags: &ReplicaFlags) -> bool {
        flags.contains(&self.destination_a) && flags.contains(&self.destination_b)
    }

    /// The replication stage a flag set justifies, if any.
    pub fn stage_for(&self, flags: &ReplicaFlags) -> Option<Stage> {
        match (
            flags.contains(&self.destination_a),
            flags.contains(&self.destination_b),
        ) {
            (true, true) => Some(Stage::ReplicatedBoth),
            (true, false) => Some(Stage::ReplicatedA),
            (false, true) => Some(Stage::ReplicatedB),
            (false, false) => None,
        }
    }
}
