//! Lifecycle stages and the pipeline steps that move records between them.

use crate::ReplicaSlot;
use serde::{Deserialize, Serialize};

/// Lifecycle stage of a media record.
///
/// The derived `Ord` follows declaration order and exists so stages can key
/// ordered collections. Lifecycle ordering is expressed by [`Stage::rank`],
/// where `ReplicatedA` and `ReplicatedB` share a rank.
///
/// # Examples
///
/// ```
/// use keepsake_core::Stage;
///
/// assert!(Stage::Acquired.can_advance_to(Stage::ReplicatedA));
/// assert!(!Stage::Compressed.can_advance_to(Stage::Retired));
/// assert_eq!("retirement_staged".parse::<Stage>().unwrap(), Stage::RetirementStaged);
/// ```
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
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Downloaded from the source and recorded
    #[display("acquired")]
    Acquired,
    /// Durably copied to destination A only
    #[display("replicated_a")]
    ReplicatedA,
    /// Durably copied to destination B only
    #[display("replicated_b")]
    ReplicatedB,
    /// Durably copied to both destinations
    #[display("replicated_both")]
    ReplicatedBoth,
    /// Local copy compressed
    #[display("compressed")]
    Compressed,
    /// Source deletion requested but not yet confirmed
    #[display("retirement_staged")]
    RetirementStaged,
    /// Source deletion confirmed and local copy released
    #[display("retired")]
    Retired,
}

impl Stage {
    /// Convert to string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Acquired => "acquired",
            Stage::ReplicatedA => "replicated_a",
            Stage::ReplicatedB => "replicated_b",
            Stage::ReplicatedBoth => "replicated_both",
            Stage::Compressed => "compressed",
            Stage::RetirementStaged => "retirement_staged",
            Stage::Retired => "retired",
        }
    }

    /// Position in the lifecycle. Partial replication stages share a rank.
    pub fn rank(&self) -> u8 {
        match self {
            Stage::Acquired => 0,
            Stage::ReplicatedA | Stage::ReplicatedB => 1,
            Stage::ReplicatedBoth => 2,
            Stage::Compressed => 3,
            Stage::RetirementStaged => 4,
            Stage::Retired => 5,
        }
    }

    /// Whether `target` is a legal forward edge from this stage.
    pub fn can_advance_to(&self, target: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, target),
            (Acquired, ReplicatedA)
                | (Acquired, ReplicatedB)
                | (Acquired, ReplicatedBoth)
                | (ReplicatedA, ReplicatedBoth)
                | (ReplicatedB, ReplicatedBoth)
                | (ReplicatedBoth, Compressed)
                | (Compressed, RetirementStaged)
                | (RetirementStaged, Retired)
        )
    }

    /// Whether the record must still own an existing local file.
    pub fn holds_local_file(&self) -> bool {
        self.rank() < Stage::RetirementStaged.rank()
    }

    /// Whether no further automatic processing applies.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Retired)
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "acquired" => Ok(Stage::Acquired),
            "replicated_a" => Ok(Stage::ReplicatedA),
            "replicated_b" => Ok(Stage::ReplicatedB),
            "replicated_both" => Ok(Stage::ReplicatedBoth),
            "compressed" => Ok(Stage::Compressed),
            "retirement_staged" => Ok(Stage::RetirementStaged),
            "retired" => Ok(Stage::Retired),
            _ => Err(format!("Unknown stage: {}", s)),
        }
    }
}

/// A step of a pipeline pass. Variants are declared in execution order.
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
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Download new source files
    #[display("acquire")]
    Acquire,
    /// Copy to destination A
    #[display("replicate_a")]
    ReplicateA,
    /// Copy to destination B
    #[display("replicate_b")]
    ReplicateB,
    /// Compress the local copy
    #[display("compress")]
    Compress,
    /// Delete from the source
    #[display("retire")]
    Retire,
}

impl PipelineStage {
    /// Record stages this step accepts. Acquire is not record-driven.
    pub fn entry_stages(&self) -> &'static [Stage] {
        match self {
            PipelineStage::Acquire => &[],
            PipelineStage::ReplicateA => &[Stage::Acquired, Stage::ReplicatedB],
            PipelineStage::ReplicateB => &[Stage::Acquired, Stage::ReplicatedA],
            PipelineStage::Compress => &[Stage::ReplicatedBoth],
            PipelineStage::Retire => &[Stage::Compressed, Stage::RetirementStaged],
        }
    }

    /// Replica slot served by a replication step.
    pub fn replica_slot(&self) -> Option<ReplicaSlot> {
        match self {
            PipelineStage::ReplicateA => Some(ReplicaSlot::A),
            PipelineStage::ReplicateB => Some(ReplicaSlot::B),
            _ => None,
        }
    }

    /// All steps in execution order.
    pub fn in_order() -> impl Iterator<Item = PipelineStage> {
        <PipelineStage as strum::IntoEnumIterator>::iter()
    }
}

impl std::str::FromStr for PipelineStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "acquire" => Ok(PipelineStage::Acquire),
            "replicate_a" => Ok(PipelineStage::ReplicateA),
            "replicate_b" => Ok(PipelineStage::ReplicateB),
            "compress" => Ok(PipelineStage::Compress),
            "retire" => Ok(PipelineStage::Retire),
            _ => Err(format!("Unknown pipeline stage: {}", s)),
        }
    }
}
