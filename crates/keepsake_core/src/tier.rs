//! Age-based compression tiers.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

/// How aggressively a file is compressed.
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
pub enum CompressionTier {
    /// Recent content
    #[display("light")]
    Light,
    /// Middle-aged content
    #[display("medium")]
    Medium,
    /// Old content
    #[display("heavy")]
    Heavy,
}

impl CompressionTier {
    /// Convert to string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionTier::Light => "light",
            CompressionTier::Medium => "medium",
            CompressionTier::Heavy => "heavy",
        }
    }

    /// Choose a tier from the content's age at `now`.
    ///
    /// Ages are measured in calendar months. Content younger than
    /// `light_max_age_months` is light; content between the two limits,
    /// both inclusive, is medium; anything older is heavy. Content dated
    /// in the future counts as light.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use keepsake_core::{CompressionTier, TierBoundaries};
    ///
    /// let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    /// let three_years = Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap();
    /// let tier = CompressionTier::for_age(three_years, now, &TierBoundaries::default());
    /// assert_eq!(tier, CompressionTier::Medium);
    /// ```
    pub fn for_age(
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
        boundaries: &TierBoundaries,
    ) -> CompressionTier {
        let light_cutoff = months_before(now, boundaries.light_max_age_months);
        if created_at > light_cutoff {
            return CompressionTier::Light;
        }
        let medium_cutoff = months_before(now, boundaries.medium_max_age_months);
        if created_at >= medium_cutoff {
            CompressionTier::Medium
        } else {
            CompressionTier::Heavy
        }
    }
}

impl std::str::FromStr for CompressionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(CompressionTier::Light),
            "medium" => Ok(CompressionTier::Medium),
            "heavy" => Ok(CompressionTier::Heavy),
            _ => Err(format!("Unknown compression tier: {}", s)),
        }
    }
}

fn months_before(now: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Age limits, in months, separating the compression tiers.
///
/// # Examples
///
/// ```
/// use keepsake_core::TierBoundaries;
///
/// let boundaries = TierBoundaries::new(12, 36);
/// assert!(boundaries.validate().is_ok());
/// assert!(TierBoundaries::new(36, 12).validate().is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters,
)]
pub struct TierBoundaries {
    /// Upper age limit (exclusive) of the light tier
    light_max_age_months: u32,
    /// Upper age limit (inclusive) of the medium tier
    medium_max_age_months: u32,
}

impl TierBoundaries {
    /// Create tier boundaries.
    pub fn new(light_max_age_months: u32, medium_max_age_months: u32) -> Self {
        Self {
            light_max_age_months,
            medium_max_age_months,
        }
    }

    /// Validates that the light limit is positive and below the medium limit.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem.
    pub fn validate(&self) -> Result<(), String> {
        if self.light_max_age_months == 0 {
            return Err("light_max_age_months must be greater than 0".to_string());
        }
        if self.light_max_age_months >= self.medium_max_age_months {
            return Err(format!(
                "light_max_age_months ({}) must be less than medium_max_age_months ({})",
                self.light_max_age_months, self.medium_max_age_months
            ));
        }
        Ok(())
    }
}

impl Default for TierBoundaries {
    fn default() -> Self {
        Self::new(12, 36)
    }
}
