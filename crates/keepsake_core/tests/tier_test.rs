use chrono::{Duration, TimeZone, Utc};
use keepsake_core::{CompressionTier, TierBoundaries};

#[test]
fn six_months_is_light() {
    let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
    let created = Utc.with_ymd_and_hms(2023, 12, 15, 12, 0, 0).unwrap();
    assert_eq!(
        CompressionTier::for_age(created, now, &TierBoundaries::default()),
        CompressionTier::Light
    );
}

#[test]
fn exactly_one_year_is_medium() {
    let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
    let created = Utc.with_ymd_and_hms(2023, 6, 15, 12, 0, 0).unwrap();
    let boundaries = TierBoundaries::default();
    assert_eq!(
        CompressionTier::for_age(created, now, &boundaries),
        CompressionTier::Medium
    );
    assert_eq!(
        CompressionTier::for_age(created + Duration::seconds(1), now, &boundaries),
        CompressionTier::Light
    );
}

#[test]
fn exactly_three_years_is_medium() {
    let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
    let created = Utc.with_ymd_and_hms(2021, 6, 15, 12, 0, 0).unwrap();
    let boundaries = TierBoundaries::default();
    assert_eq!(
        CompressionTier::for_age(created, now, &boundaries),
        CompressionTier::Medium
    );
    assert_eq!(
        CompressionTier::for_age(created - Duration::seconds(1), now, &boundaries),
        CompressionTier::Heavy
    );
}

#[test]
fn future_dates_are_light() {
    let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
    assert_eq!(
        CompressionTier::for_age(now + Duration::days(30), now, &TierBoundaries::default()),
        CompressionTier::Light
    );
}

#[test]
fn custom_boundaries_are_respected() {
    let now = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
    let created = Utc.with_ymd_and_hms(2023, 12, 15, 0, 0, 0).unwrap();
    let boundaries = TierBoundaries::new(3, 5);
    assert_eq!(
        CompressionTier::for_age(created, now, &boundaries),
        CompressionTier::Heavy
    );
}

#[test]
fn leap_day_content_ages_by_calendar_month() {
    let created = Utc.with_ymd_and_hms(2020, 2, 29, 0, 0, 0).unwrap();
    let now = Utc.with_ymd_and_hms(2023, 2, 28, 0, 0, 0).unwrap();
    // 2023-02-28 minus 36 months is 2020-02-28, one day before creation
    assert_eq!(
        CompressionTier::for_age(created, now, &TierBoundaries::default()),
        CompressionTier::Medium
    );
}
